//! Signature production and verification.
//!
//! Three interchangeable [`Signer`] implementations share one contract:
//! `sign(message, key, hash)` yields raw signature bytes and
//! `verify(message, key, signature, hash)` either succeeds or fails with
//! [`AuthError::InvalidSignature`].
//!
//! - [`HmacSigner`]: keyed-hash MAC over a shared secret, constant-time compare
//! - [`RsaSigner`]: RSASSA-PKCS1-v1_5 with the selected hash
//! - [`EcdsaSigner`]: ECDSA over secp256k1, SHA-256 only, DER signatures

use std::fmt;

use fbapi_core::{HashAlgorithm, SigningAlgorithm};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use rsa::pkcs1v15;
use rsa::signature::{SignatureEncoding as _, Signer as _, Verifier as _};
use sha2::{Sha256, Sha512};
use sha3::Sha3_256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AuthError;
use crate::keys;

/// A digital signature scheme parameterized by hash algorithm.
pub trait Signer: Send + Sync + fmt::Debug {
    /// The algorithm this signer implements.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Sign `message` with `key`.
    ///
    /// `key` is the shared secret for HMAC and a PEM private key otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKey`] if the key cannot be decoded and
    /// [`AuthError::AlgorithmNotSupported`] if `hash` is not usable with
    /// this scheme.
    fn sign(&self, message: &[u8], key: &str, hash: HashAlgorithm) -> Result<Vec<u8>, AuthError>;

    /// Verify `signature` over `message` with `key`.
    ///
    /// `key` is the shared secret for HMAC and a PEM public key otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSignature`] if the signature does not match.
    fn verify(
        &self,
        message: &[u8],
        key: &str,
        signature: &[u8],
        hash: HashAlgorithm,
    ) -> Result<(), AuthError>;
}

/// Return the signer implementing `algorithm`.
#[must_use]
pub fn signer_for(algorithm: SigningAlgorithm) -> &'static dyn Signer {
    match algorithm {
        SigningAlgorithm::Hmac => &HmacSigner,
        SigningAlgorithm::Rsa => &RsaSigner,
        SigningAlgorithm::Ecdsa => &EcdsaSigner,
    }
}

/// HMAC over a shared secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    fn mac<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Vec<u8> {
        let mut mac =
            <M as KeyInit>::new_from_slice(key).expect("HMAC can accept keys of any length");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    fn compute(key: &[u8], message: &[u8], hash: HashAlgorithm) -> Vec<u8> {
        match hash {
            HashAlgorithm::Sha256 => Self::mac::<Hmac<Sha256>>(key, message),
            HashAlgorithm::Sha512 => Self::mac::<Hmac<Sha512>>(key, message),
            HashAlgorithm::Sha3_256 => Self::mac::<Hmac<Sha3_256>>(key, message),
        }
    }
}

impl Signer for HmacSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Hmac
    }

    fn sign(&self, message: &[u8], key: &str, hash: HashAlgorithm) -> Result<Vec<u8>, AuthError> {
        Ok(Self::compute(key.as_bytes(), message, hash))
    }

    fn verify(
        &self,
        message: &[u8],
        key: &str,
        signature: &[u8],
        hash: HashAlgorithm,
    ) -> Result<(), AuthError> {
        let expected = Self::compute(key.as_bytes(), message, hash);
        if bool::from(expected.ct_eq(signature)) {
            Ok(())
        } else {
            debug!(%hash, "HMAC mismatch");
            Err(AuthError::InvalidSignature)
        }
    }
}

/// RSASSA-PKCS1-v1_5.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSigner;

impl Signer for RsaSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Rsa
    }

    fn sign(&self, message: &[u8], key: &str, hash: HashAlgorithm) -> Result<Vec<u8>, AuthError> {
        let private_key = keys::rsa_private_key(key)?;

        let signature = match hash {
            HashAlgorithm::Sha256 => pkcs1v15::SigningKey::<Sha256>::new(private_key)
                .try_sign(message)
                .map(|sig| sig.to_vec()),
            HashAlgorithm::Sha512 => pkcs1v15::SigningKey::<Sha512>::new(private_key)
                .try_sign(message)
                .map(|sig| sig.to_vec()),
            HashAlgorithm::Sha3_256 => pkcs1v15::SigningKey::<Sha3_256>::new(private_key)
                .try_sign(message)
                .map(|sig| sig.to_vec()),
        };

        signature.map_err(|e| AuthError::Crypto(e.to_string()))
    }

    fn verify(
        &self,
        message: &[u8],
        key: &str,
        signature: &[u8],
        hash: HashAlgorithm,
    ) -> Result<(), AuthError> {
        let public_key = keys::rsa_public_key(key)?;
        let signature =
            pkcs1v15::Signature::try_from(signature).map_err(|_| AuthError::InvalidSignature)?;

        let result = match hash {
            HashAlgorithm::Sha256 => {
                pkcs1v15::VerifyingKey::<Sha256>::new(public_key).verify(message, &signature)
            }
            HashAlgorithm::Sha512 => {
                pkcs1v15::VerifyingKey::<Sha512>::new(public_key).verify(message, &signature)
            }
            HashAlgorithm::Sha3_256 => {
                pkcs1v15::VerifyingKey::<Sha3_256>::new(public_key).verify(message, &signature)
            }
        };

        result.map_err(|e| {
            debug!(%hash, error = %e, "RSA verification failed");
            AuthError::InvalidSignature
        })
    }
}

/// ECDSA over secp256k1 with SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaSigner;

impl EcdsaSigner {
    fn ensure_supported(hash: HashAlgorithm) -> Result<(), AuthError> {
        if hash == HashAlgorithm::Sha256 {
            Ok(())
        } else {
            Err(AuthError::AlgorithmNotSupported(format!(
                "ecdsa with {hash} (only sha256 is supported)"
            )))
        }
    }
}

impl Signer for EcdsaSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Ecdsa
    }

    fn sign(&self, message: &[u8], key: &str, hash: HashAlgorithm) -> Result<Vec<u8>, AuthError> {
        Self::ensure_supported(hash)?;

        let secret_key = keys::ec_secret_key(key)?;
        let signing_key = k256::ecdsa::SigningKey::from(&secret_key);
        let signature: k256::ecdsa::Signature = signing_key
            .try_sign(message)
            .map_err(|e| AuthError::Crypto(e.to_string()))?;

        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(
        &self,
        message: &[u8],
        key: &str,
        signature: &[u8],
        hash: HashAlgorithm,
    ) -> Result<(), AuthError> {
        Self::ensure_supported(hash)?;

        let public_key = keys::ec_public_key(key)?;
        let signature = k256::ecdsa::Signature::from_der(signature)
            .or_else(|_| k256::ecdsa::Signature::from_slice(signature))
            .map_err(|_| AuthError::InvalidSignature)?;
        let signature = signature.normalize_s().unwrap_or(signature);

        k256::ecdsa::VerifyingKey::from(&public_key)
            .verify(message, &signature)
            .map_err(|e| {
                debug!(error = %e, "ECDSA verification failed");
                AuthError::InvalidSignature
            })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use super::*;

    const RSA_PRIVATE: &str = include_str!("../testdata/rsa_private.pem");
    const RSA_PUBLIC: &str = include_str!("../testdata/rsa_public.pem");
    const EC_PRIVATE: &str = include_str!("../testdata/ec_private.pem");
    const EC_PUBLIC: &str = include_str!("../testdata/ec_public.pem");
    const RSA_OTHER_PUBLIC: &str = include_str!("../testdata/rsa_other_public.pem");
    const EC_OTHER_PUBLIC: &str = include_str!("../testdata/ec_other_public.pem");

    const MESSAGE: &[u8] = b"1700000000000abc123GET/accounts";

    const ALL_HASHES: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha3_256,
    ];

    fn flip_first_byte(bytes: &[u8]) -> Vec<u8> {
        let mut tampered = bytes.to_vec();
        tampered[0] ^= 0x01;
        tampered
    }

    #[test]
    fn test_should_match_known_hmac_vectors() {
        let cases = [
            (
                HashAlgorithm::Sha256,
                "a70164c32262d3564028b9b63c457b157c5072447edefb7c9d9f5b547f9470ab",
            ),
            (
                HashAlgorithm::Sha512,
                "237b2166c7e860f272a4aa94049b90925dd6542aa539d587b4879e0849838dde\
                 5b17c5ede0935033405fc036e05d65511eb4a6425badb98dc905ea715cc08810",
            ),
            (
                HashAlgorithm::Sha3_256,
                "da8c06cd2efb8ec461a57b1ec9914008497a99fa7c64975c29e47d5239a900c1",
            ),
        ];

        for (hash, expected) in cases {
            let signature = HmacSigner.sign(MESSAGE, "secret", hash).unwrap();
            assert_eq!(hex::encode(signature), expected, "HMAC-{hash}");
        }
    }

    #[test]
    fn test_should_produce_deterministic_hmac_that_changes_with_message() {
        let sign = |message: &[u8]| {
            HmacSigner
                .sign(message, "secret", HashAlgorithm::Sha256)
                .unwrap()
        };

        let first = sign(MESSAGE);
        assert_eq!(first, sign(MESSAGE));

        let altered = sign(b"1700000000000abc123GET/accountz");
        assert_ne!(first, altered);
    }

    #[test]
    fn test_should_round_trip_every_algorithm_and_hash() {
        let combos = [
            (SigningAlgorithm::Hmac, "secret", "secret"),
            (SigningAlgorithm::Rsa, RSA_PRIVATE, RSA_PUBLIC),
        ];

        for (algorithm, private_key, public_key) in combos {
            let signer = signer_for(algorithm);
            assert_eq!(signer.algorithm(), algorithm);
            for hash in ALL_HASHES {
                let signature = signer.sign(MESSAGE, private_key, hash).unwrap();
                signer
                    .verify(MESSAGE, public_key, &signature, hash)
                    .unwrap_or_else(|e| panic!("{algorithm}/{hash} failed: {e}"));
            }
        }

        let signature = EcdsaSigner
            .sign(MESSAGE, EC_PRIVATE, HashAlgorithm::Sha256)
            .unwrap();
        EcdsaSigner
            .verify(MESSAGE, EC_PUBLIC, &signature, HashAlgorithm::Sha256)
            .unwrap();
    }

    #[test]
    fn test_should_reject_tampered_message_signature_and_key() {
        let cases: [(&dyn Signer, &str, &str, &str); 3] = [
            (&HmacSigner, "secret", "secret", "other-secret"),
            (&RsaSigner, RSA_PRIVATE, RSA_PUBLIC, RSA_OTHER_PUBLIC),
            (&EcdsaSigner, EC_PRIVATE, EC_PUBLIC, EC_OTHER_PUBLIC),
        ];

        for (signer, private_key, public_key, wrong_key) in cases {
            let hash = HashAlgorithm::Sha256;
            let signature = signer.sign(MESSAGE, private_key, hash).unwrap();

            let tampered_message = flip_first_byte(MESSAGE);
            assert!(matches!(
                signer.verify(&tampered_message, public_key, &signature, hash),
                Err(AuthError::InvalidSignature)
            ));

            let mut tampered_signature = signature.clone();
            let last = tampered_signature.len() - 1;
            tampered_signature[last] ^= 0x01;
            assert!(matches!(
                signer.verify(MESSAGE, public_key, &tampered_signature, hash),
                Err(AuthError::InvalidSignature)
            ));

            assert!(matches!(
                signer.verify(MESSAGE, wrong_key, &signature, hash),
                Err(AuthError::InvalidSignature)
            ));
        }
    }

    #[test]
    fn test_should_match_known_rsa_signature() {
        let expected = "f8Fij1t1ULYDfEX01MaTHfrgoYxd9VnaaBKNqmbT5gFAQdeK/ixca9V4IYV+jzn/\
                        /CGH7cVEXTlbVprdAZN6fkLjw9Q9IERssBA9I1otqXnPDOU/gOrSzWPuv2gVQmic\
                        0YR42M10/DMsrqHYhSYEUBbshYIxI/G09FxGjcHpyfTd4I231Rtkw1bJVyU0ObeR\
                        N9zcOevmGgLAj5rYBGQjb00tgLdRaFufisLBpXif/o3oiRHarwllNMEs3OpYRu9G\
                        D3W5J27L9w4K2RPGgyguczfHuCv9oQyecI3CqHSAnv3yjP7OMRKDraGtS/KRbd+Z\
                        KPriTl5EdGakbYp3gJVgAQ==";

        let signature = RsaSigner
            .sign(MESSAGE, RSA_PRIVATE, HashAlgorithm::Sha256)
            .unwrap();
        assert_eq!(BASE64.encode(signature), expected);
    }

    #[test]
    fn test_should_verify_externally_produced_ecdsa_signature() {
        let encoded = "MEUCIQDdHlaDUtW+vPLHvMeqE5Al1fzpt1+nlI5w22EHy40paAIgJKG5+eQm0oSAUaa2JYhW\
                       NdW5iECDQ5hhwi/5E/8J7w8=";
        let signature = BASE64.decode(encoded).unwrap();

        EcdsaSigner
            .verify(MESSAGE, EC_PUBLIC, &signature, HashAlgorithm::Sha256)
            .unwrap();
    }

    #[test]
    fn test_should_accept_high_s_and_raw_ecdsa_signatures() {
        let der = EcdsaSigner
            .sign(MESSAGE, EC_PRIVATE, HashAlgorithm::Sha256)
            .unwrap();
        let low = k256::ecdsa::Signature::from_der(&der).unwrap();
        let (r, s) = low.split_scalars();
        let high = k256::ecdsa::Signature::from_scalars(r, -s).unwrap();
        assert!(high.normalize_s().is_some(), "negated s must be high");

        for encoded in [
            high.to_der().as_bytes().to_vec(),
            high.to_bytes().to_vec(),
            low.to_bytes().to_vec(),
        ] {
            EcdsaSigner
                .verify(MESSAGE, EC_PUBLIC, &encoded, HashAlgorithm::Sha256)
                .unwrap();
        }
    }

    #[test]
    fn test_should_reject_ecdsa_with_non_sha256_before_touching_key() {
        for hash in [HashAlgorithm::Sha512, HashAlgorithm::Sha3_256] {
            // Key material is garbage: the guard must fire before it is parsed.
            assert!(matches!(
                EcdsaSigner.sign(MESSAGE, "not a key", hash),
                Err(AuthError::AlgorithmNotSupported(_))
            ));
            assert!(matches!(
                EcdsaSigner.verify(MESSAGE, "not a key", b"sig", hash),
                Err(AuthError::AlgorithmNotSupported(_))
            ));
        }
    }

    #[test]
    fn test_should_reject_signature_with_wrong_length() {
        assert!(matches!(
            HmacSigner.verify(MESSAGE, "secret", b"short", HashAlgorithm::Sha256),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            EcdsaSigner.verify(MESSAGE, EC_PUBLIC, b"short", HashAlgorithm::Sha256),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_should_report_invalid_key_material() {
        assert!(matches!(
            RsaSigner.sign(MESSAGE, "garbage", HashAlgorithm::Sha256),
            Err(AuthError::InvalidKey(_))
        ));
        assert!(matches!(
            EcdsaSigner.verify(MESSAGE, "garbage", b"sig", HashAlgorithm::Sha256),
            Err(AuthError::InvalidKey(_))
        ));
    }
}

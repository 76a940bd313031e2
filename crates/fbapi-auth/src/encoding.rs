//! Transport-safe encodings for messages and signatures.
//!
//! Every encoder works on raw bytes in both directions so the `plain`
//! variant can carry binary signatures without corruption. All other
//! variants produce ASCII output. Alphabets are fixed because output is
//! compared byte-for-byte by independent implementations:
//!
//! | Format | Alphabet |
//! |--------|----------|
//! | `plain` | identity |
//! | `base64` | RFC 4648 standard, padded |
//! | `hexstr` | lower-case on encode, either case on decode |
//! | `base32` | RFC 4648, padded on encode, padding optional on decode |
//! | `base58` | Bitcoin |

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use fbapi_core::EncodingFormat;

use crate::error::AuthError;

/// Converts opaque bytes to and from a transport-safe representation.
///
/// Implementations must satisfy `decode(encode(x)) == x` for every input.
pub trait Encoder {
    /// Encode `payload`.
    fn encode(&self, payload: &[u8]) -> Vec<u8>;

    /// Decode `text` back to the original bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEncoding`] if `text` is malformed.
    fn decode(&self, text: &[u8]) -> Result<Vec<u8>, AuthError>;
}

impl Encoder for EncodingFormat {
    fn encode(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            Self::Plain => payload.to_vec(),
            Self::Base64 => BASE64.encode(payload).into_bytes(),
            Self::HexStr => hex::encode(payload).into_bytes(),
            Self::Base32 => data_encoding::BASE32.encode(payload).into_bytes(),
            Self::Base58 => bs58::encode(payload).into_string().into_bytes(),
        }
    }

    fn decode(&self, text: &[u8]) -> Result<Vec<u8>, AuthError> {
        let format = *self;
        let invalid = |reason: String| AuthError::InvalidEncoding { format, reason };

        match self {
            Self::Plain => Ok(text.to_vec()),
            Self::Base64 => BASE64.decode(text).map_err(|e| invalid(e.to_string())),
            Self::HexStr => hex::decode(text).map_err(|e| invalid(e.to_string())),
            Self::Base32 => {
                let unpadded = strip_padding(text);
                data_encoding::BASE32_NOPAD
                    .decode(unpadded)
                    .map_err(|e| invalid(e.to_string()))
            }
            Self::Base58 => bs58::decode(text)
                .into_vec()
                .map_err(|e| invalid(e.to_string())),
        }
    }
}

/// Trim trailing `=` padding from a Base32 string.
fn strip_padding(text: &[u8]) -> &[u8] {
    let end = text
        .iter()
        .rposition(|&b| b != b'=')
        .map_or(0, |pos| pos + 1);
    &text[..end]
}

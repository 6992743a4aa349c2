//! PEM encoding of DER certificates.
//!
//! Output matches the classic `openssl x509` layout: a `CERTIFICATE` label,
//! base64 wrapped at 64 columns, LF line endings and a trailing newline.
//! Several blocks are plain concatenations of single blocks.

use crate::error::{Error, Result};
use pem::{EncodeConfig, LineEnding, Pem};

pub const CERTIFICATE_TAG: &str = "CERTIFICATE";

pub fn encode_certificate(der: &[u8]) -> String {
    let block = Pem::new(CERTIFICATE_TAG, der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

#[cfg(test)]
fn encode_certificates<'a, I>(ders: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    ders.into_iter().map(encode_certificate).collect()
}

/// Decodes every `CERTIFICATE` block in `text`, in order. Blocks with any
/// other label are rejected.
pub fn decode_certificates(text: &str) -> Result<Vec<Vec<u8>>> {
    pem::parse_many(text)?
        .into_iter()
        .map(|block| {
            if block.tag() == CERTIFICATE_TAG {
                Ok(block.into_contents())
            } else {
                Err(Error::Pem(format!(
                    "Expected {} block, found {}",
                    CERTIFICATE_TAG,
                    block.tag()
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wraps_at_64_columns() {
        // 100 bytes -> 136 base64 chars -> lines of 64, 64, 8
        let der = vec![0xABu8; 100];
        let text = encode_certificate(&der);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.first(), Some(&"-----BEGIN CERTIFICATE-----"));
        assert_eq!(lines.last(), Some(&"-----END CERTIFICATE-----"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines[2].len(), 64);
        assert_eq!(lines[3].len(), 8);
        assert!(text.ends_with("-----END CERTIFICATE-----\n"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_encode_known_vector() {
        let text = encode_certificate(b"hello");
        assert_eq!(
            text,
            "-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END CERTIFICATE-----\n"
        );
    }

    #[test]
    fn test_multiple_blocks_concatenate_without_separator() {
        let first: &[u8] = b"first";
        let second: &[u8] = b"second";
        let text = encode_certificates([first, second]);
        assert_eq!(
            text,
            format!("{}{}", encode_certificate(first), encode_certificate(second))
        );
        assert!(!text.contains("\n\n"));
    }

    #[test]
    fn test_decode_then_encode_is_identity() {
        let ders: Vec<Vec<u8>> = vec![(0..=255u8).collect(), vec![7u8; 48]];
        let text = encode_certificates(ders.iter().map(Vec::as_slice));

        let decoded = decode_certificates(&text).unwrap();
        assert_eq!(decoded, ders);
        assert_eq!(encode_certificates(decoded.iter().map(Vec::as_slice)), text);
    }

    #[test]
    fn test_decode_rejects_other_labels() {
        let block = Pem::new("PRIVATE KEY", vec![1, 2, 3]);
        let text = pem::encode(&block);
        assert!(matches!(decode_certificates(&text), Err(Error::Pem(_))));
    }

    #[test]
    fn test_decode_empty_text() {
        assert!(decode_certificates("").unwrap().is_empty());
    }
}

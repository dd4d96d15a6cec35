//! Content fingerprinting
//!
//! Produces the 40-character lowercase hex digests used as change detectors
//! and strong ETag validators throughout the service. Not a security
//! boundary; the digest only has to be stable and cheap to compare.

use sha1::{Digest, Sha1};

/// Hex digest length of [`sha1_hex`] output.
pub const FINGERPRINT_LEN: usize = 40;

/// Fingerprint an arbitrary byte buffer.
///
/// Deterministic and side-effect free; the empty buffer is valid input.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn deterministic() {
        let data = vec![0x42u8; 1024];
        assert_eq!(sha1_hex(&data), sha1_hex(&data));
    }

    #[test]
    fn shape_is_lowercase_hex() {
        let digest = sha1_hex(b"some document bytes");
        assert_eq!(digest.len(), FINGERPRINT_LEN);
        assert!(digest
            .chars()
            .all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn different_input_different_digest() {
        assert_ne!(sha1_hex(b"page one"), sha1_hex(b"page two"));
    }
}

//! Object checksums

/// Hex-encoded BLAKE3 digest of an object
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

//! Vector math and the on-disk blob codec.
//!
//! Vectors persist as contiguous little-endian 8-byte floats; the
//! dimension is implicit in the blob length (`len / 8`).

/// Cosine similarity between two vectors. Returns 0.0 on dimension
/// mismatch, empty input, or zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Encode a vector as a little-endian f64 blob.
pub fn serialize_vector(v: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 8);
    for value in v {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decode a little-endian f64 blob. Returns `None` for empty or
/// misaligned input.
pub fn deserialize_vector(bytes: &[u8]) -> Option<Vec<f64>> {
    if bytes.is_empty() || bytes.len() % 8 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(bytes.len() / 8);
    for chunk in bytes.chunks_exact(8) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        out.push(f64::from_le_bytes(buf));
    }
    Some(out)
}

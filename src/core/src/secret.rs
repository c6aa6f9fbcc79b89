//! Secret generation and comparison
//!
//! All randomness comes from the operating system CSPRNG. Comparisons of
//! caller-supplied secrets against stored ones go through [`constant_time_eq`].

use crate::error::{CoreError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

/// Securely generate `size` bytes of random data
pub fn generate_random_bytes(size: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; size];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CoreError::Random(e.to_string()))?;
    Ok(bytes)
}

/// Generate `size` random bytes and return them base64 encoded
pub fn generate_random_string(size: usize) -> Result<String> {
    let bytes = generate_random_bytes(size)?;
    Ok(STANDARD.encode(bytes))
}

/// Base64 encode bytes the same way generated secrets are encoded
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 string produced by [`encode_base64`]
pub fn decode_base64(value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CoreError::invalid(format!("invalid base64: {}", e)))
}

/// Compare two byte strings in time that depends only on their lengths.
///
/// Every byte of `a` is visited whether or not an earlier byte differed.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = (a.len() ^ b.len()) as u64;
    for (i, x) in a.iter().enumerate() {
        let y = b.get(i).copied().unwrap_or(0);
        diff |= u64::from(x ^ y);
    }
    diff == 0
}

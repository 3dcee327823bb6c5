//! FNV-1a hashing for the fast comparison path.
//!
//! Not cryptographic; used only to skip the byte scan when nothing
//! changed.

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed bytes into an FNV-1a hash state.
#[inline]
fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a hash of `bytes`. Returns the offset basis for an empty slice.
pub fn payload_hash(bytes: &[u8]) -> u64 {
    fnv1a(FNV_OFFSET, bytes)
}

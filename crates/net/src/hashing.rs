//! Location and request hashes embedded in the signature.
//!
//! The server recomputes these from the envelope it receives, so the byte
//! layout here is fixed: positions are hashed as three big-endian `f64`s
//! (latitude, longitude, accuracy).

use xxhash_rust::xxh32::xxh32;
use xxhash_rust::xxh64::xxh64;

/// Byte layout of a claimed position.
pub fn location_bytes(latitude: f64, longitude: f64, accuracy: f64) -> [u8; 24] {
    let mut bytes = [0u8; 24];
    bytes[0..8].copy_from_slice(&latitude.to_be_bytes());
    bytes[8..16].copy_from_slice(&longitude.to_be_bytes());
    bytes[16..24].copy_from_slice(&accuracy.to_be_bytes());
    bytes
}

/// Location hash bound to the auth seed.
pub fn location_hash1(
    auth_seed: &[u8],
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    hash_seed: u32,
) -> u32 {
    let first = xxh32(auth_seed, hash_seed);
    xxh32(&location_bytes(latitude, longitude, accuracy), first)
}

/// Position-only location hash.
pub fn location_hash2(latitude: f64, longitude: f64, accuracy: f64, hash_seed: u32) -> u32 {
    xxh32(&location_bytes(latitude, longitude, accuracy), hash_seed)
}

/// Hash of one serialized sub-request.
pub fn request_hash(auth_seed: &[u8], request: &[u8], hash_seed: u32) -> u64 {
    let first = xxh64(auth_seed, u64::from(hash_seed));
    xxh64(request, first)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u32 = 0x1B84_5238;

    #[test]
    fn location_bytes_are_big_endian() {
        let bytes = location_bytes(1.0, 0.0, 0.0);
        assert_eq!(&bytes[0..8], &[0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        assert!(bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn hash1_depends_on_auth_seed() {
        let a = location_hash1(b"ticket-a", 51.5, -0.12, 10.0, SEED);
        let b = location_hash1(b"ticket-b", 51.5, -0.12, 10.0, SEED);
        assert_ne!(a, b);
    }

    #[test]
    fn hash2_ignores_auth_seed() {
        let a = location_hash2(51.5, -0.12, 10.0, SEED);
        assert_eq!(a, location_hash2(51.5, -0.12, 10.0, SEED));
        assert_ne!(a, location_hash2(51.5, -0.13, 10.0, SEED));
    }

    #[test]
    fn request_hash_is_deterministic() {
        let h = request_hash(b"seed", b"request", SEED);
        assert_eq!(h, request_hash(b"seed", b"request", SEED));
        assert_ne!(h, request_hash(b"seed", b"other", SEED));
        assert_ne!(h, request_hash(b"seed", b"request", SEED + 1));
    }
}

//! Sealing of the serialized signature.

use rand::RngCore;

/// Seals a serialized signature before it is attached to an envelope.
pub trait SignatureEncryptor: Send + Sync {
    /// Seal `plaintext` using the device timestamp as key input.
    fn seal(&self, plaintext: &[u8], timestamp: u32) -> Vec<u8>;
}

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = blake3::OUT_LEN;
const STREAM_CONTEXT: &str = "pogo signature sealer 2016-08 stream key";
const MAC_CONTEXT: &str = "pogo signature sealer 2016-08 mac key";

/// Keyed blake3 stream sealer.
///
/// Output layout: `nonce (32) ‖ ciphertext ‖ tag (32)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Sealer;

impl Blake3Sealer {
    /// Recover the plaintext of a sealed blob, `None` if the tag does not match.
    pub fn open(&self, sealed: &[u8], timestamp: u32) -> Option<Vec<u8>> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return None;
        }
        let (nonce, rest) = sealed.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let tag = blake3::Hash::from(<[u8; TAG_LEN]>::try_from(tag).ok()?);
        // blake3::Hash equality is constant-time.
        if mac(timestamp, nonce, ciphertext) != tag {
            return None;
        }

        let mut plaintext = ciphertext.to_vec();
        apply_keystream(timestamp, nonce, &mut plaintext);
        Some(plaintext)
    }
}

impl SignatureEncryptor for Blake3Sealer {
    fn seal(&self, plaintext: &[u8], timestamp: u32) -> Vec<u8> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut out = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(plaintext);
        apply_keystream(timestamp, &nonce, &mut out[NONCE_LEN..]);

        let tag = mac(timestamp, &nonce, &out[NONCE_LEN..]);
        out.extend_from_slice(tag.as_bytes());
        out
    }
}

fn apply_keystream(timestamp: u32, nonce: &[u8], data: &mut [u8]) {
    let key = blake3::derive_key(STREAM_CONTEXT, &timestamp.to_le_bytes());
    let mut hasher = blake3::Hasher::new_keyed(&key);
    hasher.update(nonce);
    let mut stream = vec![0u8; data.len()];
    hasher.finalize_xof().fill(&mut stream);
    for (byte, key_byte) in data.iter_mut().zip(stream) {
        *byte ^= key_byte;
    }
}

fn mac(timestamp: u32, nonce: &[u8], ciphertext: &[u8]) -> blake3::Hash {
    let key = blake3::derive_key(MAC_CONTEXT, &timestamp.to_le_bytes());
    let mut hasher = blake3::Hasher::new_keyed(&key);
    hasher.update(nonce);
    hasher.update(ciphertext);
    hasher.finalize()
}

use crate::error::{MeshError, MeshResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, XChaCha20Poly1305, XNonce,
};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

/// Generate a fresh random 24-byte nonce. Callers store the nonce in the
/// manifest; it is never reused across files.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    nonce.into()
}

/// Encrypt `plaintext` under `key`/`nonce`, binding `aad` (the file-hash) to
/// the ciphertext so manifest tampering causes decryption to fail closed.
/// Output length is `plaintext.len() + 16` (the Poly1305 tag).
pub fn encrypt(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> MeshResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce);
    let ciphertext = cipher
        .encrypt(
            nonce,
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| MeshError::AeadAuth)?;
    tracing::debug!("encrypted {} bytes -> {} bytes", plaintext.len(), ciphertext.len());
    Ok(ciphertext)
}

/// Decrypt `ciphertext` under `key`/`nonce`/`aad`. Fails closed with
/// [`MeshError::AeadAuth`] on any tampering — to the ciphertext, the nonce,
/// or the associated data.
pub fn decrypt(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], aad: &[u8], ciphertext: &[u8]) -> MeshResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce);
    let plaintext = cipher
        .decrypt(
            nonce,
            chacha20poly1305::aead::Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| MeshError::AeadAuth)?;
    tracing::debug!("decrypted {} bytes -> {} bytes", ciphertext.len(), plaintext.len());
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; KEY_LEN] {
        [7u8; KEY_LEN]
    }

    #[test]
    fn round_trips() {
        let k = key();
        let nonce = generate_nonce();
        let aad = b"file-hash-placeholder";
        let plaintext = b"Hello, Pangea!";

        let ciphertext = encrypt(&k, &nonce, aad, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + 16);

        let decrypted = decrypt(&k, &nonce, aad, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let k = key();
        let nonce = generate_nonce();
        let aad = b"aad";
        let mut ciphertext = encrypt(&k, &nonce, aad, b"secret payload").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        let result = decrypt(&k, &nonce, aad, &ciphertext);
        assert!(matches!(result, Err(MeshError::AeadAuth)));
    }

    #[test]
    fn tampered_aad_fails_closed() {
        let k = key();
        let nonce = generate_nonce();
        let ciphertext = encrypt(&k, &nonce, b"original-aad", b"payload").unwrap();

        let result = decrypt(&k, &nonce, b"different-aad", &ciphertext);
        assert!(matches!(result, Err(MeshError::AeadAuth)));
    }

    #[test]
    fn wrong_key_fails_closed() {
        let nonce = generate_nonce();
        let ciphertext = encrypt(&key(), &nonce, b"aad", b"payload").unwrap();

        let wrong_key = [9u8; KEY_LEN];
        let result = decrypt(&wrong_key, &nonce, b"aad", &ciphertext);
        assert!(matches!(result, Err(MeshError::AeadAuth)));
    }

    #[test]
    fn nonces_are_not_reused_across_calls() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
    }
}

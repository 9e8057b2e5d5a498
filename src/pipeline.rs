use crate::aead::{self, KEY_LEN, NONCE_LEN};
use crate::compressor;
use crate::error::{MeshError, MeshResult};
use crate::reed_solomon::{self, Shard};

/// Length prefix in front of the ciphertext before sharding, so the coder
/// can trim the zero padding `reed_solomon::encode` adds without needing a
/// second manifest field for it.
const LEN_PREFIX_SIZE: usize = 4;

/// Prepend the ciphertext's length so reconstruction can trim the
/// Reed-Solomon zero padding before the buffer reaches AEAD decryption.
fn frame_ciphertext(ciphertext: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(LEN_PREFIX_SIZE + ciphertext.len());
    framed.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    framed.extend_from_slice(ciphertext);
    framed
}

/// Inverse of [`frame_ciphertext`]: read the length prefix and slice off
/// exactly that many bytes, discarding the Reed-Solomon padding tail.
fn unframe_ciphertext(framed: &[u8]) -> MeshResult<Vec<u8>> {
    if framed.len() < LEN_PREFIX_SIZE {
        return Err(MeshError::Generic("reconstructed buffer too small for length prefix".into()));
    }
    let len = u32::from_le_bytes(framed[..LEN_PREFIX_SIZE].try_into().unwrap()) as usize;
    let end = LEN_PREFIX_SIZE + len;
    if framed.len() < end {
        return Err(MeshError::Generic("reconstructed buffer shorter than recorded ciphertext length".into()));
    }
    Ok(framed[LEN_PREFIX_SIZE..end].to_vec())
}

/// Output of [`Pipeline::process`]: the dispersed shards plus the metadata a
/// manifest needs to reverse the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub shards: Vec<Shard>,
    pub nonce: [u8; NONCE_LEN],
    pub original_size: u64,
    pub compression_level: i32,
}

/// Stateless handle holding only sharding configuration. Grounded in the
/// compress-then-encrypt-then-shard composition used elsewhere in the
/// corpus; adapted here to carry the nonce and key out to the manifest layer
/// rather than prepending it to the ciphertext.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    pub k: usize,
    pub m: usize,
}

impl Pipeline {
    pub fn new(k: usize, m: usize) -> Self {
        Self { k, m }
    }

    /// Compress, encrypt, then Reed-Solomon shard `blob`, drawing a fresh
    /// random nonce.
    ///
    /// `aad` is the file-hash the manifest will record (computed by the
    /// caller over the original plaintext, before this call).
    pub fn process(
        &self,
        blob: &[u8],
        key: &[u8; KEY_LEN],
        aad: &[u8],
        level: i32,
    ) -> MeshResult<ProcessOutput> {
        self.process_with_nonce(blob, key, aad, level, aead::generate_nonce())
    }

    /// Same as [`Pipeline::process`] but with a caller-supplied nonce.
    /// Used by the auto-heal controller to regenerate shards for missing
    /// indices so they are byte-identical to the ones already dispersed
    /// under the manifest's recorded nonce, rather than re-encrypting under
    /// a fresh one the surviving shards wouldn't match.
    pub fn process_with_nonce(
        &self,
        blob: &[u8],
        key: &[u8; KEY_LEN],
        aad: &[u8],
        level: i32,
        nonce: [u8; NONCE_LEN],
    ) -> MeshResult<ProcessOutput> {
        if blob.is_empty() {
            return Err(MeshError::EmptyBlob);
        }

        let original_size = blob.len() as u64;

        let compressed = compressor::compress(level, blob)?;
        crate::logging::log_pipeline_stage(
            &hex::encode(aad),
            "compress",
            &format!("{} -> {} bytes at level {}", blob.len(), compressed.len(), level),
        );

        let ciphertext = aead::encrypt(key, &nonce, aad, &compressed)?;
        crate::logging::log_pipeline_stage(
            &hex::encode(aad),
            "encrypt",
            &format!("{} bytes", ciphertext.len()),
        );

        let framed = frame_ciphertext(&ciphertext);
        let shards = reed_solomon::encode(&framed, self.k, self.m)?;
        crate::logging::log_pipeline_stage(
            &hex::encode(aad),
            "shard",
            &format!("{} shards of {} bytes", shards.len(), shards.first().map(|s| s.bytes.len()).unwrap_or(0)),
        );

        Ok(ProcessOutput {
            shards,
            nonce,
            original_size,
            compression_level: level,
        })
    }

    /// Inverse of [`Pipeline::process`]. `present` has one slot per shard
    /// index (`k+m` total); missing shards are `None`.
    pub fn reconstruct(
        &self,
        present: Vec<Option<Vec<u8>>>,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        key: &[u8; KEY_LEN],
        original_size: u64,
        level: i32,
    ) -> MeshResult<Vec<u8>> {
        let framed = reed_solomon::decode(present, self.k, self.m)?;
        let ciphertext = unframe_ciphertext(&framed)?;
        let compressed = aead::decrypt(key, nonce, aad, &ciphertext)?;
        let blob = compressor::decompress(&compressed)?;

        if (blob.len() as u64) < original_size {
            return Err(MeshError::Generic(
                "decompressed buffer shorter than recorded original size".into(),
            ));
        }
        let _ = level; // level is only needed by the encoder; decompress is self-describing.

        Ok(blob[..original_size as usize].to_vec())
    }
}

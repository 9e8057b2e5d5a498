use crate::error::{MeshError, MeshResult};
use std::io::{Read, Write};

/// Frame tag distinguishing a level-0 pass-through buffer from a zstd frame,
/// so `decompress` can tell them apart without external bookkeeping. zstd
/// frames always start with the 4-byte magic `0xFD2FB528`; this tag cannot
/// collide with it.
const STORED_TAG: u8 = 0x00;
const ZSTD_TAG: u8 = 0x01;

/// Compress `bytes` at `level` (0-9). Level 0 is a framed pass-through: the
/// original bytes are preserved unchanged but tagged as "stored" so
/// `decompress` does not try to run them through the zstd decoder.
pub fn compress(level: i32, bytes: &[u8]) -> MeshResult<Vec<u8>> {
    if level == 0 {
        let mut framed = Vec::with_capacity(bytes.len() + 1);
        framed.push(STORED_TAG);
        framed.extend_from_slice(bytes);
        return Ok(framed);
    }

    let clamped = level.clamp(1, 9);
    let mut compressed = Vec::new();
    {
        let mut encoder = zstd::Encoder::new(&mut compressed, clamped)
            .map_err(|e| MeshError::Compression(e.to_string()))?;
        encoder
            .write_all(bytes)
            .map_err(|e| MeshError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| MeshError::Compression(e.to_string()))?;
    }

    let mut framed = Vec::with_capacity(compressed.len() + 1);
    framed.push(ZSTD_TAG);
    framed.extend_from_slice(&compressed);
    Ok(framed)
}

/// Inverse of [`compress`]. `decompress(compress(level, x)) == x` bitwise for
/// any `x` and any level in `[0, 9]`.
pub fn decompress(framed: &[u8]) -> MeshResult<Vec<u8>> {
    let (tag, body) = framed
        .split_first()
        .ok_or_else(|| MeshError::Compression("empty compressed frame".into()))?;

    match *tag {
        STORED_TAG => Ok(body.to_vec()),
        ZSTD_TAG => {
            let mut decompressed = Vec::new();
            let mut decoder =
                zstd::Decoder::new(body).map_err(|e| MeshError::Compression(e.to_string()))?;
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| MeshError::Compression(e.to_string()))?;
            Ok(decompressed)
        }
        other => Err(MeshError::Compression(format!(
            "unrecognized frame tag {}",
            other
        ))),
    }
}

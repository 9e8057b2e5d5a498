use crate::error::{MeshError, MeshResult};
use reed_solomon_erasure::galois_8::ReedSolomon;

/// A single erasure-coded fragment. Indices `< k` are data shards; indices
/// in `[k, k+m)` are parity shards. All shards for one file share a common
/// byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index: u32,
    pub bytes: Vec<u8>,
}

/// Zero-pad `buf` to a multiple of `k`, split into `k` equal data shards,
/// then compute `m` parity shards. Returns the `k+m` shards in index order.
/// Two independent calls with identical `(buf, k, m)` produce byte-identical
/// shards.
pub fn encode(buf: &[u8], k: usize, m: usize) -> MeshResult<Vec<Shard>> {
    if k == 0 || m == 0 || k + m > 255 {
        return Err(MeshError::Generic(format!(
            "invalid reed-solomon parameters k={} m={}",
            k, m
        )));
    }

    let shard_size = buf.len().div_ceil(k).max(1);

    let mut shards: Vec<Vec<u8>> = (0..k)
        .map(|i| {
            let start = i * shard_size;
            let end = (start + shard_size).min(buf.len());
            let mut shard = if start < buf.len() {
                buf[start..end].to_vec()
            } else {
                Vec::new()
            };
            shard.resize(shard_size, 0);
            shard
        })
        .collect();

    shards.extend((0..m).map(|_| vec![0u8; shard_size]));

    let rs = ReedSolomon::new(k, m)?;
    rs.encode(&mut shards)?;

    Ok(shards
        .into_iter()
        .enumerate()
        .map(|(index, bytes)| Shard {
            index: index as u32,
            bytes,
        })
        .collect())
}

/// Reconstruct the original buffer from a set of present/missing shards.
/// `present` has exactly `k + m` entries, indexed the same as `encode`'s
/// output; `None` marks a missing shard. Succeeds iff at least `k` entries
/// are `Some` and all present shards share a common length.
pub fn decode(
    mut present: Vec<Option<Vec<u8>>>,
    k: usize,
    m: usize,
) -> MeshResult<Vec<u8>> {
    if present.len() != k + m {
        return Err(MeshError::Generic(format!(
            "expected {} shard slots, got {}",
            k + m,
            present.len()
        )));
    }

    let have = present.iter().filter(|s| s.is_some()).count();
    if have < k {
        return Err(MeshError::Unrecoverable(have, k));
    }

    let lengths: Vec<usize> = present
        .iter()
        .filter_map(|s| s.as_ref().map(|b| b.len()))
        .collect();
    if lengths.iter().any(|&l| l != lengths[0]) {
        return Err(MeshError::ShardLengthMismatch);
    }

    let rs = ReedSolomon::new(k, m)?;
    rs.reconstruct(&mut present)?;

    let mut result = Vec::new();
    for shard in present.into_iter().take(k) {
        result.extend_from_slice(&shard.expect("reconstruct fills every slot"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_all_shards_present() {
        let buf = b"a reed solomon encoding round trip".to_vec();
        let shards = encode(&buf, 4, 2).unwrap();
        assert_eq!(shards.len(), 6);

        let present: Vec<Option<Vec<u8>>> =
            shards.iter().map(|s| Some(s.bytes.clone())).collect();
        let decoded = decode(present, 4, 2).unwrap();
        assert!(decoded.starts_with(&buf));
    }

    #[test]
    fn tolerates_up_to_m_losses() {
        let buf = vec![0xABu8; 1024 * 1024];
        let shards = encode(&buf, 8, 4).unwrap();

        let mut present: Vec<Option<Vec<u8>>> =
            shards.iter().map(|s| Some(s.bytes.clone())).collect();
        for idx in [0usize, 3, 7, 11] {
            present[idx] = None;
        }
        let decoded = decode(present, 8, 4).unwrap();
        assert_eq!(&decoded[..buf.len()], &buf[..]);
    }

    #[test]
    fn fails_with_fewer_than_k_shards() {
        let buf = vec![0x11u8; 1024 * 1024];
        let shards = encode(&buf, 8, 4).unwrap();

        let mut present: Vec<Option<Vec<u8>>> =
            shards.iter().map(|s| Some(s.bytes.clone())).collect();
        for idx in [0usize, 1, 2, 3, 4] {
            present[idx] = None;
        }
        let result = decode(present, 8, 4);
        assert!(matches!(result, Err(MeshError::Unrecoverable(4, 8))));
    }

    #[test]
    fn mismatched_shard_lengths_are_rejected() {
        let present = vec![
            Some(vec![0u8; 10]),
            Some(vec![0u8; 20]),
            Some(vec![0u8; 10]),
            None,
        ];
        let result = decode(present, 3, 1);
        assert!(matches!(result, Err(MeshError::ShardLengthMismatch)));
    }

    #[test]
    fn two_independent_encodings_are_byte_identical() {
        let buf = b"deterministic encoding input".to_vec();
        let a = encode(&buf, 6, 3).unwrap();
        let b = encode(&buf, 6, 3).unwrap();
        assert_eq!(a, b);
    }
}

use crate::error::{MeshError, MeshResult};
use crate::file_detector;
use crate::manifest::{EncryptionParams, Manifest};
use crate::pipeline::Pipeline;
use crate::placement::{self, PeerQuality};
use crate::store::LocalStore;
use crate::threshold;
use crate::transport::Transport;
use futures::stream::{FuturesUnordered, StreamExt};

/// Upload a blob end to end: classify, run it through the CES pipeline,
/// distribute a threshold key, plan placement, and disperse shards through
/// `transport`. Per-peer send failures are tolerated as long as at least `k`
/// placements land; otherwise the manifest is discarded.
///
/// Errors map onto the upload error set: `NoPeers`, compression/AEAD/coding
/// errors surface directly from `pipeline.process`, threshold failures
/// surface as `InvalidThreshold`, and `InsufficientPlacements(placed, k)` if
/// too few sends succeed.
#[allow(clippy::too_many_arguments)]
pub async fn upload(
    blob: &[u8],
    hint_name: Option<&str>,
    peer_quality: &[PeerQuality],
    participants: &[u32],
    threshold_t: u8,
    ttl: u32,
    pipeline: &Pipeline,
    transport: &dyn Transport,
    local_store: &LocalStore,
    now: i64,
) -> MeshResult<Manifest> {
    if blob.is_empty() {
        return Err(MeshError::EmptyBlob);
    }
    if peer_quality.is_empty() {
        return Err(MeshError::NoPeers);
    }

    let (file_type, level) = file_detector::classify(blob, hint_name);
    let file_hash: [u8; 32] = blake3::hash(blob).into();
    tracing::debug!("upload: classified as {} at level {}", file_type, level);

    let key = threshold::distribute(&file_hash, participants, threshold_t, transport, local_store, ttl, now).await?;

    let output = pipeline.process(blob, &key, &file_hash, level)?;
    let total = output.shards.len() as u32;

    let locations = placement::plan_placement(total, peer_quality)?;

    let mut placed = 0usize;
    for (shard, location) in output.shards.iter().zip(locations.iter()) {
        match transport.send_shard(location.peer_id, &file_hash, shard.index, &shard.bytes).await {
            Ok(()) => {
                local_store.put_shard(&file_hash, shard.index, &shard.bytes, ttl, now)?;
                placed += 1;
            }
            Err(e) => {
                tracing::warn!("placement send to peer {} failed: {}", location.peer_id, e);
            }
        }
    }

    let k = pipeline.k;
    if placed < k {
        return Err(MeshError::InsufficientPlacements(placed, k));
    }

    let manifest = Manifest::new(
        file_hash,
        hint_name.map(str::to_string),
        output.original_size,
        pipeline.k as u32,
        pipeline.m as u32,
        locations.iter().map(|l| (l.index, l.peer_id)).collect(),
        now,
        ttl,
        output.compression_level,
        EncryptionParams {
            algorithm: "xchacha20poly1305".to_string(),
            nonce: output.nonce,
            additional_data: file_hash.to_vec(),
        },
    );

    crate::logging::log_pipeline_stage(&hex::encode(file_hash), "upload", &format!("placed {}/{}", placed, total));
    Ok(manifest)
}

/// Download and reconstruct the blob a `Manifest` describes. Shard fetches
/// race concurrently; as soon as `k` distinct shards are collected the
/// remaining in-flight fetches are abandoned. The threshold key is
/// reconstructed first from `key_peers`/`threshold_t`.
pub async fn download(
    manifest: &Manifest,
    key_peers: &[u32],
    threshold_t: u8,
    pipeline: &Pipeline,
    transport: &dyn Transport,
    local_store: &LocalStore,
    now: i64,
) -> MeshResult<Vec<u8>> {
    let key = threshold::reconstruct(&manifest.file_hash, key_peers, threshold_t, transport, local_store, now).await?;

    let k = manifest.shard_count as usize;
    let total = manifest.shard_locations.len();
    let mut present: Vec<Option<Vec<u8>>> = vec![None; total];

    let mut in_flight = FuturesUnordered::new();
    for (index, peer_id) in manifest.shard_locations.iter().copied() {
        in_flight.push(async move {
            let result = transport.fetch_shard(peer_id, &manifest.file_hash, index).await;
            (index, result)
        });
    }

    let mut have = 0usize;
    while let Some((index, result)) = in_flight.next().await {
        if let Ok(bytes) = result {
            present[index as usize] = Some(bytes);
            have += 1;
            if have >= k {
                break;
            }
        }
    }
    drop(in_flight);

    let blob = pipeline.reconstruct(
        present,
        &manifest.encryption_params.nonce,
        &manifest.encryption_params.additional_data,
        &key,
        manifest.file_size,
        manifest.compression_level,
    )?;

    let recovered_hash: [u8; 32] = blake3::hash(&blob).into();
    if recovered_hash != manifest.file_hash {
        return Err(MeshError::HashMismatch);
    }

    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::PeerQuality;
    use crate::transport::local::InMemoryTransport;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let pipeline = Pipeline::new(8, 4);

        let peer_quality: Vec<PeerQuality> = (0..12).map(|id| PeerQuality::unknown(id)).collect();
        let participants = [100u32, 101, 102, 103, 104];

        let blob = b"Hello, Pangea! This travels through the full upload facade.\n".to_vec();
        let manifest = upload(
            &blob,
            None,
            &peer_quality,
            &participants,
            3,
            0,
            &pipeline,
            &transport,
            &local_store,
            1000,
        )
        .await
        .unwrap();

        let downloaded = download(&manifest, &[100, 101, 104], 3, &pipeline, &transport, &local_store, 1000)
            .await
            .unwrap();
        assert_eq!(downloaded, blob);
    }

    #[tokio::test]
    async fn upload_fails_with_no_peers() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let pipeline = Pipeline::new(8, 4);

        let result = upload(
            b"data",
            None,
            &[],
            &[1, 2, 3],
            2,
            0,
            &pipeline,
            &transport,
            &local_store,
            1000,
        )
        .await;
        assert!(matches!(result, Err(MeshError::NoPeers)));
    }

    #[tokio::test]
    async fn upload_fails_when_too_few_placements_land() {
        let transport = InMemoryTransport::new();
        for peer in 0..12u32 {
            transport.set_unreachable(peer);
        }
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let pipeline = Pipeline::new(8, 4);

        let peer_quality: Vec<PeerQuality> = (0..12).map(|id| PeerQuality::unknown(id)).collect();
        let result = upload(
            b"some data to upload",
            None,
            &peer_quality,
            &[1, 2, 3],
            2,
            0,
            &pipeline,
            &transport,
            &local_store,
            1000,
        )
        .await;
        assert!(matches!(result, Err(MeshError::InsufficientPlacements(0, 8))));
    }

    #[tokio::test]
    async fn download_tolerates_losing_up_to_parity_count_shards() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let pipeline = Pipeline::new(8, 4);

        let peer_quality: Vec<PeerQuality> = (0..12).map(|id| PeerQuality::unknown(id)).collect();
        let participants = [1u32, 2, 3, 4, 5];
        let blob = vec![0x33u8; 200_000];

        let manifest = upload(
            &blob,
            None,
            &peer_quality,
            &participants,
            3,
            0,
            &pipeline,
            &transport,
            &local_store,
            1000,
        )
        .await
        .unwrap();

        for (_, peer_id) in manifest.shard_locations.iter().take(4) {
            transport.set_unreachable(*peer_id);
        }

        let downloaded = download(&manifest, &[1, 2, 5], 3, &pipeline, &transport, &local_store, 1000)
            .await
            .unwrap();
        assert_eq!(downloaded, blob);
    }
}

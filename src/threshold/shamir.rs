use crate::error::{MeshError, MeshResult};
use crate::resilience::{retry_async, RetryConfig};
use crate::store::LocalStore;
use crate::transport::Transport;
use rand::RngCore;
use sharks::{Share, Sharks};
use std::convert::TryFrom;
use std::time::Duration;

pub const KEY_LEN: usize = 32;

/// Generate a fresh 32-byte per-file key from a CSPRNG, Shamir-split it at
/// threshold `t` over `participants.len()` shares, and send one share to
/// each participant. A send that fails after three retries is still kept in
/// `local_store`, so the dealer can contribute it toward reconstruction if
/// quorum is reached some other way.
pub async fn distribute(
    file_hash: &[u8; 32],
    participants: &[u32],
    threshold: u8,
    transport: &dyn Transport,
    local_store: &LocalStore,
    ttl: u32,
    now: i64,
) -> MeshResult<[u8; KEY_LEN]> {
    if participants.is_empty() || threshold == 0 || threshold as usize > participants.len() {
        return Err(MeshError::InvalidThreshold(threshold, participants.len()));
    }

    let mut key = [0u8; KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);

    let sharks = Sharks(threshold);
    let shares: Vec<Share> = sharks.dealer(&key).take(participants.len()).collect();

    for (participant_id, share) in participants.iter().zip(shares.iter()) {
        let share_bytes: Vec<u8> = Vec::from(share);
        let participant_id = *participant_id;

        let send_result = retry_async(
            || async { transport.send_share(participant_id, file_hash, &share_bytes).await },
            RetryConfig::fixed(3, Duration::from_millis(100)),
            &format!("send_share(participant={})", participant_id),
        )
        .await;

        if send_result.is_err() {
            tracing::warn!(
                "failed to deliver share to participant {} after retries, keeping locally",
                participant_id
            );
            local_store.put_share(file_hash, participant_id, &share_bytes, ttl, now)?;
        }
    }

    crate::logging::log_key_event(&hex::encode(file_hash), "distributed");
    Ok(key)
}

/// Reconstruct the per-file key. Consults `local_store` first (shares the
/// dealer already holds, e.g. from a failed send), then fetches from peers
/// in order, stopping as soon as `threshold` distinct shares are held.
pub async fn reconstruct(
    file_hash: &[u8; 32],
    peers: &[u32],
    threshold: u8,
    transport: &dyn Transport,
    local_store: &LocalStore,
    now: i64,
) -> MeshResult<[u8; KEY_LEN]> {
    let mut collected: Vec<Share> = Vec::new();

    for &peer_id in peers {
        if collected.len() >= threshold as usize {
            break;
        }
        if let Ok(bytes) = local_store.get_share(file_hash, peer_id, now) {
            if let Ok(share) = Share::try_from(bytes.as_slice()) {
                collected.push(share);
                continue;
            }
        }
        if let Ok(bytes) = transport.fetch_share(peer_id, file_hash).await {
            if let Ok(share) = Share::try_from(bytes.as_slice()) {
                collected.push(share);
            }
        }
    }

    if collected.len() < threshold as usize {
        return Err(MeshError::InsufficientShares(collected.len(), threshold as usize));
    }

    let sharks = Sharks(threshold);
    let key_bytes = sharks
        .recover(collected.as_slice())
        .map_err(|e| MeshError::Generic(format!("shamir recovery failed: {}", e)))?;

    let mut key = [0u8; KEY_LEN];
    if key_bytes.len() != KEY_LEN {
        return Err(MeshError::Generic("recovered key has unexpected length".into()));
    }
    key.copy_from_slice(&key_bytes);

    crate::logging::log_key_event(&hex::encode(file_hash), "reconstructed");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::local::InMemoryTransport;
    use tempfile::TempDir;

    #[tokio::test]
    async fn distribute_then_reconstruct_from_threshold_subset() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let file_hash = [1u8; 32];
        let participants = [1u32, 2, 3, 4, 5];

        let key = distribute(&file_hash, &participants, 3, &transport, &local_store, 0, 1000)
            .await
            .unwrap();

        // Collect the shares the transport received so reconstruct can fetch them.
        let recovered = reconstruct(&file_hash, &[1, 3, 5], 3, &transport, &local_store, 1000)
            .await
            .unwrap();

        assert_eq!(recovered, key);
    }

    #[tokio::test]
    async fn reconstruct_fails_below_threshold() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let file_hash = [2u8; 32];
        let participants = [1u32, 2, 3, 4, 5];

        distribute(&file_hash, &participants, 3, &transport, &local_store, 0, 1000)
            .await
            .unwrap();

        let result = reconstruct(&file_hash, &[1, 3], 3, &transport, &local_store, 1000).await;
        assert!(matches!(result, Err(MeshError::InsufficientShares(2, 3))));
    }

    #[tokio::test]
    async fn undeliverable_share_is_kept_locally_and_still_usable() {
        let transport = InMemoryTransport::new();
        transport.set_unreachable(2);
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());
        let file_hash = [3u8; 32];
        let participants = [1u32, 2, 3, 4, 5];

        let key = distribute(&file_hash, &participants, 3, &transport, &local_store, 0, 1000)
            .await
            .unwrap();

        transport.set_reachable(2);
        // Participant 2's share never made it over the wire; it should still
        // be recoverable from local_store.
        let recovered = reconstruct(&file_hash, &[2, 1, 4], 3, &transport, &local_store, 1000)
            .await
            .unwrap();
        assert_eq!(recovered, key);
    }

    #[tokio::test]
    async fn invalid_threshold_is_rejected() {
        let transport = InMemoryTransport::new();
        let dir = TempDir::new().unwrap();
        let local_store = LocalStore::new(dir.path());

        let result = distribute(&[0u8; 32], &[1, 2], 5, &transport, &local_store, 0, 1000).await;
        assert!(matches!(result, Err(MeshError::InvalidThreshold(5, 2))));
    }
}

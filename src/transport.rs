use crate::error::{MeshError, MeshResult};
use async_trait::async_trait;

/// Quality sample for a peer, as reported by the transport's `get_quality`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerQualitySample {
    pub rtt_ms: f64,
    pub jitter_ms: f64,
    pub loss: f64,
}

/// The peer-session abstraction the core consumes; never implemented by the
/// core itself. Real implementations (libp2p or otherwise) live outside this
/// crate and satisfy this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, peer_address: &str) -> MeshResult<()>;
    async fn send_shard(&self, peer_id: u32, file_hash: &[u8; 32], shard_index: u32, bytes: &[u8]) -> MeshResult<()>;
    async fn fetch_shard(&self, peer_id: u32, file_hash: &[u8; 32], shard_index: u32) -> MeshResult<Vec<u8>>;
    async fn send_share(&self, peer_id: u32, file_hash: &[u8; 32], share: &[u8]) -> MeshResult<()>;
    async fn fetch_share(&self, peer_id: u32, file_hash: &[u8; 32]) -> MeshResult<Vec<u8>>;
    async fn get_quality(&self, peer_id: u32) -> MeshResult<PeerQualitySample>;
}

/// Eventual-consistency key-value store used optionally to publish
/// manifests by file-hash. Consumed, never implemented, by the core.
#[async_trait]
pub trait Dht: Send + Sync {
    async fn put(&self, key: &[u8], value: &[u8]) -> MeshResult<()>;
    async fn get(&self, key: &[u8]) -> MeshResult<Option<Vec<u8>>>;
}

/// In-memory `Transport`/`Dht` pair for exercising the core deterministically
/// without a real network. Not part of the production collaborator surface;
/// intended for the demonstration binary and tests.
pub mod local {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryTransport {
        shards: RwLock<HashMap<(u32, [u8; 32], u32), Vec<u8>>>,
        shares: RwLock<HashMap<(u32, [u8; 32]), Vec<u8>>>,
        quality: RwLock<HashMap<u32, PeerQualitySample>>,
        unreachable: RwLock<std::collections::HashSet<u32>>,
    }

    impl InMemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-seed a shard so `fetch_shard` can serve it without a prior
        /// `send_shard` round trip — used by tests that want a populated
        /// fixture without wiring a full upload.
        pub fn put_shard(&self, peer_id: u32, file_hash: [u8; 32], shard_index: u32, bytes: Vec<u8>) {
            self.shards
                .write()
                .unwrap()
                .insert((peer_id, file_hash, shard_index), bytes);
        }

        pub fn put_share(&self, peer_id: u32, file_hash: [u8; 32], share: Vec<u8>) {
            self.shares.write().unwrap().insert((peer_id, file_hash), share);
        }

        pub fn set_quality(&self, peer_id: u32, sample: PeerQualitySample) {
            self.quality.write().unwrap().insert(peer_id, sample);
        }

        /// Mark a peer as unreachable; subsequent sends/fetches to it fail.
        pub fn set_unreachable(&self, peer_id: u32) {
            self.unreachable.write().unwrap().insert(peer_id);
        }

        pub fn set_reachable(&self, peer_id: u32) {
            self.unreachable.write().unwrap().remove(&peer_id);
        }

        fn check_reachable(&self, peer_id: u32) -> MeshResult<()> {
            if self.unreachable.read().unwrap().contains(&peer_id) {
                Err(MeshError::PeerUnreachable(peer_id))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Transport for InMemoryTransport {
        async fn connect(&self, _peer_address: &str) -> MeshResult<()> {
            Ok(())
        }

        async fn send_shard(&self, peer_id: u32, file_hash: &[u8; 32], shard_index: u32, bytes: &[u8]) -> MeshResult<()> {
            self.check_reachable(peer_id)?;
            self.shards
                .write()
                .unwrap()
                .insert((peer_id, *file_hash, shard_index), bytes.to_vec());
            Ok(())
        }

        async fn fetch_shard(&self, peer_id: u32, file_hash: &[u8; 32], shard_index: u32) -> MeshResult<Vec<u8>> {
            self.check_reachable(peer_id)?;
            self.shards
                .read()
                .unwrap()
                .get(&(peer_id, *file_hash, shard_index))
                .cloned()
                .ok_or(MeshError::PeerUnreachable(peer_id))
        }

        async fn send_share(&self, peer_id: u32, file_hash: &[u8; 32], share: &[u8]) -> MeshResult<()> {
            self.check_reachable(peer_id)?;
            self.shares
                .write()
                .unwrap()
                .insert((peer_id, *file_hash), share.to_vec());
            Ok(())
        }

        async fn fetch_share(&self, peer_id: u32, file_hash: &[u8; 32]) -> MeshResult<Vec<u8>> {
            self.check_reachable(peer_id)?;
            self.shares
                .read()
                .unwrap()
                .get(&(peer_id, *file_hash))
                .cloned()
                .ok_or(MeshError::PeerUnreachable(peer_id))
        }

        async fn get_quality(&self, peer_id: u32) -> MeshResult<PeerQualitySample> {
            Ok(self
                .quality
                .read()
                .unwrap()
                .get(&peer_id)
                .copied()
                .unwrap_or(PeerQualitySample {
                    rtt_ms: 10.0,
                    jitter_ms: 1.0,
                    loss: 0.0,
                }))
        }
    }

    #[derive(Default)]
    pub struct InMemoryDht {
        store: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    }

    impl InMemoryDht {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Dht for InMemoryDht {
        async fn put(&self, key: &[u8], value: &[u8]) -> MeshResult<()> {
            self.store.write().unwrap().insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        async fn get(&self, key: &[u8]) -> MeshResult<Option<Vec<u8>>> {
            Ok(self.store.read().unwrap().get(key).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::local::*;
    use super::*;

    #[tokio::test]
    async fn in_memory_transport_round_trips_a_shard() {
        let transport = InMemoryTransport::new();
        let file_hash = [1u8; 32];
        transport.put_shard(7, file_hash, 0, vec![1, 2, 3]);

        let fetched = transport.fetch_shard(7, &file_hash, 0).await.unwrap();
        assert_eq!(fetched, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn send_shard_is_retrievable_via_fetch_shard() {
        let transport = InMemoryTransport::new();
        let file_hash = [3u8; 32];

        transport.send_shard(7, &file_hash, 2, &[9, 9, 9]).await.unwrap();
        let fetched = transport.fetch_shard(7, &file_hash, 2).await.unwrap();
        assert_eq!(fetched, vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn unreachable_peer_fails_fetch() {
        let transport = InMemoryTransport::new();
        transport.set_unreachable(9);

        let result = transport.fetch_shard(9, &[0u8; 32], 0).await;
        assert!(matches!(result, Err(MeshError::PeerUnreachable(9))));
    }

    #[tokio::test]
    async fn dht_round_trips_a_value() {
        let dht = InMemoryDht::new();
        dht.put(b"key", b"value").await.unwrap();
        assert_eq!(dht.get(b"key").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(dht.get(b"missing").await.unwrap(), None);
    }
}

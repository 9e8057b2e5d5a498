use crate::error::{MeshError, MeshResult};

/// Per-peer quality sample as reported by the transport's `get_quality`.
/// Mirrors the shape of the teacher's `quorum_manager::PeerReliability`
/// scoring inputs, generalized here from quorum sizing to shard placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerQuality {
    pub peer_id: u32,
    pub rtt_ms: f64,
    pub jitter_ms: f64,
    pub loss: f64,
}

impl PeerQuality {
    pub fn new(peer_id: u32, rtt_ms: f64, jitter_ms: f64, loss: f64) -> Self {
        Self {
            peer_id,
            rtt_ms,
            jitter_ms,
            loss,
        }
    }

    /// Equal-quality placeholder for peers with no reported quality sample.
    pub fn unknown(peer_id: u32) -> Self {
        Self {
            peer_id,
            rtt_ms: 0.0,
            jitter_ms: 0.0,
            loss: 0.0,
        }
    }

    /// Lower is better: a weighted blend of RTT, jitter and loss. Loss
    /// dominates since a lossy peer is unreachable more often than a slow one
    /// is merely inconvenient.
    fn penalty(&self) -> f64 {
        self.rtt_ms + self.jitter_ms * 2.0 + self.loss * 1000.0
    }
}

/// A single `(shard index, peer id)` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLocation {
    pub index: u32,
    pub peer_id: u32,
}

/// Order peers by descending quality (ascending penalty), ties broken by
/// ascending peer ID for a deterministic result.
fn ranked_peers(peers: &[PeerQuality]) -> Vec<PeerQuality> {
    let mut ranked = peers.to_vec();
    ranked.sort_by(|a, b| {
        a.penalty()
            .partial_cmp(&b.penalty())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.peer_id.cmp(&b.peer_id))
    });
    ranked
}

/// Plan shard-to-peer placements for `total_shards` (`k + m`) shards given a
/// candidate peer set and optional per-peer quality scores.
///
/// If a peer has no quality sample, it is treated as [`PeerQuality::unknown`]
/// (zero penalty) and ranks by peer ID among other unknown peers.
pub fn plan_placement(
    total_shards: u32,
    peers: &[PeerQuality],
) -> MeshResult<Vec<ShardLocation>> {
    if peers.is_empty() {
        return Err(MeshError::NoPeers);
    }

    let ranked = ranked_peers(peers);

    if ranked.len() as u32 >= total_shards {
        // Each shard gets a distinct peer: the top `total_shards` by quality.
        Ok((0..total_shards)
            .map(|index| ShardLocation {
                index,
                peer_id: ranked[index as usize].peer_id,
            })
            .collect())
    } else {
        // Round-robin over the ranked peers.
        Ok((0..total_shards)
            .map(|index| ShardLocation {
                index,
                peer_id: ranked[(index as usize) % ranked.len()].peer_id,
            })
            .collect())
    }
}

/// Convenience wrapper for callers with only a peer-ID list (no quality
/// data) — every peer gets [`PeerQuality::unknown`], so placement degrades
/// deterministically to ascending-peer-ID round robin.
pub fn plan_placement_equal_quality(
    total_shards: u32,
    peer_ids: &[u32],
) -> MeshResult<Vec<ShardLocation>> {
    let quality: Vec<PeerQuality> = peer_ids.iter().map(|id| PeerQuality::unknown(*id)).collect();
    plan_placement(total_shards, &quality)
}

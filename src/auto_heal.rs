use crate::manifest::Manifest;
use crate::pipeline::Pipeline;
use crate::placement;
use crate::store::LocalStore;
use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-manifest statistics the background loop maintains across ticks.
#[derive(Debug, Clone, Default)]
pub struct HealStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_heal_time: Option<i64>,
}

/// Outcome of a single heal tick for one manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum HealOutcome {
    /// `reachable >= target`; nothing to do.
    Healthy { reachable: usize },
    /// `k <= reachable < target`; missing shards were reconstructed and
    /// re-dispersed.
    Repaired { reachable_before: usize, reachable_after: usize },
    /// `reachable < k`; surfaced as a risk event, no writes performed.
    DataLossRisk { reachable: usize, k: usize },
}

/// Tracks per-manifest backoff state between ticks. On any heal failure the
/// next-check time is doubled, capped at `max_backoff_multiplier *
/// check_interval`, mirroring the corpus's circuit-breaker-style penalty
/// escalation but keyed per file rather than per global connection state.
#[derive(Debug, Clone)]
struct BackoffState {
    next_check: i64,
    multiplier: u32,
}

pub struct AutoHealController {
    min_shard_copies: usize,
    target_shard_copies: usize,
    check_interval_secs: i64,
    max_backoff_multiplier: u32,
    stats: RwLock<HashMap<[u8; 32], HealStats>>,
    backoff: RwLock<HashMap<[u8; 32], BackoffState>>,
}

impl AutoHealController {
    pub fn new(
        min_shard_copies: usize,
        target_shard_copies: usize,
        check_interval_secs: u64,
        max_backoff_multiplier: u32,
    ) -> Self {
        Self {
            min_shard_copies,
            target_shard_copies,
            check_interval_secs: check_interval_secs as i64,
            max_backoff_multiplier,
            stats: RwLock::new(HashMap::new()),
            backoff: RwLock::new(HashMap::new()),
        }
    }

    pub fn stats_for(&self, file_hash: &[u8; 32]) -> HealStats {
        self.stats.read().unwrap().get(file_hash).cloned().unwrap_or_default()
    }

    fn is_due(&self, file_hash: &[u8; 32], now: i64) -> bool {
        match self.backoff.read().unwrap().get(file_hash) {
            Some(state) => now >= state.next_check,
            None => true,
        }
    }

    fn record_failure_backoff(&self, file_hash: [u8; 32], now: i64) {
        let mut backoff = self.backoff.write().unwrap();
        let state = backoff.entry(file_hash).or_insert(BackoffState {
            next_check: now,
            multiplier: 1,
        });
        state.multiplier = (state.multiplier * 2).min(self.max_backoff_multiplier.max(1));
        state.next_check = now + self.check_interval_secs * state.multiplier as i64;
    }

    fn clear_backoff(&self, file_hash: &[u8; 32]) {
        self.backoff.write().unwrap().remove(file_hash);
    }

    /// Count how many of a manifest's shards are reachable, by probing each
    /// recorded peer through the transport collaborator.
    async fn count_reachable(&self, manifest: &Manifest, transport: &dyn Transport) -> usize {
        let mut reachable = 0;
        for (index, peer_id) in &manifest.shard_locations {
            if transport
                .fetch_shard(*peer_id, &manifest.file_hash, *index)
                .await
                .is_ok()
            {
                reachable += 1;
            }
        }
        reachable
    }

    /// Run one heal tick for a single manifest. Idempotent: running twice in
    /// succession on an already-healthy file performs no writes.
    pub async fn heal_one(
        &self,
        manifest: &mut Manifest,
        pipeline: &Pipeline,
        transport: &dyn Transport,
        local_store: &LocalStore,
        key: &[u8; 32],
        now: i64,
    ) -> HealOutcome {
        if !self.is_due(&manifest.file_hash, now) {
            let reachable = 0; // not probed; tick skipped entirely by backoff.
            return HealOutcome::Healthy { reachable };
        }

        let k = manifest.shard_count as usize;
        let reachable = self.count_reachable(manifest, transport).await;

        {
            let mut stats = self.stats.write().unwrap();
            let entry = stats.entry(manifest.file_hash).or_default();
            entry.attempts += 1;
            entry.last_heal_time = Some(now);
        }

        if reachable >= self.target_shard_copies {
            self.clear_backoff(&manifest.file_hash);
            return HealOutcome::Healthy { reachable };
        }

        if reachable < self.min_shard_copies.min(k) || reachable < k {
            crate::logging::log_heal_event(&hex::encode(manifest.file_hash), "data-loss-risk");
            self.record_failure_backoff(manifest.file_hash, now);
            let mut stats = self.stats.write().unwrap();
            stats.entry(manifest.file_hash).or_default().failures += 1;
            return HealOutcome::DataLossRisk { reachable, k };
        }

        // reachable in [k, target): reconstruct and re-disperse only the
        // missing shard indices.
        match self
            .repair(manifest, pipeline, transport, local_store, key, now)
            .await
        {
            Ok(reachable_after) => {
                self.clear_backoff(&manifest.file_hash);
                let mut stats = self.stats.write().unwrap();
                stats.entry(manifest.file_hash).or_default().successes += 1;
                HealOutcome::Repaired {
                    reachable_before: reachable,
                    reachable_after,
                }
            }
            Err(e) => {
                crate::logging::log_error_with_context("auto_heal repair", &e);
                self.record_failure_backoff(manifest.file_hash, now);
                let mut stats = self.stats.write().unwrap();
                stats.entry(manifest.file_hash).or_default().failures += 1;
                HealOutcome::DataLossRisk { reachable, k }
            }
        }
    }

    async fn repair(
        &self,
        manifest: &mut Manifest,
        pipeline: &Pipeline,
        transport: &dyn Transport,
        local_store: &LocalStore,
        key: &[u8; 32],
        now: i64,
    ) -> crate::error::MeshResult<usize> {
        let total = manifest.shard_count as usize + manifest.parity_count as usize;
        let mut present: Vec<Option<Vec<u8>>> = Vec::with_capacity(total);
        let mut missing_indices = Vec::new();

        for (index, peer_id) in manifest.shard_locations.iter() {
            match transport.fetch_shard(*peer_id, &manifest.file_hash, *index).await {
                Ok(bytes) => present.push(Some(bytes)),
                Err(_) => {
                    present.push(None);
                    missing_indices.push(*index);
                }
            }
        }

        let blob = pipeline.reconstruct(
            present,
            &manifest.encryption_params.nonce,
            &manifest.encryption_params.additional_data,
            key,
            manifest.file_size,
            manifest.compression_level,
        )?;

        // Reuse the manifest's recorded nonce so the regenerated shards are
        // byte-identical to the ones still held by surviving peers, rather
        // than an incompatible codeword produced under a fresh nonce.
        let out = pipeline.process_with_nonce(
            &blob,
            key,
            &manifest.encryption_params.additional_data,
            manifest.compression_level,
            manifest.encryption_params.nonce,
        )?;

        let candidate_peers: Vec<u32> = manifest
            .shard_locations
            .iter()
            .map(|(_, peer_id)| *peer_id)
            .collect();
        let new_locations = placement::plan_placement_equal_quality(total as u32, &candidate_peers)?;

        for index in &missing_indices {
            if let Some(shard) = out.shards.iter().find(|s| s.index == *index) {
                if let Some(location) = new_locations.iter().find(|l| l.index == *index) {
                    transport
                        .send_shard(location.peer_id, &manifest.file_hash, *index, &shard.bytes)
                        .await?;
                    local_store.put_shard(&manifest.file_hash, *index, &shard.bytes, manifest.ttl, now)?;
                    manifest.shard_locations[*index as usize] = (*index, location.peer_id);
                }
            }
        }

        Ok(total)
    }
}

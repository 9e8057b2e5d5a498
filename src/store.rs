use crate::error::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index entry recording when a replica was written, for TTL sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub created_at: i64,
    pub ttl: u32,
}

impl IndexEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        self.ttl != 0 && now.saturating_sub(self.created_at) >= self.ttl as i64
    }
}

fn file_hash_hex(file_hash: &[u8; 32]) -> String {
    hex::encode(file_hash)
}

/// On-disk layout for the two kinds of replica a node holds locally:
///
/// - `shards/<file_hash>/<index>.bin`
/// - `shares/<file_hash>/<participant_id>.bin`
///
/// Each directory carries a small JSON index mapping file names to
/// [`IndexEntry`], used by the TTL sweep. Writes are atomic: a temp file is
/// written, then renamed into place, grounded in the corpus's own
/// write-then-rename storage managers.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn shards_dir(&self, file_hash: &[u8; 32]) -> PathBuf {
        self.root.join("shards").join(file_hash_hex(file_hash))
    }

    fn shares_dir(&self, file_hash: &[u8; 32]) -> PathBuf {
        self.root.join("shares").join(file_hash_hex(file_hash))
    }

    fn index_path(dir: &Path) -> PathBuf {
        dir.join("index.json")
    }

    fn load_index(dir: &Path) -> MeshResult<HashMap<String, IndexEntry>> {
        let path = Self::index_path(dir);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save_index(dir: &Path, index: &HashMap<String, IndexEntry>) -> MeshResult<()> {
        let data = serde_json::to_string_pretty(index)?;
        write_atomic(&Self::index_path(dir), data.as_bytes())
    }

    pub fn put_shard(
        &self,
        file_hash: &[u8; 32],
        shard_index: u32,
        bytes: &[u8],
        ttl: u32,
        now: i64,
    ) -> MeshResult<()> {
        let dir = self.shards_dir(file_hash);
        std::fs::create_dir_all(&dir)?;
        let name = format!("{}.bin", shard_index);
        write_atomic(&dir.join(&name), bytes)?;

        let mut index = Self::load_index(&dir)?;
        index.insert(name, IndexEntry { created_at: now, ttl });
        Self::save_index(&dir, &index)
    }

    pub fn get_shard(&self, file_hash: &[u8; 32], shard_index: u32, now: i64) -> MeshResult<Vec<u8>> {
        let dir = self.shards_dir(file_hash);
        let name = format!("{}.bin", shard_index);
        let index = Self::load_index(&dir)?;
        if let Some(entry) = index.get(&name) {
            if entry.is_expired(now) {
                return Err(MeshError::TtlExpired);
            }
        }
        std::fs::read(dir.join(&name)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeshError::TtlExpired
            } else {
                MeshError::Io(e.to_string())
            }
        })
    }

    pub fn put_share(
        &self,
        file_hash: &[u8; 32],
        participant_id: u32,
        bytes: &[u8],
        ttl: u32,
        now: i64,
    ) -> MeshResult<()> {
        let dir = self.shares_dir(file_hash);
        std::fs::create_dir_all(&dir)?;
        let name = format!("{}.bin", participant_id);
        write_atomic(&dir.join(&name), bytes)?;

        let mut index = Self::load_index(&dir)?;
        index.insert(name, IndexEntry { created_at: now, ttl });
        Self::save_index(&dir, &index)
    }

    pub fn get_share(&self, file_hash: &[u8; 32], participant_id: u32, now: i64) -> MeshResult<Vec<u8>> {
        let dir = self.shares_dir(file_hash);
        let name = format!("{}.bin", participant_id);
        let index = Self::load_index(&dir)?;
        if let Some(entry) = index.get(&name) {
            if entry.is_expired(now) {
                return Err(MeshError::TtlExpired);
            }
        }
        std::fs::read(dir.join(&name)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeshError::TtlExpired
            } else {
                MeshError::Io(e.to_string())
            }
        })
    }

    /// Remove every entry in a directory's index whose TTL has elapsed,
    /// deleting the backing files and rewriting the index.
    pub fn sweep_expired(&self, file_hash: &[u8; 32], now: i64) -> MeshResult<usize> {
        let mut removed = 0;
        for dir in [self.shards_dir(file_hash), self.shares_dir(file_hash)] {
            if !dir.exists() {
                continue;
            }
            let mut index = Self::load_index(&dir)?;
            let expired: Vec<String> = index
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(name, _)| name.clone())
                .collect();
            for name in &expired {
                let _ = std::fs::remove_file(dir.join(name));
                index.remove(name);
                removed += 1;
            }
            if !expired.is_empty() {
                Self::save_index(&dir, &index)?;
            }
        }
        Ok(removed)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> MeshResult<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

use crate::error::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};

/// 32-byte content digest of the original blob.
pub type FileHash = [u8; 32];

pub const DEFAULT_FILE_NAME: &str = "uploaded_file";
pub const DEFAULT_PARITY_COUNT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionParams {
    pub algorithm: String,
    pub nonce: [u8; 24],
    pub additional_data: Vec<u8>,
}

/// The authoritative record of a file: sharding, placement, and crypto
/// parameters. `Serialize`/`Deserialize` are derived for convenience (JSON
/// debug dumps); the canonical wire form used for hashing and transport
/// equality is [`encode`]/[`decode`] below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub file_hash: FileHash,
    pub file_name: String,
    pub file_size: u64,
    pub shard_count: u32,
    pub parity_count: u32,
    pub shard_locations: Vec<(u32, u32)>,
    pub timestamp: i64,
    pub ttl: u32,
    pub compression_level: i32,
    pub encryption_params: EncryptionParams,
}

impl Manifest {
    pub fn new(
        file_hash: FileHash,
        file_name: Option<String>,
        file_size: u64,
        shard_count: u32,
        parity_count: u32,
        shard_locations: Vec<(u32, u32)>,
        timestamp: i64,
        ttl: u32,
        compression_level: i32,
        encryption_params: EncryptionParams,
    ) -> Self {
        Self {
            file_hash,
            file_name: file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            file_size,
            shard_count,
            parity_count,
            shard_locations,
            timestamp,
            ttl,
            compression_level,
            encryption_params,
        }
    }

    fn validate(&self) -> MeshResult<()> {
        if self.shard_locations.len() as u32 != self.shard_count + self.parity_count {
            return Err(MeshError::Generic(format!(
                "shard_count ({}) + parity_count ({}) != shard_locations length ({})",
                self.shard_count,
                self.parity_count,
                self.shard_locations.len()
            )));
        }
        if self.encryption_params.nonce.len() != 24 {
            return Err(MeshError::Generic("nonce must be 24 bytes".into()));
        }
        if self.file_name.as_bytes().len() > 255 {
            return Err(MeshError::Generic("file_name exceeds 255 bytes".into()));
        }
        Ok(())
    }
}

// --- Wire codec -------------------------------------------------------
//
// Deterministic, fixed field-order binary encoding. This is the format used
// for hashing and over-the-wire equality checks, not `serde`/`bincode`,
// because the format must fix field order and guarantee unknown-trailing-
// field tolerance for forward compatibility, which generic derive-based
// serialization does not promise.
//
// Layout (all integers little-endian):
//   magic: [u8; 4]            b"MSH1"
//   field_count: u16          number of core fields a writer populated
//   file_hash: [u8; 32]
//   file_name_len: u16, file_name: utf8 bytes
//   file_size: u64
//   shard_count: u32
//   parity_count: u32
//   num_locations: u32, locations: num_locations * (index: u32, peer_id: u32)
//   timestamp: i64
//   ttl: u32
//   compression_level: i32
//   algorithm_len: u16, algorithm: utf8 bytes
//   nonce: [u8; 24]
//   aad_len: u32, additional_data: bytes
//   trailing_len: u32, trailing: bytes   (opaque; reserved for fields newer
//                                         readers understand and this writer
//                                         does not; always empty today)
//
// A reader that encounters `field_count` greater than the number of fields
// it knows about still parses every field it recognizes, in order, then
// skips the trailing block wholesale. A reader that encounters a smaller
// `field_count` than expected (an older writer) fills the unparsed tail with
// defaults.

const MAGIC: &[u8; 4] = b"MSH1";
const KNOWN_FIELD_COUNT: u16 = 10;

pub fn encode(manifest: &Manifest) -> MeshResult<Vec<u8>> {
    manifest.validate()?;

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&KNOWN_FIELD_COUNT.to_le_bytes());

    out.extend_from_slice(&manifest.file_hash);

    let name_bytes = manifest.file_name.as_bytes();
    out.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(name_bytes);

    out.extend_from_slice(&manifest.file_size.to_le_bytes());
    out.extend_from_slice(&manifest.shard_count.to_le_bytes());
    out.extend_from_slice(&manifest.parity_count.to_le_bytes());

    out.extend_from_slice(&(manifest.shard_locations.len() as u32).to_le_bytes());
    for (index, peer_id) in &manifest.shard_locations {
        out.extend_from_slice(&index.to_le_bytes());
        out.extend_from_slice(&peer_id.to_le_bytes());
    }

    out.extend_from_slice(&manifest.timestamp.to_le_bytes());
    out.extend_from_slice(&manifest.ttl.to_le_bytes());
    out.extend_from_slice(&manifest.compression_level.to_le_bytes());

    let algo_bytes = manifest.encryption_params.algorithm.as_bytes();
    out.extend_from_slice(&(algo_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(algo_bytes);
    out.extend_from_slice(&manifest.encryption_params.nonce);

    let aad = &manifest.encryption_params.additional_data;
    out.extend_from_slice(&(aad.len() as u32).to_le_bytes());
    out.extend_from_slice(aad);

    // Reserved trailing block: no extension fields defined yet.
    out.extend_from_slice(&0u32.to_le_bytes());

    Ok(out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> MeshResult<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(MeshError::Generic("manifest buffer truncated".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u16(&mut self) -> MeshResult<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> MeshResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> MeshResult<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> MeshResult<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> MeshResult<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn string(&mut self) -> MeshResult<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| MeshError::Generic(format!("invalid utf-8 in manifest string: {}", e)))
    }
}

pub fn decode(bytes: &[u8]) -> MeshResult<Manifest> {
    let mut cursor = Cursor::new(bytes);

    let magic = cursor.take(4)?;
    if magic != MAGIC {
        return Err(MeshError::Generic("manifest magic mismatch".into()));
    }

    let field_count = cursor.u16()?;

    let file_hash: FileHash = cursor
        .take(32)?
        .try_into()
        .map_err(|_| MeshError::Generic("file_hash must be 32 bytes".into()))?;

    let file_name = if field_count >= 2 {
        cursor.string()?
    } else {
        DEFAULT_FILE_NAME.to_string()
    };

    let file_size = if field_count >= 3 { cursor.u64()? } else { 0 };
    let shard_count = if field_count >= 4 { cursor.u32()? } else { 0 };
    let parity_count = if field_count >= 5 {
        cursor.u32()?
    } else {
        DEFAULT_PARITY_COUNT
    };

    let shard_locations = if field_count >= 6 {
        let count = cursor.u32()? as usize;
        let mut locations = Vec::with_capacity(count);
        for _ in 0..count {
            let index = cursor.u32()?;
            let peer_id = cursor.u32()?;
            locations.push((index, peer_id));
        }
        locations
    } else {
        Vec::new()
    };

    let timestamp = if field_count >= 7 { cursor.i64()? } else { 0 };
    let ttl = if field_count >= 8 { cursor.u32()? } else { 0 };
    let compression_level = if field_count >= 9 { cursor.i32()? } else { 3 };

    let encryption_params = if field_count >= 10 {
        let algorithm = cursor.string()?;
        let nonce: [u8; 24] = cursor
            .take(24)?
            .try_into()
            .map_err(|_| MeshError::Generic("nonce must be 24 bytes".into()))?;
        let aad_len = cursor.u32()? as usize;
        let additional_data = cursor.take(aad_len)?.to_vec();
        EncryptionParams {
            algorithm,
            nonce,
            additional_data,
        }
    } else {
        EncryptionParams {
            algorithm: "xchacha20poly1305".to_string(),
            nonce: [0u8; 24],
            additional_data: Vec::new(),
        }
    };

    // Skip whatever trailing block is present, regardless of our own
    // field_count — this is what makes unknown fields from a newer writer
    // safely ignorable by an older reader.
    if cursor.pos + 4 <= cursor.bytes.len() {
        let trailing_len = cursor.u32()? as usize;
        cursor.take(trailing_len)?;
    }

    let manifest = Manifest {
        file_hash,
        file_name,
        file_size,
        shard_count,
        parity_count,
        shard_locations,
        timestamp,
        ttl,
        compression_level,
        encryption_params,
    };
    manifest.validate()?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> Manifest {
        Manifest::new(
            [7u8; 32],
            Some("report.pdf".to_string()),
            15,
            8,
            4,
            (0..12).map(|i| (i, i * 2)).collect(),
            1_700_000_000,
            0,
            9,
            EncryptionParams {
                algorithm: "xchacha20poly1305".to_string(),
                nonce: [1u8; 24],
                additional_data: vec![7u8; 32],
            },
        )
    }

    #[test]
    fn round_trips() {
        let manifest = sample_manifest();
        let encoded = encode(&manifest).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn two_encodings_of_same_manifest_are_byte_identical() {
        let manifest = sample_manifest();
        assert_eq!(encode(&manifest).unwrap(), encode(&manifest).unwrap());
    }

    #[test]
    fn rejects_mismatched_shard_count_and_locations() {
        let mut manifest = sample_manifest();
        manifest.shard_locations.pop();
        assert!(encode(&manifest).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let manifest = sample_manifest();
        let mut encoded = encode(&manifest).unwrap();
        encoded[0] = b'X';
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn truncated_buffer_is_a_structured_error_not_a_panic() {
        let manifest = sample_manifest();
        let encoded = encode(&manifest).unwrap();
        let result = decode(&encoded[..10]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_trailing_fields_are_ignored_on_read() {
        let manifest = sample_manifest();
        let mut encoded = encode(&manifest).unwrap();
        // Bump the field count to simulate a newer writer, then stuff extra
        // bytes into what this reader treats as the trailing block.
        encoded[4..6].copy_from_slice(&(KNOWN_FIELD_COUNT + 1).to_le_bytes());
        let trailing_len_pos = encoded.len() - 4;
        let extra = vec![0xAAu8; 16];
        encoded.truncate(trailing_len_pos);
        encoded.extend_from_slice(&(extra.len() as u32).to_le_bytes());
        encoded.extend_from_slice(&extra);

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.file_name, manifest.file_name);
        assert_eq!(decoded.shard_locations, manifest.shard_locations);
    }

    #[test]
    fn default_file_name_and_parity_count() {
        let manifest = Manifest::new(
            [0u8; 32],
            None,
            100,
            8,
            DEFAULT_PARITY_COUNT,
            (0..12).map(|i| (i, i)).collect(),
            0,
            0,
            3,
            EncryptionParams {
                algorithm: "xchacha20poly1305".to_string(),
                nonce: [0u8; 24],
                additional_data: Vec::new(),
            },
        );
        assert_eq!(manifest.file_name, DEFAULT_FILE_NAME);
        assert_eq!(manifest.parity_count, 4);
    }
}

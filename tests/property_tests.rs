/// Property-Based Tests for the Storage Core
///
/// Exercises the universally-quantified properties of the compress/encrypt/
/// shard pipeline, the manifest codec, and Shamir secret sharing across
/// randomly generated inputs rather than a handful of fixed cases.
use mesh_core::aead;
use mesh_core::compressor;
use mesh_core::manifest::{self, EncryptionParams, Manifest};
use mesh_core::pipeline::Pipeline;
use mesh_core::reed_solomon;
use proptest::prelude::*;

proptest! {
    /// decompress(compress(level, x)) == x for any bytes and any level in 0..=9.
    #[test]
    fn prop_compressor_round_trips(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        level in 0i32..=9,
    ) {
        let compressed = compressor::compress(level, &data).unwrap();
        let decompressed = compressor::decompress(&compressed).unwrap();
        prop_assert_eq!(decompressed, data);
    }

    /// AEAD round-trips for any key/nonce/aad/plaintext combination, and the
    /// ciphertext is always exactly 16 bytes longer than the plaintext.
    #[test]
    fn prop_aead_round_trips(
        key in prop::array::uniform32(any::<u8>()),
        aad in prop::collection::vec(any::<u8>(), 0..64),
        plaintext in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let nonce = aead::generate_nonce();
        let ciphertext = aead::encrypt(&key, &nonce, &aad, &plaintext).unwrap();
        prop_assert_eq!(ciphertext.len(), plaintext.len() + 16);

        let decrypted = aead::decrypt(&key, &nonce, &aad, &ciphertext).unwrap();
        prop_assert_eq!(decrypted, plaintext);
    }

    /// Reed-Solomon: any subset of at least k present shards reconstructs the
    /// original buffer; two independent encodings are byte-identical.
    #[test]
    fn prop_reed_solomon_erasure_tolerance(
        data in prop::collection::vec(any::<u8>(), 1..8192),
        k in 2usize..6,
        m in 1usize..4,
        seed in any::<u64>(),
    ) {
        let shards_a = reed_solomon::encode(&data, k, m).unwrap();
        let shards_b = reed_solomon::encode(&data, k, m).unwrap();
        prop_assert_eq!(&shards_a, &shards_b);

        // Deterministically drop up to m shards using `seed`, keeping at
        // least k present.
        let mut present: Vec<Option<Vec<u8>>> =
            shards_a.iter().map(|s| Some(s.bytes.clone())).collect();
        let total = k + m;
        let drop_count = (seed as usize) % (m + 1);
        for i in 0..drop_count {
            let idx = ((seed as usize) + i * 7) % total;
            present[idx] = None;
        }

        let decoded = reed_solomon::decode(present, k, m).unwrap();
        prop_assert_eq!(&decoded[..data.len()], &data[..]);
    }

    /// Manifest codec: decode(encode(m)) == m for any valid manifest shape.
    #[test]
    fn prop_manifest_round_trips(
        file_hash in prop::array::uniform32(any::<u8>()),
        file_name in "[a-zA-Z0-9_.]{0,64}",
        file_size in any::<u64>(),
        k in 1u32..16,
        m in 1u32..8,
        timestamp in any::<i64>(),
        ttl in any::<u32>(),
        compression_level in 0i32..=9,
        nonce in prop::array::uniform24(any::<u8>()),
        aad in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let shard_locations: Vec<(u32, u32)> =
            (0..(k + m)).map(|i| (i, i * 3 + 1)).collect();

        let manifest = Manifest::new(
            file_hash,
            Some(file_name),
            file_size,
            k,
            m,
            shard_locations,
            timestamp,
            ttl,
            compression_level,
            EncryptionParams {
                algorithm: "xchacha20poly1305".to_string(),
                nonce,
                additional_data: aad,
            },
        );

        let encoded = manifest::encode(&manifest).unwrap();
        let decoded = manifest::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, manifest);
    }

    /// Full pipeline: reconstruct(process(blob)) == blob when every shard is
    /// present, for arbitrary blobs, levels, and (k, m) pairs.
    #[test]
    fn prop_pipeline_round_trips(
        data in prop::collection::vec(any::<u8>(), 1..16384),
        level in 0i32..=9,
        k in 2usize..6,
        m in 1usize..4,
        key in prop::array::uniform32(any::<u8>()),
    ) {
        let pipeline = Pipeline::new(k, m);
        let aad = blake3::hash(&data).as_bytes().to_vec();

        let out = pipeline.process(&data, &key, &aad, level).unwrap();
        let present: Vec<Option<Vec<u8>>> =
            out.shards.iter().map(|s| Some(s.bytes.clone())).collect();

        let reconstructed = pipeline
            .reconstruct(present, &out.nonce, &aad, &key, out.original_size, out.compression_level)
            .unwrap();
        prop_assert_eq!(reconstructed, data);
    }
}

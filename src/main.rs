use clap::Parser;
use mesh_core::config::Config;
use mesh_core::manifest::{self, EncryptionParams, Manifest};
use mesh_core::transport::local::InMemoryTransport;
use mesh_core::transport::Transport;
use mesh_core::{file_detector, pipeline::Pipeline, placement};
use std::path::PathBuf;

/// Thin demonstration binary for the storage core. Wires the CES pipeline,
/// placement planner and manifest codec together against an in-memory
/// transport so the core can be exercised without a real network — the real
/// transport/DHT/CLI surface lives outside this crate.
#[derive(Parser, Debug)]
#[command(version, about = "Storage core demonstration binary")]
struct Args {
    /// Path to a file to round-trip through the pipeline. Defaults to an
    /// embedded sample blob when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to a config file (TOML). Falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mesh_core::logging::init_logging_safe();

    let args = Args::parse();
    let config = Config::load_or_default(args.config)?;

    let blob = match &args.input {
        Some(path) => std::fs::read(path)?,
        None => b"Hello, Pangea!\n".to_vec(),
    };
    let hint_name = args.input.as_ref().and_then(|p| p.file_name()).and_then(|n| n.to_str());

    let (file_type, level) = file_detector::classify(&blob, hint_name);
    tracing::info!("classified input as {} (compression level {})", file_type, level);

    let file_hash: [u8; 32] = blake3::hash(&blob).into();

    let mut key = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key);

    let pipeline = Pipeline::new(config.sharding.data_shards, config.sharding.parity_shards);
    let output = pipeline.process(&blob, &key, &file_hash, level)?;

    let transport = InMemoryTransport::new();
    let peer_ids: Vec<u32> = (0..output.shards.len() as u32).collect();
    let locations = placement::plan_placement_equal_quality(output.shards.len() as u32, &peer_ids)?;

    for (shard, location) in output.shards.iter().zip(locations.iter()) {
        transport.send_shard(location.peer_id, &file_hash, shard.index, &shard.bytes).await?;
    }

    let manifest = Manifest::new(
        file_hash,
        hint_name.map(str::to_string),
        output.original_size,
        config.sharding.data_shards as u32,
        config.sharding.parity_shards as u32,
        locations.iter().map(|l| (l.index, l.peer_id)).collect(),
        chrono::Utc::now().timestamp(),
        0,
        output.compression_level,
        EncryptionParams {
            algorithm: "xchacha20poly1305".to_string(),
            nonce: output.nonce,
            additional_data: file_hash.to_vec(),
        },
    );

    let encoded = manifest::encode(&manifest)?;
    tracing::info!("manifest encoded to {} bytes", encoded.len());
    let decoded = manifest::decode(&encoded)?;

    let mut present: Vec<Option<Vec<u8>>> = Vec::with_capacity(decoded.shard_locations.len());
    for (index, peer_id) in &decoded.shard_locations {
        present.push(transport.fetch_shard(*peer_id, &decoded.file_hash, *index).await.ok());
    }

    let reconstructed = pipeline.reconstruct(
        present,
        &decoded.encryption_params.nonce,
        &decoded.encryption_params.additional_data,
        &key,
        decoded.file_size,
        decoded.compression_level,
    )?;

    let reconstructed_hash: [u8; 32] = blake3::hash(&reconstructed).into();
    if reconstructed_hash != decoded.file_hash {
        anyhow::bail!("reconstructed file-hash mismatch");
    }

    println!(
        "round-trip succeeded: {} bytes in, {} bytes out, {} shards",
        blob.len(),
        reconstructed.len(),
        decoded.shard_locations.len()
    );

    Ok(())
}

use std::fmt;

/// Internal classification of a blob, used only to pick a compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    AlreadyCompressed,
    Media,
    Image,
    Text,
    Binary,
    Unknown,
}

impl FileType {
    /// The compression level this spec recommends for the classification.
    pub fn recommended_compression_level(&self) -> i32 {
        match self {
            FileType::AlreadyCompressed | FileType::Media => 0,
            FileType::Image => 1,
            FileType::Binary => 6,
            FileType::Text => 9,
            FileType::Unknown => 3,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::AlreadyCompressed => "already-compressed",
            FileType::Media => "media",
            FileType::Image => "image",
            FileType::Text => "text",
            FileType::Binary => "binary",
            FileType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

const MAGIC_INSPECT_LEN: usize = 512;

/// Magic-byte prefixes for already-compressed archive formats.
const COMPRESSED_MAGIC: &[(&[u8], FileType)] = &[
    (b"\x1f\x8b", FileType::AlreadyCompressed),         // gzip
    (b"PK\x03\x04", FileType::AlreadyCompressed),       // zip
    (b"\x28\xb5\x2f\xfd", FileType::AlreadyCompressed), // zstd
    (b"BZh", FileType::AlreadyCompressed),              // bzip2
    (b"\xfd7zXZ\x00", FileType::AlreadyCompressed),     // xz
    (b"\xff\xd8\xff", FileType::Image),                 // jpeg
    (b"\x89PNG\r\n\x1a\n", FileType::Image),            // png
    (b"GIF87a", FileType::Image),
    (b"GIF89a", FileType::Image),
    (b"ID3", FileType::Media), // mp3
];

/// Trailing 4-byte container signatures (checked when magic-byte detection
/// over the head of the buffer finds nothing).
const TRAILING_MAGIC: &[(&[u8; 4], FileType)] = &[
    (b"IEND", FileType::Image), // trailing PNG chunk (defensive, rare)
];

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mkv", "mp3", "flac", "avi", "mov", "webm"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const COMPRESSED_EXTENSIONS: &[&str] = &["zip", "gz", "xz", "bz2", "7z", "zst", "rar"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "json", "toml", "yaml", "yml", "csv", "rs", "py"];

/// Classify a blob and recommend a compression level.
///
/// Inspection order: magic bytes over the first [`MAGIC_INSPECT_LEN`] bytes,
/// then a trailing 4-byte container signature, then the extension hint, then
/// a printable-byte ratio over the first [`MAGIC_INSPECT_LEN`] bytes (≥ 90%
/// printable ⇒ text). Pure and deterministic; performs no I/O. Unclassifiable
/// input returns `(Unknown, 3)`.
pub fn classify(bytes: &[u8], hint_name: Option<&str>) -> (FileType, i32) {
    let head = &bytes[..bytes.len().min(MAGIC_INSPECT_LEN)];

    for (magic, file_type) in COMPRESSED_MAGIC {
        if head.starts_with(magic) {
            tracing::debug!("classified by magic bytes as {}", file_type);
            return (*file_type, file_type.recommended_compression_level());
        }
    }

    if bytes.len() >= 4 {
        let tail = &bytes[bytes.len() - 4..];
        for (signature, file_type) in TRAILING_MAGIC {
            if tail == signature.as_slice() {
                tracing::debug!("classified by trailing signature as {}", file_type);
                return (*file_type, file_type.recommended_compression_level());
            }
        }
    }

    if let Some(name) = hint_name {
        if let Some(ext) = extension_of(name) {
            if let Some(file_type) = classify_extension(&ext) {
                tracing::debug!("classified by extension '{}' as {}", ext, file_type);
                return (file_type, file_type.recommended_compression_level());
            }
        }
    }

    if is_mostly_printable(head) {
        tracing::debug!("classified by printable-ratio heuristic as text");
        return (FileType::Text, FileType::Text.recommended_compression_level());
    }

    if !bytes.is_empty() {
        tracing::debug!("no classification signal found, defaulting to binary");
        return (FileType::Binary, FileType::Binary.recommended_compression_level());
    }

    (FileType::Unknown, FileType::Unknown.recommended_compression_level())
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit('.').next().map(|s| s.to_ascii_lowercase())
}

fn classify_extension(ext: &str) -> Option<FileType> {
    if COMPRESSED_EXTENSIONS.contains(&ext) {
        Some(FileType::AlreadyCompressed)
    } else if MEDIA_EXTENSIONS.contains(&ext) {
        Some(FileType::Media)
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Some(FileType::Image)
    } else if TEXT_EXTENSIONS.contains(&ext) {
        Some(FileType::Text)
    } else {
        None
    }
}

fn is_mostly_printable(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let printable = sample
        .iter()
        .filter(|&&b| (0x20..=0x7e).contains(&b) || b == b'\n' || b == b'\t' || b == b'\r')
        .count();
    (printable as f64 / sample.len() as f64) >= 0.90
}

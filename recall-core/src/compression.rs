//! Content compression with automatic policy selection.
//!
//! Three modes:
//!   - **None** — passthrough.
//!   - **Lossless** — zlib (deflate) + base64; exact inverse for every input.
//!   - **Semantic** — lossy reduction for cold data: stop words removed,
//!     whitespace before punctuation dropped, whitespace runs collapsed.
//!     The original cannot be recovered; decompressing returns the reduced
//!     text as stored.
//!
//! [`Compressor::auto_compress`] picks the mode from size and age.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompressionConfig;
use crate::error::{RecallError, Result};

/// Words dropped by semantic compression.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will",
    "with",
];

static STOP_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = STOP_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("stop-word pattern is valid")
});

static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:!?])").expect("punctuation pattern is valid"));

static SPACE_AFTER_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,;:!?])\s+").expect("punctuation pattern is valid"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Compression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// Stored as-is.
    None,
    /// Reversible zlib + base64.
    Lossless,
    /// One-way stop-word and whitespace reduction.
    Semantic,
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Lossless => write!(f, "lossless"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

impl FromStr for CompressionMode {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lossless" => Ok(Self::Lossless),
            "semantic" => Ok(Self::Semantic),
            other => Err(RecallError::Configuration(format!(
                "Unknown compression mode: {other}"
            ))),
        }
    }
}

/// A compressed payload with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedData {
    /// How `data` was produced.
    pub mode: CompressionMode,
    /// Stored text (base64 for lossless).
    pub data: String,
    /// Input size in bytes.
    pub original_size: usize,
    /// Stored size in bytes.
    pub compressed_size: usize,
    /// `original_size / compressed_size`; NaN when both are zero.
    pub ratio: f64,
}

/// The compression unit.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    /// Create a compressor with the given policy.
    #[must_use]
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Compress `data` with an explicit mode.
    ///
    /// # Errors
    /// Returns [`RecallError::Compression`] if the deflate stream fails.
    pub fn compress(&self, data: &str, mode: CompressionMode) -> Result<CompressedData> {
        let stored = match mode {
            CompressionMode::None => data.to_string(),
            CompressionMode::Lossless => compress_lossless(data)?,
            CompressionMode::Semantic => compress_semantic(data),
        };
        let packed = CompressedData {
            mode,
            original_size: data.len(),
            compressed_size: stored.len(),
            ratio: calculate_ratio(data, &stored),
            data: stored,
        };
        debug!(
            mode = %mode,
            original = packed.original_size,
            compressed = packed.compressed_size,
            "Compressed payload"
        );
        Ok(packed)
    }

    /// Recover text from a compressed payload. Semantic payloads come back
    /// as stored.
    ///
    /// # Errors
    /// Returns [`RecallError::Compression`] on a corrupt lossless payload.
    pub fn decompress(&self, packed: &CompressedData) -> Result<String> {
        match packed.mode {
            CompressionMode::None | CompressionMode::Semantic => Ok(packed.data.clone()),
            CompressionMode::Lossless => decompress_lossless(&packed.data),
        }
    }

    /// Dispatch on a serialized mode tag.
    ///
    /// # Errors
    /// Returns [`RecallError::Configuration`] for an unknown tag, or
    /// [`RecallError::Compression`] on a corrupt lossless payload.
    pub fn decompress_tagged(&self, mode: &str, data: &str) -> Result<String> {
        match mode.parse::<CompressionMode>()? {
            CompressionMode::None | CompressionMode::Semantic => Ok(data.to_string()),
            CompressionMode::Lossless => decompress_lossless(data),
        }
    }

    /// Pick a mode from size and age, then compress.
    ///
    /// Below the size threshold nothing is compressed; above it, data older
    /// than the semantic age gets lossy compression and younger data gets
    /// lossless compression.
    ///
    /// # Errors
    /// Returns [`RecallError::Compression`] if the deflate stream fails.
    pub fn auto_compress(&self, data: &str, age_days: f64) -> Result<CompressedData> {
        let mode = self.select_mode(data.len(), age_days);
        self.compress(data, mode)
    }

    /// The mode [`Self::auto_compress`] would use.
    #[must_use]
    pub fn select_mode(&self, size_bytes: usize, age_days: f64) -> CompressionMode {
        if size_bytes < self.config.size_threshold_bytes {
            CompressionMode::None
        } else if age_days > f64::from(self.config.semantic_age_days) {
            CompressionMode::Semantic
        } else {
            CompressionMode::Lossless
        }
    }
}

/// Byte ratio of `original` to `compressed`. Two empty inputs give NaN.
#[must_use]
pub fn calculate_ratio(original: &str, compressed: &str) -> f64 {
    original.len() as f64 / compressed.len() as f64
}

/// Deflate + base64.
///
/// # Errors
/// Returns [`RecallError::Compression`] if the encoder fails.
pub fn compress_lossless(data: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data.as_bytes())
        .map_err(|e| RecallError::Compression(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| RecallError::Compression(e.to_string()))?;
    Ok(B64.encode(bytes))
}

/// Inverse of [`compress_lossless`].
///
/// # Errors
/// Returns [`RecallError::Compression`] on bad base64, a corrupt stream, or
/// non-UTF-8 output.
pub fn decompress_lossless(data: &str) -> Result<String> {
    let bytes = B64
        .decode(data)
        .map_err(|e| RecallError::Compression(format!("invalid base64: {e}")))?;
    let mut out = String::new();
    ZlibDecoder::new(bytes.as_slice())
        .read_to_string(&mut out)
        .map_err(|e| RecallError::Compression(e.to_string()))?;
    Ok(out)
}

/// Lossy stop-word and whitespace reduction.
#[must_use]
pub fn compress_semantic(data: &str) -> String {
    let stripped = STOP_WORD_RE.replace_all(data, "");
    let tight = SPACE_BEFORE_PUNCT_RE.replace_all(&stripped, "$1");
    let tight = SPACE_AFTER_PUNCT_RE.replace_all(&tight, "$1 ");
    WHITESPACE_RE.replace_all(&tight, " ").trim().to_string()
}

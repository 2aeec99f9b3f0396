//! Compression codecs for block pages.
//!
//! Every page in a block is compressed independently with the codec named by
//! the block's [`Encoding`]. Codec state is expensive to build (zstd contexts,
//! snappy hash tables), so readers and writers check compressors and
//! decompressors out of a process-wide [`CodecPool`] keyed by encoding and
//! hand them back when the block session ends.
//!
//! # Key Components
//!
//! - `Encoding`: codec identifier stored in block metadata
//! - `CodecPool`: free-lists of reusable codec objects
//! - `Compressor` / `Decompressor`: checked-out codec objects

mod pool;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use pool::{pool_for, pool_with_level, CodecPool, Compressor, Decompressor};

/// Codec identifier for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    None,
    Gzip,
    Lz4,
    Snappy,
    #[default]
    Zstd,
    /// Recognised in block metadata but not decodable by this crate.
    S2,
}

impl Encoding {
    pub const ALL: [Encoding; 6] = [
        Encoding::None,
        Encoding::Gzip,
        Encoding::Lz4,
        Encoding::Snappy,
        Encoding::Zstd,
        Encoding::S2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::None => "none",
            Encoding::Gzip => "gzip",
            Encoding::Lz4 => "lz4",
            Encoding::Snappy => "snappy",
            Encoding::Zstd => "zstd",
            Encoding::S2 => "s2",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Encoding::S2)
    }

    /// Compression level used when a block config does not set one.
    pub fn default_level(&self) -> i32 {
        match self {
            Encoding::Gzip => 6,
            Encoding::Zstd => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Encoding::ALL
            .iter()
            .copied()
            .find(|encoding| encoding.as_str() == lowered)
            .ok_or_else(|| Error::UnknownEncoding(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_encoding_name() {
        for encoding in Encoding::ALL {
            let parsed: Encoding = encoding.as_str().parse().expect("parse");
            assert_eq!(parsed, encoding);
        }
        assert_eq!("  ZSTD ".parse::<Encoding>().expect("parse"), Encoding::Zstd);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(matches!(
            "brotli".parse::<Encoding>(),
            Err(Error::UnknownEncoding(name)) if name == "brotli"
        ));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Encoding::Snappy).expect("serialize");
        assert_eq!(json, "\"snappy\"");
        let back: Encoding = serde_json::from_str("\"lz4\"").expect("deserialize");
        assert_eq!(back, Encoding::Lz4);
    }
}

//! Block configuration.
//!
//! Selects the block format version, the compression codec and its level.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::ContextReader;
use crate::compression::Encoding;
use crate::encoding::{self, DataReader, DataWriter, Version};
use crate::{Error, Result};

/// Configuration for reading and writing one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Block format version.
    /// Default: v2
    pub version: Version,

    /// Compression codec.
    /// Default: zstd
    pub encoding: Encoding,

    /// Compression level for gzip and zstd; `None` uses the codec default.
    pub compression_level: Option<i32>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            version: Version::V2,
            encoding: Encoding::Zstd,
            compression_level: None,
        }
    }
}

impl BlockConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read(path)?;
        let config: Self = serde_json::from_slice(&raw)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
        if !config.encoding.is_supported() {
            return Err(Error::UnsupportedEncoding(config.encoding));
        }
        Ok(config)
    }

    pub fn level(&self) -> i32 {
        self.compression_level
            .unwrap_or_else(|| self.encoding.default_level())
    }

    pub fn data_reader<'r, R: ContextReader + 'r>(
        &self,
        source: R,
    ) -> Result<Box<dyn DataReader + 'r>> {
        encoding::new_data_reader(self.version, source, self.encoding)
    }

    pub fn data_writer<'w, W: Write + 'w>(&self, sink: W) -> Result<Box<dyn DataWriter + 'w>> {
        encoding::new_data_writer(self.version, sink, self.encoding, self.level())
    }
}

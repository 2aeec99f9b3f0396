//! Paged, compressed block encoding for trace storage.
//!
//! A block is a sequence of independently compressed units addressed by
//! [`Record`]s. Writers buffer framed objects and cut them into pages;
//! readers fetch a contiguous run of records with one ranged read, or scan
//! the block page by page.

pub mod backend;
pub mod compression;
pub mod config;
pub mod encoding;
pub mod error;
pub mod metered;
pub mod object;
pub mod page;
pub mod record;

pub use backend::{ContextReader, MemoryReader, MmapReader, ReadContext};
pub use compression::Encoding;
pub use config::BlockConfig;
pub use encoding::{DataReader, DataWriter, Version};
pub use error::{Error, Result};
pub use record::Record;

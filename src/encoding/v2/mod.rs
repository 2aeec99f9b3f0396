//! Paged block format: each unit decompresses to an inner page envelope.

mod data_reader;
mod data_writer;

pub use data_reader::DataReader;
pub use data_writer::DataWriter;

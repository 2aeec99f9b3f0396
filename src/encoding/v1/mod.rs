//! Legacy block format: each unit decompresses straight to the object stream.

mod data_reader;
mod data_writer;

pub use data_reader::DataReader;
pub use data_writer::DataWriter;

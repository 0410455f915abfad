pub mod columnar;
pub mod file_lock;
pub mod layout;
pub mod manifest;
pub mod rollup_store;
pub mod segment;
pub mod segment_reader;
pub mod segment_writer;
pub mod source;

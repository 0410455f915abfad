pub mod archive_reader;
pub mod builder;
pub mod rollup;

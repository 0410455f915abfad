pub mod types;
pub mod filter;
pub mod aggregate;
pub mod engine;
pub mod cache;
pub mod prewarm;

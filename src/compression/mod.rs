pub mod compress;
pub mod delta;
pub mod dictionary;
pub mod vbyte;

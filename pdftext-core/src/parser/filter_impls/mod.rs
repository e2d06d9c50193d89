//! PDF stream filter implementations
//!
//! Decoders that are too large to live next to the filter dispatch in
//! [`super::filters`] (ISO 32000-1:2008 Section 7.4).

pub mod lzw;
pub mod predictor;

pub use lzw::decode_lzw;
pub use predictor::apply_predictor;

//! Read-side machinery: tokenization, intent detection, dedup diff,
//! content-quality checks, and the smart recall pipeline.

pub mod diff;
pub mod intent;
pub mod keyword;
pub mod quality;
pub mod recall;

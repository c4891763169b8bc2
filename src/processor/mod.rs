pub mod field_extractor;
pub mod price_normalizer;

pub use field_extractor::*;
pub use price_normalizer::*;

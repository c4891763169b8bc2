pub mod data_models;
pub mod run_summary;

pub use data_models::*;
pub use run_summary::*;

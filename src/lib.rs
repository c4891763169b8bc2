pub mod clock;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod storage;

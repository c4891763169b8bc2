pub mod debug_sink;
pub mod keyword_file;
pub mod response_cache;
pub mod result_store;

pub use debug_sink::*;
pub use keyword_file::*;
pub use response_cache::*;
pub use result_store::*;

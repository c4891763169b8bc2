pub mod display;
pub mod spreadsheet;
pub mod summary;

pub use display::*;
pub use spreadsheet::*;
pub use summary::*;

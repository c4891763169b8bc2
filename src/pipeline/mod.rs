pub mod orchestrator;
pub mod scraper;

pub use orchestrator::*;
pub use scraper::*;

use std::any::Any;

/// Readable text for a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub mod logging;
pub mod time;

pub use logging::truncate_text;
pub use time::epoch_millis;

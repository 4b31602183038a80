pub mod progress;

pub use progress::consume_progress_events;

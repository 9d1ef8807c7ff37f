pub mod events;
pub mod machine;
pub mod progress;

pub use events::{CompletionSummary, SessionEvent};
pub use machine::{Counters, Session};

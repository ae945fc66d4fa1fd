//! Fill Execution
//!
//! Writes matcher-chosen values back into the page with the interaction
//! sequence each kind of control expects.

mod executor;
mod poll;
mod typing;

pub use executor::{FillExecutor, FillMapping, FillReport, MatchResponse, SkippedField};
pub use poll::poll_until;
pub use typing::{Typist, TypingSpeed};

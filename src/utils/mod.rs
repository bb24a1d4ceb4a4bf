//! Terminal helpers shared by the command runners

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;

pub mod attention;
pub mod commands;
pub mod quiz;
pub mod reaction;
pub mod slider;
pub mod tracker;
pub mod typing;

pub use tracker::{CompletionTracker, TaskId};

//! Line-oriented console front end.
//!
//! Stands in for a windowing toolkit: commands typed on stdin map to menu
//! and tray commands, dialogs are asked as questions, and chrome updates are
//! logged by [`crate::shell::LoggingBackend`].
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop
//! - `input` - Line parsing and dispatch
//! - `dialogs` - Question-and-answer dialogs

mod dialogs;
mod input;
mod loop_runner;

pub use dialogs::{ConsoleDialogs, Question};
pub use input::{parse_line, Input, Target};
pub use loop_runner::{run, Channels};

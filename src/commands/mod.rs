// src/commands/mod.rs
//! Command handlers for the py2pyd CLI

mod convert;
pub mod progress;
mod prompt;

pub use convert::{ConvertStatus, cmd_convert, compiler_config};
pub use progress::ReportFormat;

#![doc = include_str!("../README.md")]

pub mod analyzer;
mod explorer;
pub mod report;

pub use analyzer::{analyze, AnalysisError, AnalysisOptions};
pub use report::{PathClass, Report, TerminalPath};

#![doc = include_str!("../README.md")]

pub mod count;
pub mod interval;
pub mod model;
pub mod wrap;

pub use count::{count_satisfying, Formula, Lit, PairKind, SymbolId, SymbolInfo, UnsupportedConstruct};
pub use interval::IntervalSet;
pub use model::PathDomain;

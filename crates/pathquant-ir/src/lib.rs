#![doc = include_str!("../README.md")]

pub mod cfg;
pub mod pred;
pub mod validate;

pub use cfg::{Block, BlockId, BlockKind, Cfg, Edge, EdgeKind};
pub use pred::{CmpOp, LinearExpr, Pred, Signedness, VarDecl, VarId};
pub use validate::{validate, GraphError};

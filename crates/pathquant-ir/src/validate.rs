use std::collections::VecDeque;

use indexmap::IndexSet;
use thiserror::Error;

use crate::cfg::{BlockId, BlockKind, Cfg, EdgeKind};
use crate::pred::VarId;

/// Structural defects that make a graph unanalyzable.
///
/// Validation runs before any path exploration; a malformed graph is
/// rejected outright and never produces a partial report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("entry block {0} does not exist")]
    InvalidEntry(BlockId),
    #[error("block {from} has an edge to missing block {to}")]
    DanglingEdge { from: BlockId, to: BlockId },
    #[error("branch block {0} must have exactly one true and one false successor")]
    MalformedBranch(BlockId),
    #[error("block {0} must have exactly one fall-through successor")]
    MalformedStraightLine(BlockId),
    #[error("terminal block {0} must have no successors")]
    TerminalWithSuccessor(BlockId),
    #[error("back edge from block {from} targets block {to}, which is not a loop header")]
    BackEdgeToNonHeader { from: BlockId, to: BlockId },
    #[error("loop header {0} has no incoming back edge")]
    HeaderWithoutBackEdge(BlockId),
    #[error("block {block} references undeclared variable v{var}")]
    UndeclaredVariable { block: BlockId, var: VarId },
    #[error("error label {0} is unreachable from the entry block")]
    UnreachableErrorLabel(BlockId),
}

/// Check the structural invariants the explorer relies on.
pub fn validate(cfg: &Cfg) -> Result<(), GraphError> {
    if cfg.entry >= cfg.blocks.len() {
        return Err(GraphError::InvalidEntry(cfg.entry));
    }

    let declared: IndexSet<VarId> = cfg
        .blocks
        .iter()
        .filter_map(|b| match b.kind {
            BlockKind::Declare { var } => Some(var),
            _ => None,
        })
        .collect();

    let mut headers_with_back_edge: IndexSet<BlockId> = IndexSet::new();

    for (id, block) in cfg.blocks.iter().enumerate() {
        for edge in &block.succs {
            if edge.to >= cfg.blocks.len() {
                return Err(GraphError::DanglingEdge { from: id, to: edge.to });
            }
            if edge.kind == EdgeKind::LoopBack {
                if !cfg.loop_headers.contains(&edge.to) {
                    return Err(GraphError::BackEdgeToNonHeader { from: id, to: edge.to });
                }
                headers_with_back_edge.insert(edge.to);
            }
        }

        match &block.kind {
            BlockKind::Branch { pred } => {
                let trues = block
                    .succs
                    .iter()
                    .filter(|e| e.kind == EdgeKind::CondTrue)
                    .count();
                let falses = block
                    .succs
                    .iter()
                    .filter(|e| e.kind == EdgeKind::CondFalse)
                    .count();
                if block.succs.len() != 2 || trues != 1 || falses != 1 {
                    return Err(GraphError::MalformedBranch(id));
                }
                check_pred_vars(cfg, id, pred, &declared)?;
            }
            BlockKind::Assume { pred } => {
                check_straight_line(cfg, id)?;
                check_pred_vars(cfg, id, pred, &declared)?;
            }
            BlockKind::Declare { var } => {
                check_straight_line(cfg, id)?;
                if *var >= cfg.vars.len() {
                    return Err(GraphError::UndeclaredVariable { block: id, var: *var });
                }
            }
            BlockKind::Update { var, .. } => {
                check_straight_line(cfg, id)?;
                check_var(cfg, id, *var, &declared)?;
            }
            BlockKind::Skip => check_straight_line(cfg, id)?,
            BlockKind::ErrorLabel | BlockKind::Terminal => {
                if !block.succs.is_empty() {
                    return Err(GraphError::TerminalWithSuccessor(id));
                }
            }
        }
    }

    for header in &cfg.loop_headers {
        if !headers_with_back_edge.contains(header) {
            return Err(GraphError::HeaderWithoutBackEdge(*header));
        }
    }

    // Every error label must be reachable, otherwise the graph almost
    // certainly does not describe the intended program.
    let reachable = reachable_from(cfg, cfg.entry);
    for (id, block) in cfg.blocks.iter().enumerate() {
        if matches!(block.kind, BlockKind::ErrorLabel) && !reachable.contains(&id) {
            return Err(GraphError::UnreachableErrorLabel(id));
        }
    }

    Ok(())
}

fn check_straight_line(cfg: &Cfg, id: BlockId) -> Result<(), GraphError> {
    let block = &cfg.blocks[id];
    let ok = block.succs.len() == 1
        && matches!(
            block.succs[0].kind,
            EdgeKind::Sequential | EdgeKind::LoopBack
        );
    if ok {
        Ok(())
    } else {
        Err(GraphError::MalformedStraightLine(id))
    }
}

fn check_pred_vars(
    cfg: &Cfg,
    block: BlockId,
    pred: &crate::pred::Pred,
    declared: &IndexSet<VarId>,
) -> Result<(), GraphError> {
    let mut vars = IndexSet::new();
    pred.vars(&mut vars);
    for var in vars {
        check_var(cfg, block, var, declared)?;
    }
    Ok(())
}

fn check_var(
    cfg: &Cfg,
    block: BlockId,
    var: VarId,
    declared: &IndexSet<VarId>,
) -> Result<(), GraphError> {
    if var >= cfg.vars.len() || !declared.contains(&var) {
        return Err(GraphError::UndeclaredVariable { block, var });
    }
    Ok(())
}

fn reachable_from(cfg: &Cfg, entry: BlockId) -> IndexSet<BlockId> {
    let mut seen = IndexSet::new();
    let mut queue = VecDeque::new();
    seen.insert(entry);
    queue.push_back(entry);
    while let Some(id) = queue.pop_front() {
        for edge in &cfg.blocks[id].succs {
            if seen.insert(edge.to) {
                queue.push_back(edge.to);
            }
        }
    }
    seen
}

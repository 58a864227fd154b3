//! Depth-first path exploration with an explicit worklist.
//!
//! Path state is owned, never shared: a branch clones the state for its
//! false side, so sibling paths cannot observe each other. The traversal
//! order is deterministic (true side first), and so is every count derived
//! from it.

use indexmap::IndexMap;
use num::traits::Zero;
use tracing::{debug, warn};

use pathquant_domain::PathDomain;
use pathquant_ir::{BlockId, BlockKind, Cfg, Edge, EdgeKind, GraphError};

use crate::analyzer::{AnalysisError, AnalysisOptions};
use crate::report::{PathClass, TerminalPath};

pub(crate) struct Exploration {
    pub paths: Vec<TerminalPath>,
    pub infeasible_paths: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
struct PathState {
    block: BlockId,
    /// Edges traversed so far.
    depth: usize,
    decisions: Vec<(BlockId, bool)>,
    /// Back-edge arrivals per loop header on this path.
    revisits: IndexMap<BlockId, usize>,
    domain: PathDomain,
}

enum Step {
    Continue(PathState),
    /// The path crossed the depth bound at a back edge.
    Grey(PathState),
}

/// Move over one edge. Depth counts every edge; the grey cutoff is checked
/// only when a back edge closes an iteration, so loop-free programs can
/// never turn grey.
fn traverse(mut state: PathState, edge: Edge, depth_limit: usize) -> Step {
    state.depth += 1;
    state.block = edge.to;
    if edge.kind == EdgeKind::LoopBack {
        *state.revisits.entry(edge.to).or_insert(0) += 1;
        if state.depth > depth_limit {
            return Step::Grey(state);
        }
    }
    Step::Continue(state)
}

pub(crate) fn explore(cfg: &Cfg, opts: &AnalysisOptions) -> Result<Exploration, AnalysisError> {
    let explorer = Explorer {
        cfg,
        opts,
        worklist: vec![PathState {
            block: cfg.entry,
            depth: 0,
            decisions: Vec::new(),
            revisits: IndexMap::new(),
            domain: PathDomain::new(),
        }],
        paths: Vec::new(),
        infeasible_paths: 0,
        truncated: false,
    };
    explorer.run()
}

struct Explorer<'a> {
    cfg: &'a Cfg,
    opts: &'a AnalysisOptions,
    worklist: Vec<PathState>,
    paths: Vec<TerminalPath>,
    infeasible_paths: u64,
    truncated: bool,
}

impl Explorer<'_> {
    fn run(mut self) -> Result<Exploration, AnalysisError> {
        while !self.truncated {
            let Some(state) = self.worklist.pop() else {
                break;
            };
            self.step(state)?;
        }
        Ok(Exploration {
            paths: self.paths,
            infeasible_paths: self.infeasible_paths,
            truncated: self.truncated,
        })
    }

    fn step(&mut self, state: PathState) -> Result<(), AnalysisError> {
        let id = state.block;
        let block = self.cfg.block(id);
        match &block.kind {
            BlockKind::ErrorLabel => self.record(state, PathClass::Failure),
            BlockKind::Terminal => self.record(state, PathClass::Success),
            BlockKind::Skip => {
                let edge = self.single_succ(id)?;
                self.follow(state, edge)
            }
            BlockKind::Declare { var } => {
                let mut state = state;
                state.domain.declare(*var, &self.cfg.vars[*var]);
                let edge = self.single_succ(id)?;
                self.follow(state, edge)
            }
            BlockKind::Update { var, delta } => {
                let mut state = state;
                state
                    .domain
                    .apply_update(*var, *delta)
                    .map_err(|source| AnalysisError::Unsupported { block: id, source })?;
                let edge = self.single_succ(id)?;
                self.follow(state, edge)
            }
            BlockKind::Assume { pred } => {
                let mut state = state;
                let count = state
                    .domain
                    .narrow(pred, false, true)
                    .map_err(|source| AnalysisError::Unsupported { block: id, source })?;
                if count.is_zero() {
                    self.infeasible_paths += 1;
                    debug!(block = id, "assumption made path infeasible");
                    return Ok(());
                }
                let edge = self.single_succ(id)?;
                self.follow(state, edge)
            }
            BlockKind::Branch { pred } => {
                let mut on_true = None;
                let mut on_false = None;
                for edge in &block.succs {
                    match edge.kind {
                        EdgeKind::CondTrue => on_true = Some(*edge),
                        EdgeKind::CondFalse => on_false = Some(*edge),
                        _ => {}
                    }
                }
                let (Some(true_edge), Some(false_edge)) = (on_true, on_false) else {
                    return Err(GraphError::MalformedBranch(id).into());
                };

                // False side is pushed first so the true side pops first.
                let mut false_state = state.clone();
                let mut true_state = state;

                let count = false_state
                    .domain
                    .narrow(pred, true, false)
                    .map_err(|source| AnalysisError::Unsupported { block: id, source })?;
                if count.is_zero() {
                    self.infeasible_paths += 1;
                } else {
                    false_state.decisions.push((id, false));
                    self.follow(false_state, false_edge)?;
                }

                let count = true_state
                    .domain
                    .narrow(pred, false, false)
                    .map_err(|source| AnalysisError::Unsupported { block: id, source })?;
                if count.is_zero() {
                    self.infeasible_paths += 1;
                } else {
                    true_state.decisions.push((id, true));
                    self.follow(true_state, true_edge)?;
                }
                Ok(())
            }
        }
    }

    fn follow(&mut self, state: PathState, edge: Edge) -> Result<(), AnalysisError> {
        match traverse(state, edge, self.opts.depth_limit) {
            Step::Continue(state) => {
                self.worklist.push(state);
                Ok(())
            }
            Step::Grey(state) => self.record(state, PathClass::Grey),
        }
    }

    fn record(&mut self, state: PathState, class: PathClass) -> Result<(), AnalysisError> {
        let probability = state.domain.probability().map_err(|source| {
            AnalysisError::Unsupported {
                block: state.block,
                source,
            }
        })?;
        self.paths.push(TerminalPath {
            class,
            probability,
            decisions: state.decisions,
            depth: state.depth,
        });
        if let Some(cap) = self.opts.max_paths {
            if self.paths.len() >= cap && !self.worklist.is_empty() {
                warn!(
                    recorded = self.paths.len(),
                    pending = self.worklist.len(),
                    "path cap reached, folding the unexplored remainder into grey"
                );
                self.truncated = true;
            }
        }
        Ok(())
    }

    fn single_succ(&self, id: BlockId) -> Result<Edge, AnalysisError> {
        self.cfg
            .block(id)
            .succs
            .first()
            .copied()
            .ok_or_else(|| GraphError::MalformedStraightLine(id).into())
    }
}

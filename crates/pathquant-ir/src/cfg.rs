use indexmap::IndexSet;

use crate::pred::{Pred, Signedness, VarDecl, VarId};

/// Index of a block within a [`Cfg`].
pub type BlockId = usize;

/// How control reaches a successor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Unconditional fall-through.
    Sequential,
    /// Branch successor taken when the predicate holds.
    CondTrue,
    /// Branch successor taken when the predicate does not hold.
    CondFalse,
    /// Fall-through that closes a loop iteration. Must target a loop header.
    LoopBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: BlockId,
    pub kind: EdgeKind,
}

/// What a block does when control reaches it.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// Bind `var` to a fresh nondeterministic value from its declared domain.
    Declare { var: VarId },
    /// Constrain the path; infeasible paths are silently discarded.
    Assume { pred: Pred },
    /// Fork on the predicate via `CondTrue`/`CondFalse` successors.
    Branch { pred: Pred },
    /// Add a constant to a declared variable (`var += delta`).
    Update { var: VarId, delta: i64 },
    /// Empty fall-through block.
    Skip,
    /// Reaching this block classifies the path as Failure.
    ErrorLabel,
    /// Reaching this block classifies the path as Success.
    Terminal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub succs: Vec<Edge>,
}

/// A control-flow graph over nondeterministic integer variables.
///
/// Blocks and variables are arena-allocated; ids are indices into the
/// respective vectors. `loop_headers` registers the blocks that `LoopBack`
/// edges are allowed to target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cfg {
    pub vars: Vec<VarDecl>,
    pub blocks: Vec<Block>,
    pub entry: BlockId,
    pub loop_headers: IndexSet<BlockId>,
}

impl Cfg {
    pub fn new() -> Self {
        Cfg::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, bits: u32, signedness: Signedness) -> VarId {
        let id = self.vars.len();
        self.vars.push(VarDecl {
            name: name.into(),
            bits,
            signedness,
        });
        id
    }

    pub fn add_block(&mut self, kind: BlockKind) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(Block {
            kind,
            succs: Vec::new(),
        });
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        self.blocks[from].succs.push(Edge { to, kind });
    }

    /// Unconditional fall-through edge.
    pub fn seq(&mut self, from: BlockId, to: BlockId) {
        self.add_edge(from, to, EdgeKind::Sequential);
    }

    /// Both successors of a branch block.
    pub fn branch_to(&mut self, from: BlockId, on_true: BlockId, on_false: BlockId) {
        self.add_edge(from, on_true, EdgeKind::CondTrue);
        self.add_edge(from, on_false, EdgeKind::CondFalse);
    }

    /// Back edge closing a loop iteration; registers `header` as a loop header.
    pub fn loop_back(&mut self, from: BlockId, header: BlockId) {
        self.add_edge(from, header, EdgeKind::LoopBack);
        self.loop_headers.insert(header);
    }
}

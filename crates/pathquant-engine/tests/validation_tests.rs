mod common;

use common::*;
use pathquant_engine::{analyze, AnalysisError};
use pathquant_ir::{BlockKind, Cfg, CmpOp, EdgeKind, GraphError, LinearExpr, Pred, Signedness};

fn graph_error(cfg: &Cfg) -> GraphError {
    match analyze(cfg, &opts(1000)) {
        Err(AnalysisError::Graph(e)) => e,
        other => panic!("expected a graph error, got {other:?}"),
    }
}

#[test]
fn empty_graph_is_rejected() {
    assert_eq!(graph_error(&Cfg::new()), GraphError::InvalidEntry(0));
}

#[test]
fn dangling_edge_is_rejected() {
    let mut cfg = flag_cascade();
    let skip = cfg.add_block(BlockKind::Skip);
    cfg.seq(skip, 999);
    assert_eq!(
        graph_error(&cfg),
        GraphError::DanglingEdge {
            from: skip,
            to: 999
        }
    );
}

#[test]
fn branch_with_missing_false_edge_is_rejected() {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let decl = cfg.add_block(BlockKind::Declare { var: a });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Eq, 0),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    cfg.seq(decl, branch);
    cfg.add_edge(branch, err, EdgeKind::CondTrue);
    assert_eq!(graph_error(&cfg), GraphError::MalformedBranch(branch));
}

#[test]
fn terminal_with_successor_is_rejected() {
    let mut cfg = flag_cascade();
    let done = cfg
        .blocks
        .iter()
        .position(|b| matches!(b.kind, BlockKind::Terminal))
        .expect("cascade has a terminal");
    cfg.seq(done, cfg.entry);
    assert_eq!(graph_error(&cfg), GraphError::TerminalWithSuccessor(done));
}

#[test]
fn back_edge_to_unregistered_header_is_rejected() {
    let mut cfg = flag_cascade();
    let skip = cfg.add_block(BlockKind::Skip);
    cfg.add_edge(skip, cfg.entry, EdgeKind::LoopBack);
    assert_eq!(
        graph_error(&cfg),
        GraphError::BackEdgeToNonHeader {
            from: skip,
            to: cfg.entry
        }
    );
}

#[test]
fn registered_header_without_back_edge_is_rejected() {
    let mut cfg = flag_cascade();
    cfg.loop_headers.insert(cfg.entry);
    assert_eq!(
        graph_error(&cfg),
        GraphError::HeaderWithoutBackEdge(cfg.entry)
    );
}

#[test]
fn variable_without_any_declare_block_is_rejected() {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let ghost = cfg.add_var("ghost", 32, Signedness::Signed);
    let decl = cfg.add_block(BlockKind::Declare { var: a });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(ghost, CmpOp::Eq, 0),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(decl, branch);
    cfg.branch_to(branch, err, done);
    assert_eq!(
        graph_error(&cfg),
        GraphError::UndeclaredVariable {
            block: branch,
            var: ghost
        }
    );
}

#[test]
fn unreachable_error_label_is_rejected() {
    let mut cfg = flag_cascade();
    let orphan = cfg.add_block(BlockKind::ErrorLabel);
    assert_eq!(graph_error(&cfg), GraphError::UnreachableErrorLabel(orphan));
}

// ---------------------------------------------------------------------
// Out-of-grammar predicates abort the run with the offending block.
// ---------------------------------------------------------------------

fn expect_unsupported(cfg: &Cfg) {
    match analyze(cfg, &opts(1000)) {
        Err(AnalysisError::Unsupported { .. }) => {}
        other => panic!("expected an unsupported-construct error, got {other:?}"),
    }
}

fn three_vars() -> (Cfg, Vec<usize>) {
    let mut cfg = Cfg::new();
    let vars: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| int32(&mut cfg, name))
        .collect();
    (cfg, vars)
}

#[test]
fn chained_orderings_are_rejected() {
    let (mut cfg, vars) = three_vars();
    let (a, b, c) = (vars[0], vars[1], vars[2]);
    let mut prev = None;
    for v in [a, b, c] {
        let decl = cfg.add_block(BlockKind::Declare { var: v });
        if let Some(prev) = prev {
            cfg.seq(prev, decl);
        }
        prev = Some(decl);
    }
    let assume = cfg.add_block(BlockKind::Assume {
        pred: Pred::cmp(LinearExpr::var(a), CmpOp::Lt, LinearExpr::var(b)),
    });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: Pred::cmp(LinearExpr::var(b), CmpOp::Lt, LinearExpr::var(c)),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(prev.expect("declared three variables"), assume);
    cfg.seq(assume, branch);
    cfg.branch_to(branch, err, done);
    expect_unsupported(&cfg);
}

#[test]
fn scaled_variable_against_another_variable_is_rejected() {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let b = int32(&mut cfg, "b");
    let a_decl = cfg.add_block(BlockKind::Declare { var: a });
    let b_decl = cfg.add_block(BlockKind::Declare { var: b });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: Pred::cmp(LinearExpr::term(2, a), CmpOp::Lt, LinearExpr::var(b)),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(a_decl, b_decl);
    cfg.seq(b_decl, branch);
    cfg.branch_to(branch, err, done);
    expect_unsupported(&cfg);
}

#[test]
fn same_variable_on_both_sides_is_rejected() {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let decl = cfg.add_block(BlockKind::Declare { var: a });
    let assume = cfg.add_block(BlockKind::Assume {
        pred: Pred::cmp(
            LinearExpr::var(a),
            CmpOp::Lt,
            LinearExpr::var(a).add(LinearExpr::constant(1)),
        ),
    });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Eq, 0),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(decl, assume);
    cfg.seq(assume, branch);
    cfg.branch_to(branch, err, done);
    expect_unsupported(&cfg);
}

#[test]
fn mixed_widths_in_one_expression_are_rejected() {
    let mut cfg = Cfg::new();
    let a = cfg.add_var("a", 32, Signedness::Signed);
    let b = cfg.add_var("b", 16, Signedness::Signed);
    let a_decl = cfg.add_block(BlockKind::Declare { var: a });
    let b_decl = cfg.add_block(BlockKind::Declare { var: b });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: Pred::cmp(
            LinearExpr::var(a).add(LinearExpr::var(b)),
            CmpOp::Lt,
            LinearExpr::constant(0),
        ),
    });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(a_decl, b_decl);
    cfg.seq(b_decl, branch);
    cfg.branch_to(branch, err, done);
    expect_unsupported(&cfg);
}

#[test]
fn update_before_declaration_on_a_path_is_rejected() {
    // `b` has a Declare block on the false side only, so validation
    // passes, but the true side updates it while unbound.
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let b = int32(&mut cfg, "b");
    let a_decl = cfg.add_block(BlockKind::Declare { var: a });
    let branch = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Eq, 0),
    });
    let bump = cfg.add_block(BlockKind::Update { var: b, delta: 1 });
    let b_decl = cfg.add_block(BlockKind::Declare { var: b });
    let err = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);
    cfg.seq(a_decl, branch);
    cfg.branch_to(branch, bump, b_decl);
    cfg.seq(bump, err);
    cfg.seq(b_decl, done);
    expect_unsupported(&cfg);
}

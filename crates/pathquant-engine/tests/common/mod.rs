#![allow(dead_code)]

use num::bigint::BigInt;
use num::rational::BigRational;

use pathquant_engine::AnalysisOptions;
use pathquant_ir::{BlockId, BlockKind, Cfg, CmpOp, LinearExpr, Pred, Signedness, VarId};

pub fn ratio(n: i128, d: i128) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

pub fn opts(depth_limit: usize) -> AnalysisOptions {
    AnalysisOptions {
        depth_limit,
        ..AnalysisOptions::default()
    }
}

pub fn int32(cfg: &mut Cfg, name: &str) -> VarId {
    cfg.add_var(name, 32, Signedness::Signed)
}

pub fn cmp_const(v: VarId, op: CmpOp, c: i64) -> Pred {
    Pred::cmp(LinearExpr::var(v), op, LinearExpr::constant(c))
}

pub fn between(v: VarId, lo: i64, hi: i64) -> Pred {
    Pred::And(vec![
        cmp_const(v, CmpOp::Ge, lo),
        cmp_const(v, CmpOp::Le, hi),
    ])
}

/// Declare `v` and assume it within `[lo, hi]`, chained after `prev`.
/// Returns the assume block so the chain can continue.
pub fn declared_in_range(
    cfg: &mut Cfg,
    prev: Option<BlockId>,
    v: VarId,
    lo: i64,
    hi: i64,
) -> BlockId {
    let decl = cfg.add_block(BlockKind::Declare { var: v });
    let assume = cfg.add_block(BlockKind::Assume {
        pred: between(v, lo, hi),
    });
    if let Some(prev) = prev {
        cfg.seq(prev, decl);
    }
    cfg.seq(decl, assume);
    assume
}

/// Four flags uniform over {0..9} with four cascaded error branches:
/// `if (a)`, `if (!b)`, `if (c && d)`, `if (c || d)`.
pub fn flag_cascade() -> Cfg {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");
    let b = int32(&mut cfg, "b");
    let c = int32(&mut cfg, "c");
    let d = int32(&mut cfg, "d");

    let a_in = declared_in_range(&mut cfg, None, a, 0, 9);
    let b_in = declared_in_range(&mut cfg, Some(a_in), b, 0, 9);
    let c_in = declared_in_range(&mut cfg, Some(b_in), c, 0, 9);
    let d_in = declared_in_range(&mut cfg, Some(c_in), d, 0, 9);

    let br1 = cfg.add_block(BlockKind::Branch {
        pred: Pred::truthy(a),
    });
    let e1 = cfg.add_block(BlockKind::ErrorLabel);
    let br2 = cfg.add_block(BlockKind::Branch {
        pred: Pred::Not(Box::new(Pred::truthy(b))),
    });
    let e2 = cfg.add_block(BlockKind::ErrorLabel);
    let br3 = cfg.add_block(BlockKind::Branch {
        pred: Pred::And(vec![Pred::truthy(c), Pred::truthy(d)]),
    });
    let e3 = cfg.add_block(BlockKind::ErrorLabel);
    let br4 = cfg.add_block(BlockKind::Branch {
        pred: Pred::Or(vec![Pred::truthy(c), Pred::truthy(d)]),
    });
    let e4 = cfg.add_block(BlockKind::ErrorLabel);
    let done = cfg.add_block(BlockKind::Terminal);

    cfg.seq(d_in, br1);
    cfg.branch_to(br1, e1, br2);
    cfg.branch_to(br2, e2, br3);
    cfg.branch_to(br3, e3, br4);
    cfg.branch_to(br4, e4, done);
    cfg
}

/// A 32-bit variable guarded by `a < 0` and `a >= 100` error branches,
/// then decremented in a `while (a >= 0)` loop. The loop body costs three
/// edges per iteration after a six-edge prologue.
pub fn decrement_loop() -> Cfg {
    let mut cfg = Cfg::new();
    let a = int32(&mut cfg, "a");

    let decl = cfg.add_block(BlockKind::Declare { var: a });
    let pad1 = cfg.add_block(BlockKind::Skip);
    let neg = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Lt, 0),
    });
    let e1 = cfg.add_block(BlockKind::ErrorLabel);
    let big = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Ge, 100),
    });
    let e2 = cfg.add_block(BlockKind::ErrorLabel);
    let pad2 = cfg.add_block(BlockKind::Skip);
    let pad3 = cfg.add_block(BlockKind::Skip);
    let header = cfg.add_block(BlockKind::Branch {
        pred: cmp_const(a, CmpOp::Ge, 0),
    });
    let dec = cfg.add_block(BlockKind::Update { var: a, delta: -1 });
    let pad4 = cfg.add_block(BlockKind::Skip);
    let done = cfg.add_block(BlockKind::Terminal);

    cfg.seq(decl, pad1);
    cfg.seq(pad1, neg);
    cfg.branch_to(neg, e1, big);
    cfg.branch_to(big, e2, pad2);
    cfg.seq(pad2, pad3);
    cfg.seq(pad3, header);
    cfg.branch_to(header, dec, done);
    cfg.seq(dec, pad4);
    cfg.loop_back(pad4, header);
    cfg
}

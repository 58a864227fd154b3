//! Exact counting of satisfying assignments.
//!
//! Constraints are conjunctions of formulas over base symbols. A formula is
//! a boolean combination of literals: an interval set on one symbol, or an
//! interval set on the difference/sum of two symbols. Disjunctions are
//! counted by a disjoint split (first disjunct, or its complement and the
//! next), so no assignment is ever counted twice. Counting happens over an
//! explicit symbol universe so the split stays measure-consistent.

use indexmap::{IndexMap, IndexSet};
use num::bigint::BigInt;
use num::traits::{One, Zero};
use thiserror::Error;

use pathquant_ir::Signedness;

use crate::interval::IntervalSet;
use crate::wrap;

/// Index of a path-local base symbol.
pub type SymbolId = usize;

/// A predicate falls outside the exactly countable grammar.
///
/// Nothing is approximated: the whole analysis aborts instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported construct: {detail}")]
pub struct UnsupportedConstruct {
    pub detail: String,
}

impl UnsupportedConstruct {
    pub fn new(detail: impl Into<String>) -> Self {
        UnsupportedConstruct {
            detail: detail.into(),
        }
    }
}

/// Width and signedness of a base symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    pub bits: u32,
    pub signedness: Signedness,
}

impl SymbolInfo {
    pub fn repr(&self) -> (i128, i128) {
        wrap::repr_range(self.bits, self.signedness)
    }

    /// Number of bit patterns, `2^bits`.
    pub fn domain_size(&self) -> BigInt {
        BigInt::one() << self.bits as usize
    }

    pub fn full_set(&self) -> IntervalSet {
        let (lo, hi) = self.repr();
        IntervalSet::range(lo, hi)
    }
}

/// Which joint quantity of a symbol pair a literal constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairKind {
    /// `a - b` is in the set.
    Diff,
    /// `a + b` is in the set.
    Sum,
}

/// An atomic constraint over base symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Bool(bool),
    Var {
        sym: SymbolId,
        set: IntervalSet,
    },
    /// Joint constraint on a symbol pair, normalized so `a < b`.
    Pair {
        a: SymbolId,
        b: SymbolId,
        kind: PairKind,
        set: IntervalSet,
    },
}

/// Build a normalized pair literal. `Diff` flips sign when operands swap.
pub fn pair_lit(a: SymbolId, b: SymbolId, kind: PairKind, set: IntervalSet) -> Lit {
    debug_assert_ne!(a, b);
    if a < b {
        Lit::Pair { a, b, kind, set }
    } else {
        let set = match kind {
            PairKind::Diff => set.negated(),
            PairKind::Sum => set,
        };
        Lit::Pair {
            a: b,
            b: a,
            kind,
            set,
        }
    }
}

/// A positive boolean combination of literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Lit(Lit),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    pub fn lit(lit: Lit) -> Self {
        Formula::Lit(lit)
    }

    pub fn symbols(&self, out: &mut IndexSet<SymbolId>) {
        match self {
            Formula::Lit(Lit::Bool(_)) => {}
            Formula::Lit(Lit::Var { sym, .. }) => {
                out.insert(*sym);
            }
            Formula::Lit(Lit::Pair { a, b, .. }) => {
                out.insert(*a);
                out.insert(*b);
            }
            Formula::And(cs) | Formula::Or(cs) => {
                for c in cs {
                    c.symbols(out);
                }
            }
        }
    }
}

fn pair_value_range(a: SymbolInfo, b: SymbolInfo, kind: PairKind) -> (i128, i128) {
    let (alo, ahi) = a.repr();
    let (blo, bhi) = b.repr();
    match kind {
        PairKind::Diff => (alo - bhi, ahi - blo),
        PairKind::Sum => (alo + blo, ahi + bhi),
    }
}

fn negate_lit(lit: &Lit, syms: &[SymbolInfo]) -> Lit {
    match lit {
        Lit::Bool(b) => Lit::Bool(!b),
        Lit::Var { sym, set } => {
            let (lo, hi) = syms[*sym].repr();
            Lit::Var {
                sym: *sym,
                set: set.complement_within(lo, hi),
            }
        }
        Lit::Pair { a, b, kind, set } => {
            let (lo, hi) = pair_value_range(syms[*a], syms[*b], *kind);
            Lit::Pair {
                a: *a,
                b: *b,
                kind: *kind,
                set: set.complement_within(lo, hi),
            }
        }
    }
}

fn negate_formula(f: &Formula, syms: &[SymbolInfo]) -> Formula {
    match f {
        Formula::Lit(l) => Formula::Lit(negate_lit(l, syms)),
        Formula::And(cs) => Formula::Or(cs.iter().map(|c| negate_formula(c, syms)).collect()),
        Formula::Or(cs) => Formula::And(cs.iter().map(|c| negate_formula(c, syms)).collect()),
    }
}

/// Count the assignments satisfying the conjunction of `conj`, over the
/// symbols referenced anywhere in it. Symbols left unconstrained by a
/// disjunct still contribute their full domain size, so disjoint disjunct
/// counts add up correctly.
pub fn count_satisfying(
    conj: &[Formula],
    syms: &[SymbolInfo],
) -> Result<BigInt, UnsupportedConstruct> {
    let mut universe = IndexSet::new();
    for f in conj {
        f.symbols(&mut universe);
    }
    count_over(&universe, conj.to_vec(), syms)
}

fn count_over(
    universe: &IndexSet<SymbolId>,
    conj: Vec<Formula>,
    syms: &[SymbolInfo],
) -> Result<BigInt, UnsupportedConstruct> {
    let mut lits = Vec::new();
    let mut stack = conj;
    stack.reverse();
    while let Some(f) = stack.pop() {
        match f {
            Formula::Lit(l) => lits.push(l),
            Formula::And(cs) => {
                for c in cs.into_iter().rev() {
                    stack.push(c);
                }
            }
            Formula::Or(cs) => {
                // Disjoint split: branch i asserts disjunct i and the
                // complements of all earlier disjuncts. Each branch is
                // strictly smaller than the original conjunction.
                let mut total = BigInt::zero();
                let mut negated_prefix: Vec<Formula> = Vec::new();
                for c in &cs {
                    let mut branch: Vec<Formula> =
                        Vec::with_capacity(lits.len() + negated_prefix.len() + stack.len() + 1);
                    branch.extend(lits.iter().cloned().map(Formula::Lit));
                    branch.extend(negated_prefix.iter().cloned());
                    branch.push(c.clone());
                    branch.extend(stack.iter().cloned());
                    total += count_over(universe, branch, syms)?;
                    negated_prefix.push(negate_formula(c, syms));
                }
                return Ok(total);
            }
        }
    }
    count_conj(universe, &lits, syms)
}

fn count_conj(
    universe: &IndexSet<SymbolId>,
    lits: &[Lit],
    syms: &[SymbolInfo],
) -> Result<BigInt, UnsupportedConstruct> {
    let mut var_sets: IndexMap<SymbolId, IntervalSet> = IndexMap::new();
    let mut pair_sets: IndexMap<(SymbolId, SymbolId, PairKind), IntervalSet> = IndexMap::new();

    for lit in lits {
        match lit {
            Lit::Bool(false) => return Ok(BigInt::zero()),
            Lit::Bool(true) => {}
            Lit::Var { sym, set } => {
                let entry = var_sets
                    .entry(*sym)
                    .or_insert_with(|| syms[*sym].full_set());
                *entry = entry.intersect(set);
            }
            Lit::Pair { a, b, kind, set } => {
                let entry = pair_sets.entry((*a, *b, *kind)).or_insert_with(|| {
                    let (lo, hi) = pair_value_range(syms[*a], syms[*b], *kind);
                    IntervalSet::range(lo, hi)
                });
                *entry = entry.intersect(set);
            }
        }
    }

    // A symbol may be jointly constrained with at most one partner and in
    // at most one joint quantity; anything richer needs real relational
    // reasoning and is out of grammar.
    let mut partner: IndexMap<SymbolId, (SymbolId, SymbolId, PairKind)> = IndexMap::new();
    for key in pair_sets.keys() {
        for sym in [key.0, key.1] {
            if let Some(prev) = partner.insert(sym, *key) {
                if prev != *key {
                    return Err(UnsupportedConstruct::new(format!(
                        "symbol s{sym} is jointly constrained with more than one partner"
                    )));
                }
            }
        }
    }

    let mut total = BigInt::one();
    for ((a, b, kind), dset) in &pair_sets {
        let sa = var_sets
            .get(a)
            .cloned()
            .unwrap_or_else(|| syms[*a].full_set());
        let sb = var_sets
            .get(b)
            .cloned()
            .unwrap_or_else(|| syms[*b].full_set());
        total *= count_pair(&sa, &sb, *kind, dset);
        if total.is_zero() {
            return Ok(total);
        }
    }
    for sym in universe {
        if partner.contains_key(sym) {
            continue;
        }
        match var_sets.get(sym) {
            Some(set) => total *= set.count(),
            None => total *= syms[*sym].domain_size(),
        }
        if total.is_zero() {
            return Ok(total);
        }
    }
    Ok(total)
}

/// Count pairs `(x, y)` with `x` in `sa`, `y` in `sb` and the joint quantity
/// (`x - y` or `x + y`) in `d`.
pub fn count_pair(sa: &IntervalSet, sb: &IntervalSet, kind: PairKind, d: &IntervalSet) -> BigInt {
    let mut total = BigInt::zero();
    for &(t1, t2) in d.ranges() {
        total += cumulative(sa, sb, kind, t2) - cumulative(sa, sb, kind, t1 - 1);
    }
    total
}

/// Pairs whose joint quantity is at most `t`.
fn cumulative(sa: &IntervalSet, sb: &IntervalSet, kind: PairKind, t: i128) -> BigInt {
    let mut total = BigInt::zero();
    for &ra in sa.ranges() {
        for &rb in sb.ranges() {
            total += match kind {
                PairKind::Diff => rect_diff_le(ra, rb, t),
                PairKind::Sum => rect_sum_le(ra, rb, t),
            };
        }
    }
    total
}

/// Pairs in the rectangle `[a,b] x [c,d]` with `x - y <= t`.
///
/// Columns split into a full region (every `y` qualifies) and a sloped
/// region where the count decreases by one per column.
fn rect_diff_le((a, b): (i128, i128), (c, d): (i128, i128), t: i128) -> BigInt {
    let mut total = BigInt::zero();
    let full_hi = b.min(c + t);
    if full_hi >= a {
        total += (BigInt::from(full_hi - a) + 1) * (BigInt::from(d - c) + 1);
    }
    let slope_lo = a.max(c + t + 1);
    let slope_hi = b.min(d + t);
    if slope_hi >= slope_lo {
        let first = d + t + 1 - slope_lo;
        let last = d + t + 1 - slope_hi;
        let n = BigInt::from(slope_hi - slope_lo) + 1;
        total += n * BigInt::from(first + last) / 2;
    }
    total
}

/// Pairs in the rectangle `[a,b] x [c,d]` with `x + y <= t`.
fn rect_sum_le((a, b): (i128, i128), (c, d): (i128, i128), t: i128) -> BigInt {
    let mut total = BigInt::zero();
    let full_hi = b.min(t - d);
    if full_hi >= a {
        total += (BigInt::from(full_hi - a) + 1) * (BigInt::from(d - c) + 1);
    }
    let slope_lo = a.max(t - d + 1);
    let slope_hi = b.min(t - c);
    if slope_hi >= slope_lo {
        let first = t - slope_lo - c + 1;
        let last = t - slope_hi - c + 1;
        let n = BigInt::from(slope_hi - slope_lo) + 1;
        total += n * BigInt::from(first + last) / 2;
    }
    total
}

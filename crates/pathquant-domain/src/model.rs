//! Per-path symbolic domain.
//!
//! Each `Declare` binds a variable to a fresh base symbol, so re-declaring
//! inside a loop yields an independent value. Constant updates accumulate as
//! an affine offset per symbol; the offset folds into the constant of every
//! comparison lowered afterwards, because reduction mod 2^bits commutes with
//! affine composition. All constraints reference base symbols, never
//! variables, so narrowing is a snapshot of the bindings at that step.

use indexmap::{IndexMap, IndexSet};
use num::bigint::BigInt;
use num::rational::BigRational;
use num::traits::{One, Zero};

use pathquant_ir::{CmpOp, LinearExpr, Pred, VarDecl, VarId};

use crate::count::{
    self, pair_lit, Formula, Lit, PairKind, SymbolId, SymbolInfo, UnsupportedConstruct,
};
use crate::interval::IntervalSet;
use crate::wrap;

/// Window enumeration for a single-variable comparison costs one interval
/// solve per wraparound window, and the window count tracks the coefficient
/// magnitude.
const MAX_WINDOWS: i128 = 1 << 20;

#[derive(Debug, Clone)]
struct SymbolState {
    info: SymbolInfo,
    /// Accumulated constant updates since declaration.
    offset: i128,
}

/// The symbolic state one path owns exclusively.
#[derive(Debug, Clone, Default)]
pub struct PathDomain {
    symbols: Vec<SymbolState>,
    bindings: IndexMap<VarId, SymbolId>,
    constraints: Vec<Formula>,
    assumptions: Vec<Formula>,
}

impl PathDomain {
    pub fn new() -> Self {
        PathDomain::default()
    }

    /// Bind `var` to a fresh symbol drawn uniformly from its declared domain.
    pub fn declare(&mut self, var: VarId, decl: &VarDecl) -> SymbolId {
        let sym = self.symbols.len();
        self.symbols.push(SymbolState {
            info: SymbolInfo {
                bits: decl.bits,
                signedness: decl.signedness,
            },
            offset: 0,
        });
        self.bindings.insert(var, sym);
        sym
    }

    /// Apply `var += delta`.
    pub fn apply_update(&mut self, var: VarId, delta: i64) -> Result<(), UnsupportedConstruct> {
        let sym = self.bound_symbol(var)?;
        let state = &mut self.symbols[sym];
        state.offset = state
            .offset
            .checked_add(delta as i128)
            .ok_or_else(offset_overflow)?;
        Ok(())
    }

    /// Conjoin `pred` (or its negation) and return the satisfying count of
    /// the accumulated constraints. A zero count means the path is
    /// infeasible from here on.
    pub fn narrow(
        &mut self,
        pred: &Pred,
        negated: bool,
        assumption: bool,
    ) -> Result<BigInt, UnsupportedConstruct> {
        let formula = self.lower_pred(pred, negated)?;
        if assumption {
            self.assumptions.push(formula.clone());
        }
        self.constraints.push(formula);
        self.satisfying_count()
    }

    /// Exact number of assignments satisfying all accumulated constraints.
    pub fn satisfying_count(&self) -> Result<BigInt, UnsupportedConstruct> {
        let infos = self.symbol_infos();
        count::count_satisfying(&self.constraints, &infos)
    }

    /// Fraction of the referenced symbols' joint domain satisfying all
    /// constraints.
    pub fn path_mass(&self) -> Result<BigRational, UnsupportedConstruct> {
        self.mass_of(&self.constraints)
    }

    /// Fraction satisfying the assumption-derived constraints alone.
    pub fn assumption_mass(&self) -> Result<BigRational, UnsupportedConstruct> {
        self.mass_of(&self.assumptions)
    }

    /// Path probability: the constraint mass conditioned on the assumption
    /// mass. With no assumptions this is the plain constraint mass.
    pub fn probability(&self) -> Result<BigRational, UnsupportedConstruct> {
        let mass = self.path_mass()?;
        let denom = self.assumption_mass()?;
        if denom.is_zero() {
            return Ok(BigRational::zero());
        }
        Ok(mass / denom)
    }

    fn symbol_infos(&self) -> Vec<SymbolInfo> {
        self.symbols.iter().map(|s| s.info).collect()
    }

    fn mass_of(&self, formulas: &[Formula]) -> Result<BigRational, UnsupportedConstruct> {
        let infos = self.symbol_infos();
        let numer = count::count_satisfying(formulas, &infos)?;
        let mut referenced = IndexSet::new();
        for f in formulas {
            f.symbols(&mut referenced);
        }
        let mut denom = BigInt::one();
        for sym in referenced {
            denom *= infos[sym].domain_size();
        }
        Ok(BigRational::new(numer, denom))
    }

    fn bound_symbol(&self, var: VarId) -> Result<SymbolId, UnsupportedConstruct> {
        self.bindings.get(&var).copied().ok_or_else(|| {
            UnsupportedConstruct::new(format!(
                "variable v{var} used before its declaration on this path"
            ))
        })
    }

    fn lower_pred(&self, pred: &Pred, negated: bool) -> Result<Formula, UnsupportedConstruct> {
        match pred {
            Pred::Not(p) => self.lower_pred(p, !negated),
            Pred::And(ps) => {
                let lowered = ps
                    .iter()
                    .map(|p| self.lower_pred(p, negated))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if negated {
                    Formula::Or(lowered)
                } else {
                    Formula::And(lowered)
                })
            }
            Pred::Or(ps) => {
                let lowered = ps
                    .iter()
                    .map(|p| self.lower_pred(p, negated))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if negated {
                    Formula::And(lowered)
                } else {
                    Formula::Or(lowered)
                })
            }
            Pred::Cmp { lhs, op, rhs } => {
                let op = if negated { op.negated() } else { *op };
                self.lower_cmp(lhs, op, rhs)
            }
        }
    }

    fn lower_cmp(
        &self,
        lhs: &LinearExpr,
        op: CmpOp,
        rhs: &LinearExpr,
    ) -> Result<Formula, UnsupportedConstruct> {
        let l = self.resolve_side(lhs)?;
        let r = self.resolve_side(rhs)?;
        match (l.terms.len(), r.terms.len()) {
            (0, 0) => Ok(Formula::Lit(Lit::Bool(wrap::cmp_holds(
                l.constant, op, r.constant,
            )))),
            (1, 0) | (2, 0) => self.lower_vs_const(&l, op, r.constant),
            (0, 1) | (0, 2) => self.lower_vs_const(&r, op.swapped(), l.constant),
            (1, 1) => self.lower_var_vs_var(&l, op, &r),
            _ => Err(UnsupportedConstruct::new(format!(
                "comparison `{lhs} {op} {rhs}` is outside the countable grammar"
            ))),
        }
    }

    /// `wrap(side) op rhs` where the side references one or two symbols.
    fn lower_vs_const(
        &self,
        side: &SideSum,
        op: CmpOp,
        rhs: i128,
    ) -> Result<Formula, UnsupportedConstruct> {
        if side.terms.len() == 1 {
            let (c, sym) = side.terms[0];
            if c.unsigned_abs() > MAX_WINDOWS as u128 {
                return Err(UnsupportedConstruct::new(format!(
                    "coefficient {c} exceeds the window enumeration bound"
                )));
            }
            let info = self.symbols[sym].info;
            let set =
                wrap::solve_wrapped_cmp(c, side.constant, op, rhs, info.bits, info.signedness);
            return Ok(Formula::Lit(Lit::Var { sym, set }));
        }

        let (c1, s1) = side.terms[0];
        let (c2, s2) = side.terms[1];
        if c1.unsigned_abs() != 1 || c2.unsigned_abs() != 1 {
            return Err(UnsupportedConstruct::new(format!(
                "coefficient {} next to a second variable",
                if c1.unsigned_abs() != 1 { c1 } else { c2 }
            )));
        }
        let info = self.symbols[s1].info;
        if self.symbols[s2].info != info {
            return Err(UnsupportedConstruct::new(
                "mixed widths in a two-variable expression",
            ));
        }

        let (rmin, rmax) = info.repr();
        let m = wrap::modulus(info.bits);
        let target = wrap::target_set(op, rhs, rmin, rmax);
        let (x_lo, x_hi) = affine_bounds(c1, rmin, rmax);
        let (y_lo, y_hi) = affine_bounds(c2, rmin, rmax);
        let (v_lo, v_hi) = (x_lo + y_lo + side.constant, x_hi + y_hi + side.constant);

        let mut pieces = Vec::new();
        for &(tlo, thi) in target.ranges() {
            let w_lo = wrap::div_ceil(v_lo - thi, m);
            let w_hi = wrap::div_floor(v_hi - tlo, m);
            for w in w_lo..=w_hi {
                pieces.push((tlo + w * m - side.constant, thi + w * m - side.constant));
            }
        }
        let set = IntervalSet::from_ranges(pieces);
        let (kind, set) = match (c1, c2) {
            (1, -1) => (PairKind::Diff, set),
            (-1, 1) => (PairKind::Diff, set.negated()),
            (1, 1) => (PairKind::Sum, set),
            (-1, -1) => (PairKind::Sum, set.negated()),
            _ => unreachable!("coefficients checked above"),
        };
        Ok(Formula::Lit(pair_lit(s1, s2, kind, set)))
    }

    /// `wrap(ca*x + ka) op wrap(cb*y + kb)`, each side in its own width.
    ///
    /// Within one wraparound window per side the comparison is a plain
    /// difference or sum constraint, so the lowering is a disjunction over
    /// the window pairs, each guarded by the window's x and y intervals.
    fn lower_var_vs_var(
        &self,
        l: &SideSum,
        op: CmpOp,
        r: &SideSum,
    ) -> Result<Formula, UnsupportedConstruct> {
        let (ca, x) = l.terms[0];
        let (cb, y) = r.terms[0];
        if x == y {
            return Err(UnsupportedConstruct::new(
                "the same variable appears on both sides of a comparison",
            ));
        }
        if ca.unsigned_abs() != 1 || cb.unsigned_abs() != 1 {
            return Err(UnsupportedConstruct::new(format!(
                "coefficient {} in a variable-to-variable comparison",
                if ca.unsigned_abs() != 1 { ca } else { cb }
            )));
        }
        let xi = self.symbols[x].info;
        let yi = self.symbols[y].info;
        let (ka, kb) = (l.constant, r.constant);

        // Joint value range of ca*x - cb*y, for clamping target intervals.
        let (xr_min, xr_max) = xi.repr();
        let (yr_min, yr_max) = yi.repr();
        let (px_lo, px_hi) = affine_bounds(ca, xr_min, xr_max);
        let (py_lo, py_hi) = affine_bounds(-cb, yr_min, yr_max);
        let (p_lo, p_hi) = (px_lo + py_lo, px_hi + py_hi);

        let x_windows = side_windows(ca, ka, xi);
        let y_windows = side_windows(cb, kb, yi);
        let mut branches = Vec::new();
        for (wa, x_window) in &x_windows {
            for (wb, y_window) in &y_windows {
                let shift = ka - kb - wa * wrap::modulus(xi.bits) + wb * wrap::modulus(yi.bits);
                let target = wrap::target_set(op, -shift, p_lo, p_hi);
                if target.is_empty() {
                    continue;
                }
                let (kind, set) = match (ca, cb) {
                    (1, 1) => (PairKind::Diff, target),
                    (1, -1) => (PairKind::Sum, target),
                    (-1, -1) => (PairKind::Diff, target.negated()),
                    (-1, 1) => (PairKind::Sum, target.negated()),
                    _ => unreachable!("coefficients checked above"),
                };
                branches.push(Formula::And(vec![
                    Formula::Lit(Lit::Var {
                        sym: x,
                        set: x_window.clone(),
                    }),
                    Formula::Lit(Lit::Var {
                        sym: y,
                        set: y_window.clone(),
                    }),
                    Formula::Lit(pair_lit(x, y, kind, set)),
                ]));
            }
        }
        Ok(match branches.len() {
            0 => Formula::Lit(Lit::Bool(false)),
            1 => branches.remove(0),
            _ => Formula::Or(branches),
        })
    }

    fn resolve_side(&self, e: &LinearExpr) -> Result<SideSum, UnsupportedConstruct> {
        let mut constant = e.constant as i128;
        let mut coeffs: IndexMap<SymbolId, i128> = IndexMap::new();
        for (c, v) in &e.terms {
            let sym = self.bound_symbol(*v)?;
            let c = *c as i128;
            let folded = c
                .checked_mul(self.symbols[sym].offset)
                .ok_or_else(offset_overflow)?;
            constant = constant.checked_add(folded).ok_or_else(offset_overflow)?;
            *coeffs.entry(sym).or_insert(0) += c;
        }
        coeffs.retain(|_, c| *c != 0);
        Ok(SideSum {
            constant,
            terms: coeffs.into_iter().map(|(s, c)| (c, s)).collect(),
        })
    }
}

/// One comparison side, resolved to base symbols with offsets folded into
/// the constant and duplicate symbols merged.
#[derive(Debug)]
struct SideSum {
    constant: i128,
    terms: Vec<(i128, SymbolId)>,
}

fn offset_overflow() -> UnsupportedConstruct {
    UnsupportedConstruct::new("affine offset overflow")
}

fn affine_bounds(c: i128, lo: i128, hi: i128) -> (i128, i128) {
    if c >= 0 {
        (c * lo, c * hi)
    } else {
        (c * hi, c * lo)
    }
}

/// Wraparound windows of `c*x + k` over the representable range of `x`,
/// with the x-interval each window covers. `|c| == 1`, so there are at most
/// two non-empty windows.
fn side_windows(c: i128, k: i128, info: SymbolInfo) -> Vec<(i128, IntervalSet)> {
    let (rmin, rmax) = info.repr();
    let m = wrap::modulus(info.bits);
    let (u_lo, u_hi) = {
        let (lo, hi) = affine_bounds(c, rmin, rmax);
        (lo + k, hi + k)
    };
    let w_lo = wrap::div_ceil(u_lo - rmax, m);
    let w_hi = wrap::div_floor(u_hi - rmin, m);
    let mut windows = Vec::new();
    for w in w_lo..=w_hi {
        let window = wrap::solve_affine_between(c, k - w * m, rmin, rmax)
            .intersect(&IntervalSet::range(rmin, rmax));
        if !window.is_empty() {
            windows.push((w, window));
        }
    }
    windows
}

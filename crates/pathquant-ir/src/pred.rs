use std::fmt;

use indexmap::IndexSet;

/// Index of a declared variable within a [`crate::Cfg`].
pub type VarId = usize;

/// Two's-complement interpretation of a variable's bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// A nondeterministic integer variable, uniform over its 2^bits bit patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub name: String,
    /// Bit width, at most 64.
    pub bits: u32,
    pub signedness: Signedness,
}

/// Comparison operator of a predicate atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// The operator of the complementary comparison (`!(a < b)` is `a >= b`).
    pub fn negated(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// The operator with operands swapped (`a < b` is `b > a`).
    pub fn swapped(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        };
        write!(f, "{s}")
    }
}

/// A linear integer expression `constant + sum of coeff * var`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinearExpr {
    pub constant: i64,
    pub terms: Vec<(i64, VarId)>,
}

impl LinearExpr {
    pub fn constant(c: i64) -> Self {
        LinearExpr {
            constant: c,
            terms: Vec::new(),
        }
    }

    pub fn var(v: VarId) -> Self {
        LinearExpr {
            constant: 0,
            terms: vec![(1, v)],
        }
    }

    pub fn term(coeff: i64, v: VarId) -> Self {
        LinearExpr {
            constant: 0,
            terms: vec![(coeff, v)],
        }
    }

    pub fn add(mut self, other: LinearExpr) -> Self {
        self.constant = self.constant.wrapping_add(other.constant);
        self.terms.extend(other.terms);
        self
    }

    pub fn sub(self, other: LinearExpr) -> Self {
        self.add(other.scale(-1))
    }

    pub fn scale(mut self, c: i64) -> Self {
        self.constant = self.constant.wrapping_mul(c);
        for (coeff, _) in &mut self.terms {
            *coeff = coeff.wrapping_mul(c);
        }
        self
    }

    pub fn vars(&self, out: &mut IndexSet<VarId>) {
        for (_, v) in &self.terms {
            out.insert(*v);
        }
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (coeff, v) in &self.terms {
            if first {
                if *coeff == 1 {
                    write!(f, "v{v}")?;
                } else if *coeff == -1 {
                    write!(f, "-v{v}")?;
                } else {
                    write!(f, "{coeff}*v{v}")?;
                }
                first = false;
            } else if *coeff >= 0 {
                if *coeff == 1 {
                    write!(f, " + v{v}")?;
                } else {
                    write!(f, " + {coeff}*v{v}")?;
                }
            } else if *coeff == -1 {
                write!(f, " - v{v}")?;
            } else {
                write!(f, " - {}*v{v}", -coeff)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)?;
        } else if self.constant > 0 {
            write!(f, " + {}", self.constant)?;
        } else if self.constant < 0 {
            write!(f, " - {}", -self.constant)?;
        }
        Ok(())
    }
}

/// A boolean predicate over declared variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pred {
    Cmp {
        lhs: LinearExpr,
        op: CmpOp,
        rhs: LinearExpr,
    },
    And(Vec<Pred>),
    Or(Vec<Pred>),
    Not(Box<Pred>),
}

impl Pred {
    pub fn cmp(lhs: LinearExpr, op: CmpOp, rhs: LinearExpr) -> Self {
        Pred::Cmp { lhs, op, rhs }
    }

    /// C-style truthiness of a bare variable: `v != 0`.
    pub fn truthy(v: VarId) -> Self {
        Pred::Cmp {
            lhs: LinearExpr::var(v),
            op: CmpOp::Ne,
            rhs: LinearExpr::constant(0),
        }
    }

    /// Collect every variable referenced anywhere in the predicate.
    pub fn vars(&self, out: &mut IndexSet<VarId>) {
        match self {
            Pred::Cmp { lhs, rhs, .. } => {
                lhs.vars(out);
                rhs.vars(out);
            }
            Pred::And(ps) | Pred::Or(ps) => {
                for p in ps {
                    p.vars(out);
                }
            }
            Pred::Not(p) => p.vars(out),
        }
    }
}

impl fmt::Display for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pred::Cmp { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Pred::And(ps) => {
                write!(f, "(")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Pred::Or(ps) => {
                write!(f, "(")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, " || ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Pred::Not(p) => write!(f, "!{p}"),
        }
    }
}

use std::fmt;

use num::rational::BigRational;
use num::traits::{One, ToPrimitive, Zero};
use serde::{Serialize, Serializer};

use pathquant_ir::BlockId;

use crate::analyzer::AnalysisOptions;
use crate::explorer::Exploration;

/// Classification of a fully explored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathClass {
    /// Reached a normal terminal.
    Success,
    /// Reached an error label.
    Failure,
    /// Cut off at the depth bound while still looping.
    Grey,
}

/// One terminal path with its exact conditioned probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalPath {
    pub class: PathClass,
    #[serde(serialize_with = "serialize_rational")]
    pub probability: BigRational,
    /// Branch decisions in traversal order.
    pub decisions: Vec<(BlockId, bool)>,
    /// Edges traversed.
    pub depth: usize,
}

/// Aggregated outcome of an analysis. All probabilities are exact; the
/// `_f64` accessors are lossy projections for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(serialize_with = "serialize_rational")]
    pub success_probability: BigRational,
    #[serde(serialize_with = "serialize_rational")]
    pub failure_probability: BigRational,
    #[serde(serialize_with = "serialize_rational")]
    pub grey_probability: BigRational,
    pub success_paths: u64,
    pub failure_paths: u64,
    pub grey_paths: u64,
    /// Minimum single-path probability over all terminal paths. Diagnostic
    /// only; `None` when no path terminated.
    #[serde(serialize_with = "serialize_opt_rational")]
    pub smallest_path_probability: Option<BigRational>,
    /// Paths discarded because an assumption emptied their domain.
    pub infeasible_paths: u64,
    /// Exploration stopped at the path cap; grey holds the remainder.
    pub truncated: bool,
    pub paths: Vec<TerminalPath>,
}

impl Report {
    /// `success + failure + grey`, exact.
    pub fn total_probability(&self) -> BigRational {
        &self.success_probability + &self.failure_probability + &self.grey_probability
    }

    pub fn success_probability_f64(&self) -> f64 {
        rational_to_f64(&self.success_probability)
    }

    pub fn failure_probability_f64(&self) -> f64 {
        rational_to_f64(&self.failure_probability)
    }

    pub fn grey_probability_f64(&self) -> f64 {
        rational_to_f64(&self.grey_probability)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reachability report:")?;
        writeln!(
            f,
            "  Success: {} (~{:.6}) across {} path(s)",
            self.success_probability,
            self.success_probability_f64(),
            self.success_paths
        )?;
        writeln!(
            f,
            "  Failure: {} (~{:.6}) across {} path(s)",
            self.failure_probability,
            self.failure_probability_f64(),
            self.failure_paths
        )?;
        writeln!(
            f,
            "  Grey:    {} (~{:.6}) across {} path(s)",
            self.grey_probability,
            self.grey_probability_f64(),
            self.grey_paths
        )?;
        match &self.smallest_path_probability {
            Some(p) => writeln!(f, "  Smallest path probability: {p}")?,
            None => writeln!(f, "  Smallest path probability: n/a")?,
        }
        write!(f, "  Infeasible paths: {}", self.infeasible_paths)?;
        if self.truncated {
            write!(f, "\n  Exploration truncated at the path cap")?;
        }
        Ok(())
    }
}

/// Fold terminal paths into class totals.
pub(crate) fn aggregate(expl: Exploration, opts: &AnalysisOptions) -> Report {
    let mut success = BigRational::zero();
    let mut failure = BigRational::zero();
    let mut grey = BigRational::zero();
    let mut success_paths = 0u64;
    let mut failure_paths = 0u64;
    let mut grey_paths = 0u64;
    let mut smallest: Option<BigRational> = None;

    for path in &expl.paths {
        match path.class {
            PathClass::Success => {
                success += &path.probability;
                success_paths += 1;
            }
            PathClass::Failure => {
                failure += &path.probability;
                failure_paths += 1;
            }
            PathClass::Grey => {
                grey += &path.probability;
                grey_paths += 1;
            }
        }
        let replace = match &smallest {
            None => true,
            Some(s) => path.probability < *s,
        };
        if replace {
            smallest = Some(path.probability.clone());
        }
    }

    // With per-path grey quantification off, or after truncation, grey is
    // whatever mass success and failure leave unaccounted.
    if !expl.paths.is_empty() && (expl.truncated || !opts.quantify_grey) {
        grey = BigRational::one() - &success - &failure;
    }

    Report {
        success_probability: success,
        failure_probability: failure,
        grey_probability: grey,
        success_paths,
        failure_paths,
        grey_paths,
        smallest_path_probability: smallest,
        infeasible_paths: expl.infeasible_paths,
        truncated: expl.truncated,
        paths: expl.paths,
    }
}

fn rational_to_f64(r: &BigRational) -> f64 {
    let numer = r.numer().to_f64().unwrap_or(f64::NAN);
    let denom = r.denom().to_f64().unwrap_or(f64::NAN);
    numer / denom
}

fn serialize_rational<S: Serializer>(r: &BigRational, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(r)
}

fn serialize_opt_rational<S: Serializer>(
    r: &Option<BigRational>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match r {
        Some(r) => s.serialize_some(&format!("{r}")),
        None => s.serialize_none(),
    }
}

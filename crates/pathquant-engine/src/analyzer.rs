use thiserror::Error;
use tracing::info;

use pathquant_domain::UnsupportedConstruct;
use pathquant_ir::{validate, BlockId, Cfg, GraphError};

use crate::explorer;
use crate::report::{aggregate, Report};

/// Why an analysis produced no report.
///
/// All of these abort the run outright; there are no partial reports.
/// Infeasible paths are not errors, they are dropped during exploration and
/// show up only as a diagnostic count.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed control-flow graph: {0}")]
    Graph(#[from] GraphError),
    #[error("block {block}: {source}")]
    Unsupported {
        block: BlockId,
        #[source]
        source: UnsupportedConstruct,
    },
    #[error("invalid analysis options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Edge-count bound; a path still looping past this depth turns Grey.
    /// Must be at least 1.
    pub depth_limit: usize,
    /// When false, grey mass is reported as the exact remainder
    /// `1 - success - failure` instead of being summed per path.
    pub quantify_grey: bool,
    /// Optional cap on recorded terminal paths. Exceeding it stops
    /// exploration and folds the unexplored remainder into Grey.
    pub max_paths: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            depth_limit: 1000,
            quantify_grey: true,
            max_paths: None,
        }
    }
}

/// Validate `cfg`, explore every feasible path, and aggregate the exact
/// class probabilities.
pub fn analyze(cfg: &Cfg, opts: &AnalysisOptions) -> Result<Report, AnalysisError> {
    if opts.depth_limit == 0 {
        return Err(AnalysisError::InvalidOptions(
            "depth limit must be at least 1".into(),
        ));
    }
    validate(cfg)?;
    info!(
        blocks = cfg.blocks.len(),
        vars = cfg.vars.len(),
        depth_limit = opts.depth_limit,
        "exploring control-flow graph"
    );
    let exploration = explorer::explore(cfg, opts)?;
    info!(
        paths = exploration.paths.len(),
        infeasible = exploration.infeasible_paths,
        truncated = exploration.truncated,
        "path exploration complete"
    );
    Ok(aggregate(exploration, opts))
}

//! Dimension classification.
//!
//! Assigns each loop-nest dimension of each statement one of three tags:
//! bound to the monitored array, bound to an alternative-selecting
//! parameter, or free; and records which dimensions' bounds depend on
//! earlier dimensions (triangular nests). Tiling requires the monitor
//! dimensions to form the same contiguous run in every statement that
//! references the monitored array, so violations are semantic errors.

use crate::options::{AlternativeKind, KernelOptions};
use crate::polyhedral::IntegerSet;
use crate::scop::Scop;
use crate::utils::errors::ConfigError;
use log::debug;

/// Classification of one loop-nest dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimTag {
    /// Indexes the monitored array; subject to tiling
    BoundToMonitor,
    /// Its bounds involve a parameter some alternative overrides
    BoundToAlternative,
    /// Neither
    Free,
}

/// Per-statement dimension facts.
#[derive(Debug, Clone)]
pub struct StatementDims {
    /// The statement's name
    pub statement: String,
    /// One tag per dimension, outermost first
    pub tags: Vec<DimTag>,
    /// Dimension index of each monitor identifier, in monitor order.
    /// Empty when the statement does not reference the monitored array.
    pub monitor_dims: Vec<usize>,
    /// Pairs `(a, b)` with `a > b`: dimension `a`'s bounds reference `b`
    pub bound_deps: Vec<(usize, usize)>,
}

impl StatementDims {
    /// Whether the statement references the monitored array.
    pub fn is_monitored(&self) -> bool {
        !self.monitor_dims.is_empty()
    }
}

/// The classifier's result across all statements.
#[derive(Debug, Clone)]
pub struct DimensionAnalysis {
    /// One entry per scop statement, in statement order
    pub per_statement: Vec<StatementDims>,
}

impl DimensionAnalysis {
    /// Facts for a statement by name.
    pub fn for_statement(&self, name: &str) -> Option<&StatementDims> {
        self.per_statement.iter().find(|s| s.statement == name)
    }
}

/// Classify every dimension of every statement.
pub fn classify_dimensions(
    scop: &Scop,
    options: &KernelOptions,
) -> Result<DimensionAnalysis, ConfigError> {
    let monitor_ids = &options.monitor.dims;

    // Every monitor identifier must be some statement's iterator.
    for id in monitor_ids {
        let found = scop.statements.iter()
            .any(|s| s.domain.space.dim_index(id).is_some());
        if !found {
            return Err(ConfigError::MonitorIdentifierNotFound {
                identifier: id.clone(),
            });
        }
    }

    // Parameters overridden by some parameter-substitution alternative.
    let overridden: Vec<usize> = options.alternatives.iter()
        .filter_map(|a| match &a.kind {
            AlternativeKind::Parameter { name, .. } => scop.param_index(name),
            AlternativeKind::Function { .. } => None,
        })
        .collect();

    let mut per_statement = Vec::with_capacity(scop.statements.len());
    for stmt in &scop.statements {
        let n_dim = stmt.depth();
        let positions: Vec<Option<usize>> = monitor_ids.iter()
            .map(|id| stmt.domain.space.dim_index(id))
            .collect();
        let present: Vec<usize> = positions.iter().filter_map(|p| *p).collect();

        let monitor_dims = if present.is_empty() {
            Vec::new()
        } else {
            // All identifiers present, as a contiguous ascending run in
            // monitor order.
            let complete = positions.iter().all(|p| p.is_some());
            let contiguous = present.windows(2).all(|w| w[1] == w[0] + 1);
            if !complete || !contiguous {
                return Err(ConfigError::NonContiguousMonitorDims {
                    statement: stmt.name.clone(),
                    positions: present,
                });
            }
            present
        };

        let mut tags = Vec::with_capacity(n_dim);
        for d in 0..n_dim {
            let tag = if monitor_dims.contains(&d) {
                DimTag::BoundToMonitor
            } else if dim_uses_overridden_param(&stmt.domain, d, &overridden) {
                DimTag::BoundToAlternative
            } else {
                DimTag::Free
            };
            tags.push(tag);
        }

        let mut bound_deps = Vec::new();
        for a in 1..n_dim {
            for b in 0..a {
                let coupled = stmt.domain.constraints.constraints.iter()
                    .any(|c| c.expr.involves_dim(a) && c.expr.involves_dim(b));
                if coupled {
                    bound_deps.push((a, b));
                }
            }
        }
        debug!(
            "statement {}: tags {:?}, monitor dims {:?}, deps {:?}",
            stmt.name, tags, monitor_dims, bound_deps
        );

        per_statement.push(StatementDims {
            statement: stmt.name.clone(),
            tags,
            monitor_dims,
            bound_deps,
        });
    }

    Ok(DimensionAnalysis { per_statement })
}

fn dim_uses_overridden_param(domain: &IntegerSet, d: usize, overridden: &[usize]) -> bool {
    domain.constraints.constraints.iter().any(|c| {
        c.expr.involves_dim(d) && overridden.iter().any(|&p| c.expr.involves_param(p))
    })
}

/// The monitor-dimension sub-domain: the first monitored statement's
/// domain with every non-monitor dimension projected out, re-indexed so
/// the monitor dimensions start at zero. Parameters are preserved.
///
/// The monitoring scan and the static `min_max` table both enumerate this
/// set. At least one statement must be monitored; the classifier
/// guarantees that before this runs.
pub fn monitor_scan_domain(scop: &Scop, analysis: &DimensionAnalysis) -> IntegerSet {
    let (stmt, dims) = scop.statements.iter()
        .zip(&analysis.per_statement)
        .find(|(_, d)| d.is_monitored())
        .expect("no statement references the monitored array");

    let start = dims.monitor_dims[0];
    let end = start + dims.monitor_dims.len();
    let mut set = stmt.domain.clone();
    // project inner-to-outer so indices stay valid
    for d in (end..stmt.depth()).rev() {
        set = set.project_out_dim(d);
    }
    for d in (0..start).rev() {
        set = set.project_out_dim(d);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{
        Alternative, CParam, InitSignature, MonitorSpec, Reduction, Selector, Strategy,
    };

    fn scop() -> Scop {
        Scop::parse("\
context: [N, T] -> { : N >= 1 and T >= 1 }
statement S0:
  domain: [N, T] -> { S0[t, i, j] : 0 <= t < T and 0 <= i < N and i <= j < N }
  body: A[i][j] = stencil(A, i, j);
").unwrap()
    }

    fn options() -> KernelOptions {
        KernelOptions {
            prefix: "k".to_string(),
            grid_size: 2,
            init: InitSignature {
                return_type: "void".to_string(),
                name: "init".to_string(),
                params: vec![CParam { ctype: "double*".to_string(), name: "A".to_string() }],
            },
            monitor: MonitorSpec {
                array: "A".to_string(),
                dims: vec!["i".to_string(), "j".to_string()],
                extents: vec!["N".to_string(), "N".to_string()],
                reduction: Reduction::Max,
                filter: None,
            },
            alternatives: vec![Alternative {
                name: "coarse".to_string(),
                kind: AlternativeKind::Parameter { name: "T".to_string(), value: 1 },
            }],
            strategies: vec![Strategy {
                selector: Selector::Range(0, 255),
                alternative: "coarse".to_string(),
            }],
        }
    }

    #[test]
    fn test_tags() {
        let analysis = classify_dimensions(&scop(), &options()).unwrap();
        let s0 = &analysis.per_statement[0];
        assert_eq!(s0.monitor_dims, vec![1, 2]);
        assert_eq!(s0.tags[0], DimTag::BoundToAlternative); // t bounded by T
        assert_eq!(s0.tags[1], DimTag::BoundToMonitor);
        assert_eq!(s0.tags[2], DimTag::BoundToMonitor);
    }

    #[test]
    fn test_triangular_dependency() {
        let analysis = classify_dimensions(&scop(), &options()).unwrap();
        // j's lower bound references i: (2, 1) must be recorded
        assert!(analysis.per_statement[0].bound_deps.contains(&(2, 1)));
    }

    #[test]
    fn test_missing_identifier() {
        let mut opts = options();
        opts.monitor.dims = vec!["q".to_string()];
        assert!(matches!(
            classify_dimensions(&scop(), &opts),
            Err(ConfigError::MonitorIdentifierNotFound { .. })
        ));
    }

    #[test]
    fn test_non_contiguous_rejected() {
        let scop = Scop::parse("\
context: { [] }
statement S0:
  domain: { S0[i, t, j] : 0 <= i < 8 and 0 <= t < 4 and 0 <= j < 8 }
  body: A[i][j] = 0;
").unwrap();
        let mut opts = options();
        opts.alternatives.clear();
        opts.strategies.clear();
        assert!(matches!(
            classify_dimensions(&scop, &opts),
            Err(ConfigError::NonContiguousMonitorDims { .. })
        ));
    }

    #[test]
    fn test_scan_domain() {
        let analysis = classify_dimensions(&scop(), &options()).unwrap();
        let scan = monitor_scan_domain(&scop(), &analysis);
        assert_eq!(scan.dim(), 2);
        assert_eq!(scan.n_param(), 2);
        // with N = 4: triangular half of the 4x4 square (T's column shifts
        // to index 0 once N is eliminated)
        let inst = scan.fix_param(0, 4).fix_param(0, 1);
        assert_eq!(inst.cardinality(), 10);
    }
}

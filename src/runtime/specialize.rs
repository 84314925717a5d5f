//! Alternative domain specialization.
//!
//! Maps each alternative's monitor-space tile union back onto every
//! statement's full iteration space: tile constraints are re-expressed over
//! the statement's monitor dimension columns and intersected with a copy of
//! the unrestricted domain. Parameter-substitution alternatives additionally
//! eliminate their parameter by equality-plus-projection, so the
//! substitution changes the polyhedral model rather than generated text.
//!
//! The unrestricted statement domains are never mutated: every derivation
//! starts from a fresh copy, which makes re-deriving from the same
//! classification buffer yield identical domains.

use crate::instrument::DimensionAnalysis;
use crate::options::{AlternativeKind, KernelOptions};
use crate::polyhedral::{AffineExpr, Constraint, IntegerSet, SetUnion};
use crate::scop::Scop;

/// Per-cycle specialization result: `restricted[alt][stmt]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializedDomains {
    /// One union per (alternative, statement) pair
    pub restricted: Vec<Vec<SetUnion>>,
}

impl SpecializedDomains {
    /// The union for one (alternative, statement) pair.
    pub fn for_pair(&self, alt: usize, stmt: usize) -> &SetUnion {
        &self.restricted[alt][stmt]
    }
}

/// Re-express a monitor-space set over a statement's dimension list.
///
/// The tile's dimension `m` becomes statement dimension `start + m`; the
/// result is the statement domain (copied) with the translated constraints
/// appended.
pub fn embed_monitor_set(
    tile: &IntegerSet,
    domain: &IntegerSet,
    start: usize,
) -> IntegerSet {
    assert_eq!(tile.n_param(), 0, "tile sets are parameter-free");
    assert!(start + tile.dim() <= domain.dim(), "monitor run exceeds statement depth");
    let n_dim = domain.dim();
    let n_param = domain.n_param();
    let mut out = domain.clone();
    for c in &tile.constraints.constraints {
        let mut expr = AffineExpr::zero(n_dim, n_param);
        expr.constant = c.expr.constant;
        for (m, &coeff) in c.expr.coeffs.iter().enumerate() {
            expr.coeffs[start + m] = coeff;
        }
        out.add_constraint(Constraint { expr, kind: c.kind });
    }
    out
}

/// Derive the restricted domains for one classification cycle.
///
/// `per_alt` is the classifier's output: one monitor-space tile union per
/// alternative, in alternative order.
pub fn specialize(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
    per_alt: &[SetUnion],
) -> SpecializedDomains {
    assert_eq!(per_alt.len(), options.alternatives.len(), "union count mismatch");

    let mut restricted = Vec::with_capacity(options.alternatives.len());
    for (alt, tiles) in options.alternatives.iter().zip(per_alt) {
        let mut per_stmt = Vec::with_capacity(scop.statements.len());
        for (stmt, dims) in scop.statements.iter().zip(&analysis.per_statement) {
            let mut union = if dims.is_monitored() {
                let start = dims.monitor_dims[0];
                let mut u = SetUnion::empty(stmt.domain.dim(), stmt.domain.n_param());
                for part in tiles.parts() {
                    u.add(embed_monitor_set(part, &stmt.domain, start));
                }
                u
            } else {
                // Unmonitored statements keep their unrestricted domain.
                SetUnion::from_set(stmt.domain.clone())
            };
            if let AlternativeKind::Parameter { name, value } = &alt.kind {
                let pos = scop.param_index(name)
                    .unwrap_or_else(|| panic!("unknown parameter `{}`", name));
                union = union.fix_param(pos, *value);
            }
            per_stmt.push(union);
        }
        restricted.push(per_stmt);
    }
    SpecializedDomains { restricted }
}

//! Linear constraints for polyhedral representation.
//!
//! A constraint is a linear inequality or equality:
//! - Inequality: expr >= 0
//! - Equality: expr = 0

use crate::polyhedral::expr::{AffineExpr, floor_div};
use serde::{Serialize, Deserialize};
use std::fmt;

/// A linear constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// The affine expression (constraint is: expr >= 0 or expr = 0)
    pub expr: AffineExpr,
    /// Kind of constraint
    pub kind: ConstraintKind,
}

/// Kind of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Greater than or equal: expr >= 0
    Inequality,
    /// Equal: expr = 0
    Equality,
}

impl Constraint {
    /// Create an inequality constraint: expr >= 0
    pub fn ge_zero(expr: AffineExpr) -> Self {
        Self { expr, kind: ConstraintKind::Inequality }
    }

    /// Create an equality constraint: expr = 0
    pub fn eq_zero(expr: AffineExpr) -> Self {
        Self { expr, kind: ConstraintKind::Equality }
    }

    /// Create a constraint: lhs >= rhs
    pub fn ge(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(lhs - rhs)
    }

    /// Create a constraint: lhs <= rhs
    pub fn le(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(rhs - lhs)
    }

    /// Create a constraint: lhs = rhs
    pub fn eq(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::eq_zero(lhs - rhs)
    }

    /// Create a lower bound constraint: var >= lower
    pub fn lower_bound(dim: usize, lower: i64, n_dim: usize, n_param: usize) -> Self {
        let mut expr = AffineExpr::var(dim, n_dim, n_param);
        expr.constant = -lower;
        Self::ge_zero(expr)
    }

    /// Create an upper bound constraint: var <= upper
    pub fn upper_bound(dim: usize, upper: i64, n_dim: usize, n_param: usize) -> Self {
        let mut expr = -AffineExpr::var(dim, n_dim, n_param);
        expr.constant = upper;
        Self::ge_zero(expr)
    }

    /// Check if this is an equality constraint.
    pub fn is_equality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Equality)
    }

    /// Check if this constraint is satisfied by the given point.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        let value = self.expr.evaluate(dim_values, param_values);
        match self.kind {
            ConstraintKind::Inequality => value >= 0,
            ConstraintKind::Equality => value == 0,
        }
    }

    /// Divide out the coefficient gcd.
    ///
    /// For inequalities the constant is floored, which tightens the
    /// constraint without excluding any integer point. Constant-only
    /// constraints are returned unchanged.
    pub fn normalized(&self) -> Self {
        let g = self.expr.coeff_gcd();
        if g <= 1 {
            return self.clone();
        }
        match self.kind {
            ConstraintKind::Inequality => {
                let mut expr = self.expr.clone();
                expr.constant = floor_div(expr.constant, g);
                expr.coeffs.iter_mut().for_each(|c| *c /= g);
                expr.param_coeffs.iter_mut().for_each(|c| *c /= g);
                Self::ge_zero(expr)
            }
            ConstraintKind::Equality => {
                // Only exact when the constant divides too; otherwise the
                // equality has no integer solutions and must stay as-is so
                // emptiness checks still see it.
                if self.expr.constant % g != 0 {
                    return self.clone();
                }
                let mut expr = self.expr.clone();
                expr.constant /= g;
                expr.coeffs.iter_mut().for_each(|c| *c /= g);
                expr.param_coeffs.iter_mut().for_each(|c| *c /= g);
                Self::eq_zero(expr)
            }
        }
    }

    /// Whether this constraint is trivially true (e.g. `3 >= 0`).
    pub fn is_trivial(&self) -> bool {
        if !self.expr.is_constant() {
            return false;
        }
        match self.kind {
            ConstraintKind::Inequality => self.expr.constant >= 0,
            ConstraintKind::Equality => self.expr.constant == 0,
        }
    }

    /// Convert to string with given names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let expr_str = self.expr.to_string_with_names(dim_names, param_names);
        match self.kind {
            ConstraintKind::Inequality => format!("{} >= 0", expr_str),
            ConstraintKind::Equality => format!("{} = 0", expr_str),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names: Vec<String> = (0..self.expr.n_dim()).map(|i| format!("d{}", i)).collect();
        let param_names: Vec<String> = (0..self.expr.n_param()).map(|i| format!("p{}", i)).collect();
        write!(f, "{}", self.to_string_with_names(&dim_names, &param_names))
    }
}

/// A system of constraints over a common space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    /// All constraints in the system
    pub constraints: Vec<Constraint>,
    /// Number of dimensions
    pub n_dim: usize,
    /// Number of parameters
    pub n_param: usize,
}

impl ConstraintSystem {
    /// Create an empty constraint system.
    pub fn new(n_dim: usize, n_param: usize) -> Self {
        Self {
            constraints: Vec::new(),
            n_dim,
            n_param,
        }
    }

    /// Add a constraint.
    pub fn add(&mut self, constraint: Constraint) {
        assert_eq!(constraint.expr.n_dim(), self.n_dim, "constraint dimension mismatch");
        assert_eq!(constraint.expr.n_param(), self.n_param, "constraint parameter mismatch");
        self.constraints.push(constraint);
    }

    /// Check if a point satisfies all constraints.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(dim_values, param_values))
    }

    /// Check if the system has no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Get the number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        // 0 <= i <= 10
        let lo = Constraint::lower_bound(0, 0, 2, 0);
        let hi = Constraint::upper_bound(0, 10, 2, 0);
        assert!(lo.is_satisfied(&[0, 0], &[]));
        assert!(!lo.is_satisfied(&[-1, 0], &[]));
        assert!(hi.is_satisfied(&[10, 0], &[]));
        assert!(!hi.is_satisfied(&[11, 0], &[]));
    }

    #[test]
    fn test_normalized_tightens() {
        // 2i - 3 >= 0 normalizes to i - 2 >= 0 (i >= 2, tight on integers)
        let mut expr = AffineExpr::var(0, 1, 0).scale(2);
        expr.constant = -3;
        let c = Constraint::ge_zero(expr).normalized();
        assert_eq!(c.expr.coeffs, vec![1]);
        assert_eq!(c.expr.constant, -2);
    }

    #[test]
    fn test_unsolvable_equality_kept() {
        // 2i - 1 = 0 has no integer solution; normalization must not
        // produce a solvable constraint
        let mut expr = AffineExpr::var(0, 1, 0).scale(2);
        expr.constant = -1;
        let c = Constraint::eq_zero(expr).normalized();
        assert_eq!(c.expr.coeffs, vec![2]);
    }

    #[test]
    fn test_system() {
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::lower_bound(0, 0, 2, 0));
        sys.add(Constraint::upper_bound(0, 9, 2, 0));
        sys.add(Constraint::lower_bound(1, 0, 2, 0));
        sys.add(Constraint::upper_bound(1, 9, 2, 0));
        assert!(sys.is_satisfied(&[5, 5], &[]));
        assert!(!sys.is_satisfied(&[10, 0], &[]));
    }
}

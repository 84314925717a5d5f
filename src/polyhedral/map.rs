//! Affine maps for schedules.
//!
//! A schedule maps iteration vectors to execution-order vectors. Only the
//! map machinery the generation pipeline needs is kept: construction,
//! application, composition, and printing.

use crate::polyhedral::space::Space;
use crate::polyhedral::expr::AffineExpr;
use serde::{Serialize, Deserialize};
use std::fmt;

/// An affine map from one space to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffineMap {
    /// The map space (inputs, outputs, parameters)
    pub space: Space,
    /// Output expressions (one per output dimension), over the inputs
    pub outputs: Vec<AffineExpr>,
}

impl AffineMap {
    /// Create an identity map of given dimension.
    pub fn identity(n_dim: usize) -> Self {
        Self::identity_with_params(n_dim, 0)
    }

    /// Create an identity map with parameters.
    pub fn identity_with_params(n_dim: usize, n_param: usize) -> Self {
        let space = Space::map_with_params(n_dim, n_dim, n_param);
        let outputs = (0..n_dim)
            .map(|i| AffineExpr::var(i, n_dim, n_param))
            .collect();
        Self { space, outputs }
    }

    /// Create from output expressions.
    pub fn from_outputs(n_in: usize, n_param: usize, outputs: Vec<AffineExpr>) -> Self {
        for out in &outputs {
            assert_eq!(out.n_dim(), n_in, "output expression arity mismatch");
            assert_eq!(out.n_param(), n_param, "output parameter arity mismatch");
        }
        let n_out = outputs.len();
        Self {
            space: Space::map_with_params(n_in, n_out, n_param),
            outputs,
        }
    }

    /// Get input dimensions.
    pub fn n_in(&self) -> usize { self.space.n_in }

    /// Get output dimensions.
    pub fn n_out(&self) -> usize { self.space.n_dim }

    /// Get number of parameters.
    pub fn n_param(&self) -> usize { self.space.n_param }

    /// Apply the map to a point.
    pub fn apply(&self, input: &[i64], params: &[i64]) -> Vec<i64> {
        self.outputs.iter()
            .map(|expr| expr.evaluate(input, params))
            .collect()
    }

    /// Compose two maps: self after other.
    pub fn compose(&self, other: &AffineMap) -> AffineMap {
        assert_eq!(self.n_in(), other.n_out(), "composition arity mismatch");
        assert_eq!(self.n_param(), other.n_param(), "composition parameter mismatch");
        let n_in = other.n_in();
        let n_param = self.n_param();

        let outputs = self.outputs.iter().map(|out_expr| {
            let mut result = AffineExpr::zero(n_in, n_param);
            result.constant = out_expr.constant;
            result.param_coeffs = out_expr.param_coeffs.clone();
            for (i, &coeff) in out_expr.coeffs.iter().enumerate() {
                if coeff != 0 {
                    result = result + other.outputs[i].scale(coeff);
                }
            }
            result
        }).collect();

        AffineMap::from_outputs(n_in, n_param, outputs)
    }

    /// Fix parameter `pos` to a literal value and drop its column.
    pub fn fix_param(&self, pos: usize, value: i64) -> AffineMap {
        assert!(pos < self.n_param(), "parameter {} out of range", pos);
        let outputs = self.outputs.iter()
            .map(|e| e.substitute_param(pos, value))
            .collect();
        AffineMap {
            space: self.space.without_param(pos),
            outputs,
        }
    }

    /// Check if this is an identity map.
    pub fn is_identity(&self) -> bool {
        if self.n_in() != self.n_out() {
            return false;
        }
        self.outputs.iter().enumerate().all(|(i, expr)| {
            expr.constant == 0
                && expr.param_coeffs.iter().all(|&c| c == 0)
                && expr.coeffs.iter().enumerate().all(|(j, &c)| {
                    c == if i == j { 1 } else { 0 }
                })
        })
    }

    /// Builder-style input-dimension naming.
    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_dim_names(names);
        self
    }

    /// Builder-style parameter naming.
    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_param_names(names);
        self
    }

    /// Input dimension names (with defaults). The map space stores input
    /// names in `dim_names`.
    pub fn in_names(&self) -> Vec<String> {
        (0..self.n_in())
            .map(|i| {
                self.space.dim_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("i{}", i))
            })
            .collect()
    }
}

impl fmt::Display for AffineMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_names = self.in_names();
        let param_names = self.space.all_param_names();
        if !param_names.is_empty() {
            write!(f, "[{}] -> ", param_names.join(", "))?;
        }
        write!(f, "{{ ")?;
        if let Some(name) = &self.space.tuple_name {
            write!(f, "{}", name)?;
        }
        write!(f, "[{}] -> [", in_names.join(", "))?;
        for (i, expr) in self.outputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", expr.to_string_with_names(&in_names, &param_names))?;
        }
        write!(f, "] }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let map = AffineMap::identity(3);
        assert!(map.is_identity());
        assert_eq!(map.apply(&[1, 2, 3], &[]), vec![1, 2, 3]);
    }

    #[test]
    fn test_compose() {
        // shift then scale: i -> i + 1, then i -> 2i gives i -> 2i + 2
        let mut shift = AffineExpr::var(0, 1, 0);
        shift.constant = 1;
        let m1 = AffineMap::from_outputs(1, 0, vec![shift]);
        let scale = AffineExpr::var(0, 1, 0).scale(2);
        let m2 = AffineMap::from_outputs(1, 0, vec![scale]);
        let composed = m2.compose(&m1);
        assert_eq!(composed.apply(&[3], &[]), vec![8]);
    }

    #[test]
    fn test_display() {
        let map = AffineMap::identity(2)
            .with_dim_names(vec!["i".to_string(), "j".to_string()]);
        assert_eq!(format!("{}", map), "{ [i, j] -> [i, j] }");
    }
}

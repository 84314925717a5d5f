//! Affine expressions for polyhedral representation.
//!
//! An affine expression is a linear combination of variables plus a constant:
//! `aff(x) = c0 + c1*x1 + c2*x2 + ... + cn*xn`

use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::{Add, Sub, Neg};

/// Integer floor division (rounds toward negative infinity).
pub fn floor_div(a: i64, b: i64) -> i64 {
    assert!(b != 0, "division by zero");
    let d = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

/// Integer ceiling division (rounds toward positive infinity).
pub fn ceil_div(a: i64, b: i64) -> i64 {
    -floor_div(-a, b)
}

/// An affine expression: constant + sum(coeff[i] * dim[i]) + sum(pc[j] * param[j])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffineExpr {
    /// Constant term
    pub constant: i64,
    /// Coefficients for each dimension (index = dimension index)
    pub coeffs: Vec<i64>,
    /// Coefficients for parameters (index = parameter index)
    pub param_coeffs: Vec<i64>,
}

impl AffineExpr {
    /// Create a zero expression.
    pub fn zero(n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: 0,
            coeffs: vec![0; n_dim],
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create a constant expression.
    pub fn constant(value: i64, n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: value,
            coeffs: vec![0; n_dim],
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create an expression for a single dimension variable.
    pub fn var(dim: usize, n_dim: usize, n_param: usize) -> Self {
        assert!(dim < n_dim, "dimension {} out of range", dim);
        let mut coeffs = vec![0; n_dim];
        coeffs[dim] = 1;
        Self {
            constant: 0,
            coeffs,
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create an expression for a parameter.
    pub fn param(idx: usize, n_dim: usize, n_param: usize) -> Self {
        assert!(idx < n_param, "parameter {} out of range", idx);
        let mut param_coeffs = vec![0; n_param];
        param_coeffs[idx] = 1;
        Self {
            constant: 0,
            coeffs: vec![0; n_dim],
            param_coeffs,
        }
    }

    /// Check if this is a constant expression.
    pub fn is_constant(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0) &&
        self.param_coeffs.iter().all(|&c| c == 0)
    }

    /// Get the number of dimensions.
    pub fn n_dim(&self) -> usize {
        self.coeffs.len()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.param_coeffs.len()
    }

    /// Get coefficient for a dimension.
    pub fn coeff(&self, dim: usize) -> i64 {
        self.coeffs.get(dim).copied().unwrap_or(0)
    }

    /// Get coefficient for a parameter.
    pub fn param_coeff(&self, idx: usize) -> i64 {
        self.param_coeffs.get(idx).copied().unwrap_or(0)
    }

    /// Whether the expression mentions the given dimension.
    pub fn involves_dim(&self, dim: usize) -> bool {
        self.coeff(dim) != 0
    }

    /// Whether the expression mentions the given parameter.
    pub fn involves_param(&self, idx: usize) -> bool {
        self.param_coeff(idx) != 0
    }

    /// Evaluate the expression given concrete values.
    pub fn evaluate(&self, dim_values: &[i64], param_values: &[i64]) -> i64 {
        assert!(dim_values.len() >= self.coeffs.len(), "missing dimension values");
        assert!(param_values.len() >= self.param_coeffs.len(), "missing parameter values");
        let mut result = self.constant;
        for (i, &c) in self.coeffs.iter().enumerate() {
            result += c * dim_values[i];
        }
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            result += c * param_values[i];
        }
        result
    }

    /// Scale the expression by a constant.
    pub fn scale(&self, factor: i64) -> Self {
        Self {
            constant: self.constant * factor,
            coeffs: self.coeffs.iter().map(|&c| c * factor).collect(),
            param_coeffs: self.param_coeffs.iter().map(|&c| c * factor).collect(),
        }
    }

    /// GCD of the variable and parameter coefficients (not the constant).
    ///
    /// Zero when the expression involves no variables at all.
    pub fn coeff_gcd(&self) -> i64 {
        use num_integer::Integer;
        let mut g: i64 = 0;
        for &c in self.coeffs.iter().chain(self.param_coeffs.iter()) {
            g = g.gcd(&c.abs());
        }
        g
    }

    /// The expression with dimension `pos` substituted by a literal value
    /// and its column removed.
    pub fn substitute_dim(&self, pos: usize, value: i64) -> Self {
        assert!(pos < self.coeffs.len(), "dimension {} out of range", pos);
        let mut coeffs = self.coeffs.clone();
        let c = coeffs.remove(pos);
        Self {
            constant: self.constant + c * value,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// The expression with parameter `pos` substituted by a literal value
    /// and its column removed.
    pub fn substitute_param(&self, pos: usize, value: i64) -> Self {
        assert!(pos < self.param_coeffs.len(), "parameter {} out of range", pos);
        let mut param_coeffs = self.param_coeffs.clone();
        let c = param_coeffs.remove(pos);
        Self {
            constant: self.constant + c * value,
            coeffs: self.coeffs.clone(),
            param_coeffs,
        }
    }

    /// The expression with dimension column `pos` removed.
    ///
    /// The coefficient at `pos` must already be zero.
    pub fn remove_dim(&self, pos: usize) -> Self {
        assert_eq!(self.coeff(pos), 0, "removing live dimension {}", pos);
        let mut coeffs = self.coeffs.clone();
        coeffs.remove(pos);
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// The expression with a zero dimension column inserted at `pos`.
    pub fn insert_dim(&self, pos: usize) -> Self {
        assert!(pos <= self.coeffs.len());
        let mut coeffs = self.coeffs.clone();
        coeffs.insert(pos, 0);
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// The expression widened to `n_dim` dimensions and `n_param` parameters
    /// (new columns appended with zero coefficients).
    pub fn widened(&self, n_dim: usize, n_param: usize) -> Self {
        assert!(n_dim >= self.n_dim() && n_param >= self.n_param());
        let mut coeffs = self.coeffs.clone();
        coeffs.resize(n_dim, 0);
        let mut param_coeffs = self.param_coeffs.clone();
        param_coeffs.resize(n_param, 0);
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs,
        }
    }

    /// Convert to string with given dimension and parameter names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let mut parts = Vec::new();

        for (i, &c) in self.coeffs.iter().enumerate() {
            if c != 0 {
                let default_name = format!("d{}", i);
                let name = dim_names.get(i)
                    .map(|s| s.as_str())
                    .unwrap_or(&default_name);
                parts.push(render_term(c, name));
            }
        }

        for (i, &c) in self.param_coeffs.iter().enumerate() {
            if c != 0 {
                let default_name = format!("p{}", i);
                let name = param_names.get(i)
                    .map(|s| s.as_str())
                    .unwrap_or(&default_name);
                parts.push(render_term(c, name));
            }
        }

        if self.constant != 0 || parts.is_empty() {
            parts.push(format!("{}", self.constant));
        }

        parts.join(" + ").replace("+ -", "- ")
    }
}

fn render_term(coeff: i64, name: &str) -> String {
    match coeff {
        1 => name.to_string(),
        -1 => format!("-{}", name),
        c => format!("{}*{}", c, name),
    }
}

impl Add for AffineExpr {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(self.coeffs.len(), other.coeffs.len());
        assert_eq!(self.param_coeffs.len(), other.param_coeffs.len());
        Self {
            constant: self.constant + other.constant,
            coeffs: self.coeffs.iter().zip(&other.coeffs)
                .map(|(&a, &b)| a + b).collect(),
            param_coeffs: self.param_coeffs.iter().zip(&other.param_coeffs)
                .map(|(&a, &b)| a + b).collect(),
        }
    }
}

impl Sub for AffineExpr {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Neg for AffineExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1)
    }
}

impl fmt::Display for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names: Vec<String> = (0..self.n_dim()).map(|i| format!("d{}", i)).collect();
        let param_names: Vec<String> = (0..self.n_param()).map(|i| format!("p{}", i)).collect();
        write!(f, "{}", self.to_string_with_names(&dim_names, &param_names))
    }
}

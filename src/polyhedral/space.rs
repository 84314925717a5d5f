//! Polyhedral spaces define the dimensions of iteration domains.
//!
//! A space describes the structure of an iteration domain or map:
//! - Set/output dimensions
//! - Parameter dimensions (symbolic constants)
//! - Input dimensions (for maps)

use serde::{Serialize, Deserialize};
use std::fmt;

/// A polyhedral space describes dimensionality and naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Number of set/output dimensions
    pub n_dim: usize,
    /// Number of parameter dimensions
    pub n_param: usize,
    /// Number of input dimensions (for maps only)
    pub n_in: usize,
    /// Optional tuple name (statement name for iteration domains)
    pub tuple_name: Option<String>,
    /// Names of dimensions (optional)
    pub dim_names: Vec<String>,
    /// Names of parameters (optional)
    pub param_names: Vec<String>,
}

impl Space {
    /// Create a new set space with the given dimensions.
    pub fn set(n_dim: usize) -> Self {
        Self {
            n_dim,
            n_param: 0,
            n_in: 0,
            tuple_name: None,
            dim_names: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Create a new set space with parameters.
    pub fn set_with_params(n_dim: usize, n_param: usize) -> Self {
        Self {
            n_dim,
            n_param,
            n_in: 0,
            tuple_name: None,
            dim_names: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Create a new map space with parameters.
    pub fn map_with_params(n_in: usize, n_out: usize, n_param: usize) -> Self {
        Self {
            n_dim: n_out,
            n_param,
            n_in,
            tuple_name: None,
            dim_names: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Check if this is a set space (no input dimensions).
    pub fn is_set(&self) -> bool {
        self.n_in == 0
    }

    /// Set the tuple name.
    pub fn with_tuple_name(mut self, name: impl Into<String>) -> Self {
        self.tuple_name = Some(name.into());
        self
    }

    /// Set dimension names.
    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.dim_names = names;
        self
    }

    /// Set parameter names.
    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.param_names = names;
        self
    }

    /// Get all dimension names, with `d<i>` defaults.
    pub fn all_dim_names(&self) -> Vec<String> {
        (0..self.n_dim)
            .map(|i| {
                self.dim_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("d{}", i))
            })
            .collect()
    }

    /// Get all parameter names, with `p<i>` defaults.
    pub fn all_param_names(&self) -> Vec<String> {
        (0..self.n_param)
            .map(|i| {
                self.param_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("p{}", i))
            })
            .collect()
    }

    /// Index of the dimension with the given name, if any.
    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.dim_names.iter().position(|n| n == name)
    }

    /// Index of the parameter with the given name, if any.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }

    /// Space with dimension `pos` removed.
    pub fn without_dim(&self, pos: usize) -> Space {
        assert!(pos < self.n_dim, "dimension {} out of range", pos);
        let mut s = self.clone();
        s.n_dim -= 1;
        if pos < s.dim_names.len() {
            s.dim_names.remove(pos);
        }
        s
    }

    /// Space with parameter `pos` removed.
    pub fn without_param(&self, pos: usize) -> Space {
        assert!(pos < self.n_param, "parameter {} out of range", pos);
        let mut s = self.clone();
        s.n_param -= 1;
        if pos < s.param_names.len() {
            s.param_names.remove(pos);
        }
        s
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            write!(f, "[{}] -> [{}]", self.n_in, self.n_dim)?;
        } else {
            write!(f, "[{}]", self.n_dim)?;
        }
        if self.n_param > 0 {
            write!(f, " : {} params", self.n_param)?;
        }
        Ok(())
    }
}

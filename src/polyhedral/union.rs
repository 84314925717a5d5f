//! Unions of basic integer sets.
//!
//! Classification assigns each alternative a union of tile domains. The
//! tiles are disjoint by construction, so a union is represented as a plain
//! list of basic-set parts addressed by index; no coalescing is attempted.

use crate::polyhedral::set::IntegerSet;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A union of disjoint basic sets sharing one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUnion {
    /// Number of dimensions shared by every part
    n_dim: usize,
    /// Number of parameters shared by every part
    n_param: usize,
    /// The disjuncts
    parts: Vec<IntegerSet>,
}

impl SetUnion {
    /// An empty union over the given space arity.
    pub fn empty(n_dim: usize, n_param: usize) -> Self {
        Self { n_dim, n_param, parts: Vec::new() }
    }

    /// A union holding a single part.
    pub fn from_set(set: IntegerSet) -> Self {
        let mut u = Self::empty(set.dim(), set.n_param());
        u.add(set);
        u
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize { self.n_dim }

    /// Number of parameters.
    pub fn n_param(&self) -> usize { self.n_param }

    /// Add a disjunct.
    pub fn add(&mut self, set: IntegerSet) {
        assert_eq!(set.dim(), self.n_dim, "union part dimension mismatch");
        assert_eq!(set.n_param(), self.n_param, "union part parameter mismatch");
        self.parts.push(set);
    }

    /// The disjuncts.
    pub fn parts(&self) -> &[IntegerSet] {
        &self.parts
    }

    /// Number of disjuncts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the union holds no parts at all.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The single part of a union asserted to have exactly one.
    ///
    /// Aborts when the assertion fails: a multi-part union where one basic
    /// set is expected indicates a modeling bug.
    pub fn single(&self) -> &IntegerSet {
        assert_eq!(
            self.parts.len(), 1,
            "expected exactly one basic set, found {}", self.parts.len()
        );
        &self.parts[0]
    }

    /// Intersect every part with a basic set.
    pub fn intersect_set(&self, other: &IntegerSet) -> SetUnion {
        let mut out = Self::empty(self.n_dim, self.n_param);
        for p in &self.parts {
            out.add(p.intersect(other));
        }
        out
    }

    /// Fix a parameter across every part.
    pub fn fix_param(&self, pos: usize, value: i64) -> SetUnion {
        let mut out = Self::empty(self.n_dim, self.n_param - 1);
        for p in &self.parts {
            out.add(p.fix_param(pos, value));
        }
        out
    }

    /// All points of all parts, in part order (parameter-free unions only).
    /// Parts are disjoint, so no deduplication is performed.
    pub fn points(&self) -> Vec<Vec<i64>> {
        let mut out = Vec::new();
        for p in &self.parts {
            out.extend(p.points());
        }
        out
    }

    /// Total point count across parts (parameter-free unions only).
    pub fn cardinality(&self) -> usize {
        self.parts.iter().map(|p| p.cardinality()).sum()
    }
}

impl fmt::Display for SetUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return write!(f, "{{ }}");
        }
        for (i, p) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

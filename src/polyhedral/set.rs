//! Integer sets (polyhedra) for iteration domains.
//!
//! An [`IntegerSet`] is a single conjunction of affine constraints (a basic
//! set). Projection uses Fourier-Motzkin elimination; because the rational
//! shadow can overapproximate the integer projection, every exact operation
//! (point enumeration, emptiness, lexmin/lexmax) re-checks candidate points
//! against the original constraint system.
//!
//! Operations that only make sense once all parameters are instantiated
//! (`points`, `is_empty`, `lexmin`, ...) assert a parameter-free set:
//! calling them on a parametric set is a modeling bug, not a recoverable
//! condition.

use crate::polyhedral::space::Space;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem, ConstraintKind};
use crate::polyhedral::expr::{AffineExpr, ceil_div, floor_div};
use serde::{Serialize, Deserialize};
use std::fmt;

/// An integer set defined by affine constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerSet {
    /// The space this set lives in
    pub space: Space,
    /// Conjunction of constraints
    pub constraints: ConstraintSystem,
}

/// One bound on a loop dimension: the dimension is `>= ceil(num/div)` for a
/// lower bound, `<= floor(num/div)` for an upper bound. `num` lives in the
/// bounded dimension's own space with that dimension's coefficient zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopBound {
    /// Numerator expression over outer dimensions and parameters
    pub num: AffineExpr,
    /// Positive divisor
    pub div: i64,
}

impl IntegerSet {
    /// The unconstrained set of the given dimension.
    pub fn universe(n_dim: usize) -> Self {
        Self::from_space(Space::set(n_dim))
    }

    /// The unconstrained set with parameters.
    pub fn universe_with_params(n_dim: usize, n_param: usize) -> Self {
        Self::from_space(Space::set_with_params(n_dim, n_param))
    }

    /// An empty set over a space.
    pub fn from_space(space: Space) -> Self {
        let constraints = ConstraintSystem::new(space.n_dim, space.n_param);
        Self { space, constraints }
    }

    /// The box `0 <= dim[d] < bounds[d]` for every dimension.
    pub fn rectangular(bounds: &[i64]) -> Self {
        let n_dim = bounds.len();
        let mut set = Self::universe(n_dim);
        for (i, &bound) in bounds.iter().enumerate() {
            set.add_constraint(Constraint::lower_bound(i, 0, n_dim, 0));
            set.add_constraint(Constraint::upper_bound(i, bound - 1, n_dim, 0));
        }
        set
    }

    /// Number of set dimensions.
    pub fn dim(&self) -> usize { self.space.n_dim }

    /// Number of parameters.
    pub fn n_param(&self) -> usize { self.space.n_param }

    /// Add a constraint to the conjunction.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.add(constraint);
    }

    /// Whether the point (with parameter values) satisfies every constraint.
    pub fn contains(&self, point: &[i64], params: &[i64]) -> bool {
        assert_eq!(point.len(), self.dim(), "point arity mismatch");
        self.constraints.is_satisfied(point, params)
    }

    /// Intersection: the conjunction of both constraint lists.
    pub fn intersect(&self, other: &IntegerSet) -> IntegerSet {
        assert_eq!(self.dim(), other.dim(), "intersect: dimension mismatch");
        assert_eq!(self.n_param(), other.n_param(), "intersect: parameter mismatch");
        let mut result = self.clone();
        for c in &other.constraints.constraints {
            result.add_constraint(c.clone());
        }
        result
    }

    /// Fix dimension `pos` to a literal value and drop its column.
    pub fn fix_dim(&self, pos: usize, value: i64) -> IntegerSet {
        assert!(pos < self.dim(), "dimension {} out of range", pos);
        let space = self.space.without_dim(pos);
        let mut sys = ConstraintSystem::new(space.n_dim, space.n_param);
        for c in &self.constraints.constraints {
            let fixed = Constraint {
                expr: c.expr.substitute_dim(pos, value),
                kind: c.kind,
            };
            if !fixed.is_trivial() {
                sys.add(fixed);
            }
        }
        IntegerSet { space, constraints: sys }
    }

    /// Fix parameter `pos` to a literal value and drop its column.
    ///
    /// This is the polyhedral half of "alternative replaces parameter N
    /// with value V": an equality is implied and the parameter dimension
    /// projected out in one step.
    pub fn fix_param(&self, pos: usize, value: i64) -> IntegerSet {
        assert!(pos < self.n_param(), "parameter {} out of range", pos);
        let space = self.space.without_param(pos);
        let mut sys = ConstraintSystem::new(space.n_dim, space.n_param);
        for c in &self.constraints.constraints {
            let fixed = Constraint {
                expr: c.expr.substitute_param(pos, value),
                kind: c.kind,
            };
            if !fixed.is_trivial() {
                sys.add(fixed);
            }
        }
        IntegerSet { space, constraints: sys }
    }

    /// Project out dimension `pos` by Fourier-Motzkin elimination.
    ///
    /// When an equality involves the dimension it is used for substitution;
    /// otherwise every lower/upper inequality pair is combined. The result
    /// is the rational shadow, suitable for bound generation; exact integer
    /// queries re-check against the original system.
    pub fn project_out_dim(&self, pos: usize) -> IntegerSet {
        assert!(pos < self.dim(), "dimension {} out of range", pos);
        let cs = &self.constraints.constraints;
        let mut combined: Vec<Constraint> = Vec::new();

        let eq_idx = cs.iter().position(|c| c.is_equality() && c.expr.involves_dim(pos));
        if let Some(ei) = eq_idx {
            let eq = &cs[ei];
            let c = eq.expr.coeff(pos);
            let sign = if c > 0 { 1 } else { -1 };
            let cabs = c.abs();
            for (i, other) in cs.iter().enumerate() {
                if i == ei {
                    continue;
                }
                let e = other.expr.coeff(pos);
                if e == 0 {
                    combined.push(other.clone());
                    continue;
                }
                // |c|*other - sign(c)*e*eq cancels the pos coefficient and
                // preserves the constraint sense since |c| > 0.
                let expr = other.expr.scale(cabs) - eq.expr.scale(sign * e);
                combined.push(Constraint { expr, kind: other.kind }.normalized());
            }
        } else {
            let mut lowers: Vec<&Constraint> = Vec::new();
            let mut uppers: Vec<&Constraint> = Vec::new();
            for c in cs {
                let e = c.expr.coeff(pos);
                if e == 0 {
                    combined.push(c.clone());
                } else if e > 0 {
                    lowers.push(c);
                } else {
                    uppers.push(c);
                }
            }
            for lo in &lowers {
                for up in &uppers {
                    let c1 = lo.expr.coeff(pos);
                    let c2 = -up.expr.coeff(pos);
                    let expr = lo.expr.scale(c2) + up.expr.scale(c1);
                    combined.push(Constraint::ge_zero(expr).normalized());
                }
            }
        }

        let space = self.space.without_dim(pos);
        let mut sys = ConstraintSystem::new(space.n_dim, space.n_param);
        for c in combined {
            assert_eq!(c.expr.coeff(pos), 0, "elimination left a live coefficient");
            let dropped = Constraint { expr: c.expr.remove_dim(pos), kind: c.kind };
            if !dropped.is_trivial() {
                sys.add(dropped);
            }
        }
        IntegerSet { space, constraints: sys }
    }

    /// Project onto the first `keep` dimensions (inner dimensions removed,
    /// outermost last).
    pub fn project_onto_prefix(&self, keep: usize) -> IntegerSet {
        assert!(keep <= self.dim());
        let mut result = self.clone();
        for d in (keep..self.dim()).rev() {
            result = result.project_out_dim(d);
        }
        result
    }

    /// Lower and upper bounds of the *last* dimension in terms of the outer
    /// dimensions and parameters. The caller projects inner dimensions away
    /// first (see [`IntegerSet::project_onto_prefix`]).
    pub fn last_dim_bounds(&self) -> (Vec<LoopBound>, Vec<LoopBound>) {
        assert!(self.dim() > 0, "bounds of a zero-dimensional set");
        let d = self.dim() - 1;
        let mut lowers = Vec::new();
        let mut uppers = Vec::new();
        for c in &self.constraints.constraints {
            let cd = c.expr.coeff(d);
            if cd == 0 {
                continue;
            }
            let mut rest = c.expr.clone();
            rest.coeffs[d] = 0;
            match c.kind {
                ConstraintKind::Inequality => {
                    if cd > 0 {
                        lowers.push(LoopBound { num: -rest, div: cd });
                    } else {
                        uppers.push(LoopBound { num: rest, div: -cd });
                    }
                }
                ConstraintKind::Equality => {
                    if cd > 0 {
                        lowers.push(LoopBound { num: -rest.clone(), div: cd });
                        uppers.push(LoopBound { num: -rest, div: cd });
                    } else {
                        lowers.push(LoopBound { num: rest.clone(), div: -cd });
                        uppers.push(LoopBound { num: rest, div: -cd });
                    }
                }
            }
        }
        (lowers, uppers)
    }

    /// Successive projections: element `d` is this set restricted to its
    /// first `d + 1` dimensions.
    fn projections(&self) -> Vec<IntegerSet> {
        let n = self.dim();
        let mut projs = vec![self.clone()];
        for d in (1..n).rev() {
            let next = projs.last().unwrap().project_out_dim(d);
            projs.push(next);
        }
        projs.reverse();
        projs
    }

    /// Visit every integer point in lexicographic order. The callback
    /// returns `false` to stop early. Requires a parameter-free set; an
    /// unbounded dimension aborts (modeling bug).
    pub fn for_each_point<F: FnMut(&[i64]) -> bool>(&self, f: F) {
        self.scan(false, f);
    }

    fn scan<F: FnMut(&[i64]) -> bool>(&self, descending: bool, mut f: F) {
        assert_eq!(self.n_param(), 0, "point enumeration requires a parameter-free set");
        let n = self.dim();
        if n == 0 {
            if self.constraints.is_satisfied(&[], &[]) {
                f(&[]);
            }
            return;
        }
        let projs = self.projections();
        let step: i64 = if descending { -1 } else { 1 };

        let mut point: Vec<i64> = Vec::with_capacity(n);
        let mut ranges: Vec<(i64, i64)> = Vec::with_capacity(n);

        match dim_interval(&projs[0], &[]) {
            Some((lo, hi)) => {
                point.push(if descending { hi } else { lo });
                ranges.push((lo, hi));
            }
            None => return,
        }

        loop {
            let depth = point.len();
            let (lo, hi) = ranges[depth - 1];
            let exhausted = if descending {
                point[depth - 1] < lo
            } else {
                point[depth - 1] > hi
            };
            if exhausted {
                point.pop();
                ranges.pop();
                if point.is_empty() {
                    return;
                }
                *point.last_mut().unwrap() += step;
                continue;
            }
            if depth == n {
                // Guard against the rational shadow admitting extra points.
                if self.constraints.is_satisfied(&point, &[]) && !f(&point) {
                    return;
                }
                *point.last_mut().unwrap() += step;
                continue;
            }
            match dim_interval(&projs[depth], &point) {
                Some((lo2, hi2)) => {
                    point.push(if descending { hi2 } else { lo2 });
                    ranges.push((lo2, hi2));
                }
                None => {
                    *point.last_mut().unwrap() += step;
                }
            }
        }
    }

    /// All integer points in lexicographic order (parameter-free sets only).
    pub fn points(&self) -> Vec<Vec<i64>> {
        let mut out = Vec::new();
        self.for_each_point(|p| {
            out.push(p.to_vec());
            true
        });
        out
    }

    /// Whether the set contains no integer point (parameter-free sets only).
    pub fn is_empty(&self) -> bool {
        let mut found = false;
        self.for_each_point(|_| {
            found = true;
            false
        });
        !found
    }

    /// Lexicographic minimum (parameter-free sets only).
    pub fn lexmin(&self) -> Option<Vec<i64>> {
        let mut min = None;
        self.scan(false, |p| {
            min = Some(p.to_vec());
            false
        });
        min
    }

    /// Lexicographic maximum (parameter-free sets only).
    pub fn lexmax(&self) -> Option<Vec<i64>> {
        let mut max = None;
        self.scan(true, |p| {
            max = Some(p.to_vec());
            false
        });
        max
    }

    /// Number of integer points (parameter-free sets only).
    pub fn cardinality(&self) -> usize {
        let mut count = 0;
        self.for_each_point(|_| {
            count += 1;
            true
        });
        count
    }

    /// Whether two parameter-free sets contain the same integer points.
    pub fn same_points(&self, other: &IntegerSet) -> bool {
        self.dim() == other.dim() && self.points() == other.points()
    }

    /// All dimension names (with defaults).
    pub fn dim_names(&self) -> Vec<String> { self.space.all_dim_names() }

    /// All parameter names (with defaults).
    pub fn param_names(&self) -> Vec<String> { self.space.all_param_names() }

    /// Builder-style dimension naming.
    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_dim_names(names);
        self
    }

    /// Builder-style parameter naming.
    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_param_names(names);
        self
    }
}

/// Bounds of the last dimension of `proj` once the outer dimensions are
/// fixed to `prefix`. `None` means the slice is contradictory. A missing
/// bound on either side aborts: runtime domains are always bounded.
fn dim_interval(proj: &IntegerSet, prefix: &[i64]) -> Option<(i64, i64)> {
    let d = proj.dim() - 1;
    assert_eq!(prefix.len(), d, "prefix arity mismatch");
    let mut vals = prefix.to_vec();
    vals.push(0);

    let mut lo: Option<i64> = None;
    let mut hi: Option<i64> = None;
    for c in &proj.constraints.constraints {
        let cd = c.expr.coeff(d);
        let rest = c.expr.evaluate(&vals, &[]);
        match c.kind {
            ConstraintKind::Inequality => {
                if cd == 0 {
                    if rest < 0 {
                        return None;
                    }
                } else if cd > 0 {
                    let b = ceil_div(-rest, cd);
                    lo = Some(lo.map_or(b, |v: i64| v.max(b)));
                } else {
                    let b = floor_div(rest, -cd);
                    hi = Some(hi.map_or(b, |v: i64| v.min(b)));
                }
            }
            ConstraintKind::Equality => {
                if cd == 0 {
                    if rest != 0 {
                        return None;
                    }
                } else {
                    let (blo, bhi) = if cd > 0 {
                        (ceil_div(-rest, cd), floor_div(-rest, cd))
                    } else {
                        (ceil_div(rest, -cd), floor_div(rest, -cd))
                    };
                    lo = Some(lo.map_or(blo, |v: i64| v.max(blo)));
                    hi = Some(hi.map_or(bhi, |v: i64| v.min(bhi)));
                }
            }
        }
    }
    let lo = lo.unwrap_or_else(|| panic!("dimension {} has no lower bound", d));
    let hi = hi.unwrap_or_else(|| panic!("dimension {} has no upper bound", d));
    Some((lo, hi))
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names = self.dim_names();
        let param_names = self.param_names();
        if !param_names.is_empty() {
            write!(f, "[{}] -> ", param_names.join(", "))?;
        }
        write!(f, "{{ ")?;
        if let Some(name) = &self.space.tuple_name {
            write!(f, "{}", name)?;
        }
        write!(f, "[{}]", dim_names.join(", "))?;
        if !self.constraints.is_empty() {
            write!(f, " : ")?;
            for (i, c) in self.constraints.constraints.iter().enumerate() {
                if i > 0 {
                    write!(f, " and ")?;
                }
                write!(f, "{}", c.to_string_with_names(&dim_names, &param_names))?;
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(n: i64) -> IntegerSet {
        // { [i, j] : 0 <= i < n and i <= j < n }
        let mut set = IntegerSet::universe(2);
        set.add_constraint(Constraint::lower_bound(0, 0, 2, 0));
        set.add_constraint(Constraint::upper_bound(0, n - 1, 2, 0));
        let i = AffineExpr::var(0, 2, 0);
        let j = AffineExpr::var(1, 2, 0);
        set.add_constraint(Constraint::ge(j.clone(), i));
        set.add_constraint(Constraint::upper_bound(1, n - 1, 2, 0));
        set
    }

    #[test]
    fn test_rectangular_contains() {
        let set = IntegerSet::rectangular(&[10, 20]);
        assert!(set.contains(&[0, 0], &[]));
        assert!(set.contains(&[9, 19], &[]));
        assert!(!set.contains(&[10, 0], &[]));
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(IntegerSet::rectangular(&[4, 5]).cardinality(), 20);
        assert_eq!(triangle(4).cardinality(), 10);
    }

    #[test]
    fn test_points_lexicographic() {
        let set = IntegerSet::rectangular(&[2, 2]);
        assert_eq!(set.points(), vec![
            vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1],
        ]);
    }

    #[test]
    fn test_lexmin_lexmax_triangle() {
        let t = triangle(5);
        assert_eq!(t.lexmin(), Some(vec![0, 0]));
        assert_eq!(t.lexmax(), Some(vec![4, 4]));
    }

    #[test]
    fn test_empty_intersection() {
        let a = IntegerSet::rectangular(&[3]);
        let mut b = IntegerSet::universe(1);
        b.add_constraint(Constraint::lower_bound(0, 5, 1, 0));
        b.add_constraint(Constraint::upper_bound(0, 9, 1, 0));
        assert!(a.intersect(&b).is_empty());
        assert!(!a.is_empty());
    }

    #[test]
    fn test_project_triangle() {
        // Projecting j out of the triangle leaves 0 <= i < 4
        let t = triangle(4);
        let p = t.project_out_dim(1);
        assert_eq!(p.dim(), 1);
        assert_eq!(p.points(), vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_project_equality() {
        // { [i, j] : j = 2i and 0 <= i < 3 } projected on i
        let mut set = IntegerSet::universe(2);
        set.add_constraint(Constraint::lower_bound(0, 0, 2, 0));
        set.add_constraint(Constraint::upper_bound(0, 2, 2, 0));
        let i2 = AffineExpr::var(0, 2, 0).scale(2);
        let j = AffineExpr::var(1, 2, 0);
        set.add_constraint(Constraint::eq(j, i2));
        assert_eq!(set.cardinality(), 3);
        let p = set.project_out_dim(1);
        assert_eq!(p.points(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_fix_dim() {
        let t = triangle(4);
        // i = 2 leaves { [j] : 2 <= j < 4 }
        let s = t.fix_dim(0, 2);
        assert_eq!(s.dim(), 1);
        assert_eq!(s.points(), vec![vec![2], vec![3]]);
    }

    #[test]
    fn test_fix_param() {
        // { [i] : 0 <= i < N }, N = 3
        let mut set = IntegerSet::universe_with_params(1, 1)
            .with_param_names(vec!["N".to_string()]);
        set.add_constraint(Constraint::lower_bound(0, 0, 1, 1));
        let mut upper = -AffineExpr::var(0, 1, 1);
        upper.param_coeffs[0] = 1;
        upper.constant = -1;
        set.add_constraint(Constraint::ge_zero(upper));
        let fixed = set.fix_param(0, 3);
        assert_eq!(fixed.n_param(), 0);
        assert_eq!(fixed.points(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_strided_equality_points() {
        // { [i, j] : j = 2i } has no point with odd j; enumeration must
        // not report any
        let mut set = IntegerSet::rectangular(&[3, 5]);
        let i2 = AffineExpr::var(0, 2, 0).scale(2);
        let j = AffineExpr::var(1, 2, 0);
        set.add_constraint(Constraint::eq(j, i2));
        assert_eq!(set.points(), vec![vec![0, 0], vec![1, 2], vec![2, 4]]);
    }

    #[test]
    fn test_last_dim_bounds() {
        let t = triangle(4);
        let (lowers, uppers) = t.last_dim_bounds();
        // j >= i and j <= 3
        assert_eq!(lowers.len(), 1);
        assert_eq!(uppers.len(), 1);
        assert_eq!(lowers[0].div, 1);
        assert_eq!(lowers[0].num.coeff(0), 1);
        assert_eq!(uppers[0].num.constant, 3);
    }
}

//! Polyhedral data structures and operations.
//!
//! The mathematical foundation of the refinement runtime:
//! - Affine expressions and constraints over dimensions and parameters
//! - Integer sets (iteration domains) with projection, parameter
//!   elimination, bound extraction, and exact point enumeration
//! - Unions of disjoint basic sets (per-alternative tile unions)
//! - Affine maps (schedules)
//! - A textual representation with a parse/print round trip

pub mod space;
pub mod expr;
pub mod constraint;
pub mod set;
pub mod union;
pub mod map;
pub mod parse;

pub use space::Space;
pub use expr::AffineExpr;
pub use constraint::{Constraint, ConstraintKind, ConstraintSystem};
pub use set::{IntegerSet, LoopBound};
pub use union::SetUnion;
pub use map::AffineMap;
pub use parse::{parse_set, parse_map};

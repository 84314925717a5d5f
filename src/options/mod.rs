//! The pragma option tree.
//!
//! The pragma parser (out of scope here) turns `#pragma acr` constructs
//! into this validated option tree; the CLI reads the same shape from a
//! JSON file. One `KernelOptions` describes one instrumented kernel:
//! its grid, its monitored array, the declared alternatives, and the
//! strategies mapping classified monitor values to alternatives.

use crate::scop::Scop;
use crate::utils::errors::ConfigError;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Everything the pragmas declared for one kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelOptions {
    /// Unique name prefix for generated symbols
    pub prefix: String,
    /// Tile edge length, in cells per monitor dimension
    pub grid_size: i64,
    /// The user-declared init function signature; its parameter list is
    /// threaded through every generated function unchanged
    pub init: InitSignature,
    /// The monitored array and how to reduce it
    pub monitor: MonitorSpec,
    /// Declared alternatives, in declaration order
    pub alternatives: Vec<Alternative>,
    /// Declared strategies, in declaration order
    pub strategies: Vec<Strategy>,
}

/// The `init` pragma's function prototype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSignature {
    /// C return type (normally `void`)
    pub return_type: String,
    /// Function name
    pub name: String,
    /// Parameter list, in order
    pub params: Vec<CParam>,
}

/// One C parameter: type text and name, kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CParam {
    /// C type text (e.g. `double*`)
    pub ctype: String,
    /// Parameter name
    pub name: String,
}

impl InitSignature {
    /// The parameter list as C text: `double* A, int N`.
    pub fn param_list(&self) -> String {
        self.params.iter()
            .map(|p| format!("{} {}", p.ctype, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The argument list as C text: `A, N`.
    pub fn arg_list(&self) -> String {
        self.params.iter()
            .map(|p| p.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The `monitor` pragma: which array is watched, which loop iterators
/// index it, and how raw cells reduce to one decision per tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSpec {
    /// Monitored array name
    pub array: String,
    /// Ordered index identifiers (the monitor dimensions)
    pub dims: Vec<String>,
    /// Per-dimension extent, as C expression text (e.g. `N`, `512`); used
    /// to linearize cell coordinates in the generated scan
    pub extents: Vec<String>,
    /// Per-tile reduction of member-cell bytes
    pub reduction: Reduction,
    /// Optional user filter function applied per cell in the scan
    pub filter: Option<String>,
}

/// Reduction folding member-cell bytes into one per-tile decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Smallest member byte
    Min,
    /// Largest member byte
    Max,
    /// Arithmetic mean of member bytes (rounded down)
    Avg,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Min => write!(f, "min"),
            Reduction::Max => write!(f, "max"),
            Reduction::Avg => write!(f, "avg"),
        }
    }
}

/// One declared alternative computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    /// Alternative name, referenced by strategies
    pub name: String,
    /// What the alternative substitutes
    pub kind: AlternativeKind,
}

/// The two substitution kinds an alternative can declare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlternativeKind {
    /// Replace a program parameter with a literal value
    Parameter {
        /// The parameter name
        name: String,
        /// The literal it is fixed to
        value: i64,
    },
    /// Swap a called function for another
    Function {
        /// Callee name in the original body
        from: String,
        /// Replacement callee
        to: String,
    },
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AlternativeKind::Parameter { name, value } => {
                write!(f, "alternative {}(parameter, {} = {})", self.name, name, value)
            }
            AlternativeKind::Function { from, to } => {
                write!(f, "alternative {}(function, {} -> {})", self.name, from, to)
            }
        }
    }
}

/// One strategy rule: a monitor value (or range) selects an alternative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// The values this strategy claims
    pub selector: Selector,
    /// The alternative it selects
    pub alternative: String,
}

/// The values a strategy claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    /// Exactly one value
    Direct(u8),
    /// An inclusive range
    Range(u8, u8),
}

impl Selector {
    /// Whether the selector claims the given byte.
    pub fn claims(&self, byte: u8) -> bool {
        match *self {
            Selector::Direct(v) => byte == v,
            Selector::Range(lo, hi) => lo <= byte && byte <= hi,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector {
            Selector::Direct(v) => {
                write!(f, "strategy(direct, {}, {})", v, self.alternative)
            }
            Selector::Range(lo, hi) => {
                write!(f, "strategy(range, {}..{}, {})", lo, hi, self.alternative)
            }
        }
    }
}

impl KernelOptions {
    /// Index of the alternative with the given name.
    pub fn alternative_index(&self, name: &str) -> Option<usize> {
        self.alternatives.iter().position(|a| a.name == name)
    }

    /// Semantic validation against the scop this kernel instruments.
    ///
    /// Every violation here is a configuration defect reported with the
    /// offending construct rendered; nothing is silently dropped or
    /// defaulted.
    pub fn validate(&self, scop: &Scop) -> Result<(), ConfigError> {
        if self.grid_size < 1 {
            return Err(ConfigError::InvalidGridSize(self.grid_size));
        }
        if self.monitor.dims.is_empty() {
            return Err(ConfigError::EmptyMonitorDims {
                array: self.monitor.array.clone(),
            });
        }
        if self.monitor.extents.len() != self.monitor.dims.len() {
            return Err(ConfigError::ExtentArityMismatch {
                array: self.monitor.array.clone(),
                dims: self.monitor.dims.len(),
                extents: self.monitor.extents.len(),
            });
        }
        for alt in &self.alternatives {
            if let AlternativeKind::Parameter { name, .. } = &alt.kind {
                if scop.param_index(name).is_none() {
                    return Err(ConfigError::UnknownParameter {
                        alternative: alt.name.clone(),
                        parameter: name.clone(),
                    });
                }
            }
            if !self.strategies.iter().any(|s| s.alternative == alt.name) {
                return Err(ConfigError::UnusedAlternative {
                    alternative: alt.name.clone(),
                });
            }
        }
        for strat in &self.strategies {
            if self.alternative_index(&strat.alternative).is_none() {
                return Err(ConfigError::UnknownAlternative {
                    strategy: strat.to_string(),
                    alternative: strat.alternative.clone(),
                });
            }
            if let Selector::Range(lo, hi) = strat.selector {
                if lo > hi {
                    return Err(ConfigError::EmptyRange {
                        strategy: strat.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scop() -> Scop {
        Scop::parse("\
context: [N] -> { : N >= 1 }
statement S0:
  domain: [N] -> { S0[i] : 0 <= i < N }
  body: A[i] = f(A[i]);
").unwrap()
    }

    fn options() -> KernelOptions {
        KernelOptions {
            prefix: "k0".to_string(),
            grid_size: 4,
            init: InitSignature {
                return_type: "void".to_string(),
                name: "kernel_init".to_string(),
                params: vec![
                    CParam { ctype: "double*".to_string(), name: "A".to_string() },
                    CParam { ctype: "int".to_string(), name: "N".to_string() },
                ],
            },
            monitor: MonitorSpec {
                array: "A".to_string(),
                dims: vec!["i".to_string()],
                extents: vec!["N".to_string()],
                reduction: Reduction::Max,
                filter: None,
            },
            alternatives: vec![
                Alternative {
                    name: "fast".to_string(),
                    kind: AlternativeKind::Function {
                        from: "f".to_string(),
                        to: "f_approx".to_string(),
                    },
                },
            ],
            strategies: vec![
                Strategy { selector: Selector::Range(0, 255), alternative: "fast".to_string() },
            ],
        }
    }

    #[test]
    fn test_valid_options() {
        assert!(options().validate(&scop()).is_ok());
    }

    #[test]
    fn test_unknown_alternative() {
        let mut opts = options();
        opts.strategies.push(Strategy {
            selector: Selector::Direct(3),
            alternative: "missing".to_string(),
        });
        match opts.validate(&scop()) {
            Err(ConfigError::UnknownAlternative { alternative, .. }) => {
                assert_eq!(alternative, "missing");
            }
            other => panic!("expected UnknownAlternative, got {:?}", other),
        }
    }

    #[test]
    fn test_unused_alternative() {
        let mut opts = options();
        opts.alternatives.push(Alternative {
            name: "orphan".to_string(),
            kind: AlternativeKind::Parameter { name: "N".to_string(), value: 2 },
        });
        assert!(matches!(
            opts.validate(&scop()),
            Err(ConfigError::UnusedAlternative { .. })
        ));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut opts = options();
        opts.alternatives[0].kind = AlternativeKind::Parameter {
            name: "M".to_string(),
            value: 1,
        };
        assert!(matches!(
            opts.validate(&scop()),
            Err(ConfigError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_empty_range() {
        let mut opts = options();
        opts.strategies[0].selector = Selector::Range(200, 100);
        assert!(matches!(
            opts.validate(&scop()),
            Err(ConfigError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let opts = options();
        let json = serde_json::to_string(&opts).unwrap();
        let back: KernelOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.prefix, "k0");
        assert!(matches!(back.alternatives[0].kind, AlternativeKind::Function { .. }));
    }
}

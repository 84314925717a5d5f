//! The scop model: statements, domains, schedules, context.
//!
//! A scop (static control part) is the loop-nest region the pragmas
//! delimit. The build step serializes it into the instrumented source as a
//! line-oriented text block embedding the polyhedral strings of
//! [`crate::polyhedral::parse`]; the runtime `init` call parses that text
//! back. Round-trip property: serialize-then-parse yields a scop whose
//! domains contain the same integer points.
//!
//! ```text
//! context: [N] -> { : N >= 1 }
//! statement S0:
//!   domain: [N] -> { S0[i, j] : 0 <= i < N and 0 <= j < N }
//!   schedule: [N] -> { S0[i, j] -> [i, j] }
//!   body: A[i][j] = A[i][j] * 0.5;
//! ```

use crate::polyhedral::{parse_map, parse_set, AffineMap, IntegerSet};
use crate::utils::errors::PolyParseError;
use serde::{Serialize, Deserialize};
use std::fmt;

/// One atomic computation inside the scop, with its own iteration domain
/// and schedule. `body` is the original C statement text, carried verbatim
/// so the generated code compiles against the original declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Statement name (`S0`, `S1`, ...)
    pub name: String,
    /// Iteration domain
    pub domain: IntegerSet,
    /// Execution-order map
    pub schedule: AffineMap,
    /// Original statement body text
    pub body: String,
}

impl Statement {
    /// The statement's iterator names, outermost first.
    pub fn iterators(&self) -> Vec<String> {
        self.domain.dim_names()
    }

    /// Loop-nest depth.
    pub fn depth(&self) -> usize {
        self.domain.dim()
    }
}

/// A parsed scop: shared parametric context plus the statement list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scop {
    /// Program parameters, in declaration order
    pub params: Vec<String>,
    /// Parametric constraint set shared by all statements (0 set dims)
    pub context: IntegerSet,
    /// The statements
    pub statements: Vec<Statement>,
}

impl Scop {
    /// Parse the embedded textual representation.
    pub fn parse(text: &str) -> Result<Scop, PolyParseError> {
        let mut context: Option<IntegerSet> = None;
        let mut statements: Vec<Statement> = Vec::new();
        let mut current: Option<PendingStatement> = None;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |msg: String| PolyParseError::new(msg, lineno);

            if let Some(rest) = line.strip_prefix("context:") {
                context = Some(parse_set(rest.trim())?);
            } else if let Some(rest) = line.strip_prefix("statement") {
                if let Some(pending) = current.take() {
                    statements.push(pending.finish(lineno)?);
                }
                let name = rest.trim().trim_end_matches(':').trim();
                if name.is_empty() {
                    return Err(err("statement block without a name".to_string()));
                }
                current = Some(PendingStatement::new(name));
            } else if let Some(rest) = line.strip_prefix("domain:") {
                let pending = current.as_mut()
                    .ok_or_else(|| err("domain outside a statement block".to_string()))?;
                pending.domain = Some(parse_set(rest.trim())?);
            } else if let Some(rest) = line.strip_prefix("schedule:") {
                let pending = current.as_mut()
                    .ok_or_else(|| err("schedule outside a statement block".to_string()))?;
                pending.schedule = Some(parse_map(rest.trim())?);
            } else if let Some(rest) = line.strip_prefix("body:") {
                let pending = current.as_mut()
                    .ok_or_else(|| err("body outside a statement block".to_string()))?;
                pending.body = Some(rest.trim().to_string());
            } else {
                return Err(err(format!("unrecognized scop line `{}`", line)));
            }
        }
        if let Some(pending) = current.take() {
            statements.push(pending.finish(text.lines().count())?);
        }

        let context = context
            .ok_or_else(|| PolyParseError::new("scop has no context line", 0))?;
        let params = context.param_names();
        for stmt in &statements {
            if stmt.domain.param_names() != params {
                return Err(PolyParseError::new(
                    format!("statement `{}` parameters differ from the context", stmt.name),
                    0,
                ));
            }
        }
        Ok(Scop { params, context, statements })
    }

    /// Look up a statement by name.
    pub fn statement(&self, name: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.name == name)
    }

    /// Index of a program parameter.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    /// Eliminate a parameter by fixing it to a literal value: the parameter
    /// disappears from the context and from every statement's domain and
    /// schedule. The parameter must exist; a bad name is a modeling bug.
    pub fn fix_param(&self, name: &str, value: i64) -> Scop {
        let pos = self.param_index(name)
            .unwrap_or_else(|| panic!("unknown parameter `{}`", name));
        let mut params = self.params.clone();
        params.remove(pos);
        let statements = self.statements.iter().map(|s| Statement {
            name: s.name.clone(),
            domain: s.domain.fix_param(pos, value),
            schedule: s.schedule.fix_param(pos, value),
            body: s.body.clone(),
        }).collect();
        Scop {
            params,
            context: self.context.fix_param(pos, value),
            statements,
        }
    }

    /// Instantiate every parameter, leaving a parameter-free scop.
    pub fn instantiate(&self, values: &[(String, i64)]) -> Scop {
        let mut scop = self.clone();
        for (name, value) in values {
            scop = scop.fix_param(name, *value);
        }
        assert!(scop.params.is_empty(), "parameters left uninstantiated");
        scop
    }
}

struct PendingStatement {
    name: String,
    domain: Option<IntegerSet>,
    schedule: Option<AffineMap>,
    body: Option<String>,
}

impl PendingStatement {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: None,
            schedule: None,
            body: None,
        }
    }

    fn finish(self, lineno: usize) -> Result<Statement, PolyParseError> {
        let domain = self.domain.ok_or_else(|| PolyParseError::new(
            format!("statement `{}` has no domain", self.name), lineno))?;
        let schedule = match self.schedule {
            Some(s) => s,
            None => AffineMap::identity_with_params(domain.dim(), domain.n_param())
                .with_dim_names(domain.dim_names())
                .with_param_names(domain.param_names()),
        };
        if schedule.n_in() != domain.dim() {
            return Err(PolyParseError::new(
                format!("statement `{}` schedule arity differs from its domain", self.name),
                lineno,
            ));
        }
        let body = self.body.ok_or_else(|| PolyParseError::new(
            format!("statement `{}` has no body", self.name), lineno))?;
        Ok(Statement { name: self.name, domain, schedule, body })
    }
}

// Serialization is the inverse of `Scop::parse`.
impl fmt::Display for Scop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "context: {}", self.context)?;
        for stmt in &self.statements {
            writeln!(f, "statement {}:", stmt.name)?;
            writeln!(f, "  domain: {}", stmt.domain)?;
            writeln!(f, "  schedule: {}", stmt.schedule)?;
            writeln!(f, "  body: {}", stmt.body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOP_TEXT: &str = "\
context: [N] -> { : N >= 1 }
statement S0:
  domain: [N] -> { S0[i, j] : 0 <= i < N and 0 <= j < N }
  schedule: [N] -> { S0[i, j] -> [i, j] }
  body: A[i][j] = A[i][j] * 0.5;
";

    #[test]
    fn test_parse_scop() {
        let scop = Scop::parse(SCOP_TEXT).unwrap();
        assert_eq!(scop.params, vec!["N".to_string()]);
        assert_eq!(scop.statements.len(), 1);
        let s0 = &scop.statements[0];
        assert_eq!(s0.name, "S0");
        assert_eq!(s0.depth(), 2);
        assert_eq!(s0.iterators(), vec!["i".to_string(), "j".to_string()]);
        assert!(s0.body.contains("0.5"));
    }

    #[test]
    fn test_roundtrip() {
        let scop = Scop::parse(SCOP_TEXT).unwrap();
        let reparsed = Scop::parse(&scop.to_string()).unwrap();
        assert_eq!(reparsed.params, scop.params);
        assert_eq!(reparsed.statements[0].body, scop.statements[0].body);
        let a = scop.statements[0].domain.fix_param(0, 5);
        let b = reparsed.statements[0].domain.fix_param(0, 5);
        assert!(a.same_points(&b));
    }

    #[test]
    fn test_fix_param() {
        let scop = Scop::parse(SCOP_TEXT).unwrap();
        let fixed = scop.fix_param("N", 3);
        assert!(fixed.params.is_empty());
        let domain = &fixed.statements[0].domain;
        assert_eq!(domain.n_param(), 0);
        // exactly the original points with N = 3
        assert_eq!(domain.cardinality(), 9);
        assert_eq!(fixed.statements[0].schedule.n_param(), 0);
    }

    #[test]
    fn test_missing_body_rejected() {
        let text = "\
context: { [] }
statement S0:
  domain: { S0[i] : 0 <= i < 4 }
";
        assert!(Scop::parse(text).is_err());
    }
}

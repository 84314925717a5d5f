//! Parsing of the textual polyhedral representation.
//!
//! The instrumented source embeds sets and maps as text:
//!
//! ```text
//! [N] -> { S0[i, j] : 0 <= i < N and i <= j < N }
//! [N] -> { S0[i, j] -> [0, i, j] }
//! ```
//!
//! Round-trip property: parsing the `Display` form of a set or map yields
//! an object with the same integer points. The parser is a hand-written
//! scanner plus recursive descent; parameters must be declared in the
//! `[..] ->` prefix before they may appear in constraints.

use crate::polyhedral::constraint::Constraint;
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::map::AffineMap;
use crate::polyhedral::set::IntegerSet;
use crate::polyhedral::space::Space;
use crate::utils::errors::PolyParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(i64),
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Arrow,
    Plus,
    Minus,
    Star,
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
    And,
    Eof,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input: input.as_bytes(), pos: 0 }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, PolyParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(&c) = self.input.get(self.pos) else {
                tokens.push((Token::Eof, start));
                return Ok(tokens);
            };
            let token = match c {
                b'[' => { self.pos += 1; Token::LBracket }
                b']' => { self.pos += 1; Token::RBracket }
                b'{' => { self.pos += 1; Token::LBrace }
                b'}' => { self.pos += 1; Token::RBrace }
                b':' => { self.pos += 1; Token::Colon }
                b',' => { self.pos += 1; Token::Comma }
                b'+' => { self.pos += 1; Token::Plus }
                b'*' => { self.pos += 1; Token::Star }
                b'-' => {
                    if self.input.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        Token::Arrow
                    } else {
                        self.pos += 1;
                        Token::Minus
                    }
                }
                b'<' => {
                    if self.input.get(self.pos + 1) == Some(&b'=') {
                        self.pos += 2;
                        Token::Le
                    } else {
                        self.pos += 1;
                        Token::Lt
                    }
                }
                b'>' => {
                    if self.input.get(self.pos + 1) == Some(&b'=') {
                        self.pos += 2;
                        Token::Ge
                    } else {
                        self.pos += 1;
                        Token::Gt
                    }
                }
                b'=' => {
                    // accept both `=` and `==`
                    if self.input.get(self.pos + 1) == Some(&b'=') {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                    Token::Eq
                }
                b'0'..=b'9' => {
                    while matches!(self.input.get(self.pos), Some(b'0'..=b'9')) {
                        self.pos += 1;
                    }
                    let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap();
                    let value = text.parse::<i64>().map_err(|_| {
                        PolyParseError::new(format!("integer literal `{}` out of range", text), start)
                    })?;
                    Token::Int(value)
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    while matches!(self.input.get(self.pos),
                        Some(b) if b.is_ascii_alphanumeric() || *b == b'_')
                    {
                        self.pos += 1;
                    }
                    let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap();
                    if text == "and" {
                        Token::And
                    } else {
                        Token::Ident(text.to_string())
                    }
                }
                other => {
                    return Err(PolyParseError::new(
                        format!("unexpected character `{}`", other as char),
                        start,
                    ));
                }
            };
            tokens.push((token, start));
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.input.get(self.pos), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, PolyParseError> {
        Ok(Self {
            tokens: Lexer::new(text).tokenize()?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), PolyParseError> {
        if self.accept(&token) {
            Ok(())
        } else {
            Err(PolyParseError::new(
                format!("expected {}, found {:?}", what, self.peek()),
                self.offset(),
            ))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, PolyParseError> {
        match self.bump() {
            Token::Ident(name) => Ok(name),
            other => Err(PolyParseError::new(
                format!("expected {}, found {:?}", what, other),
                self.offset(),
            )),
        }
    }

    /// Optional `[N, M] ->` parameter prefix.
    fn params(&mut self) -> Result<Vec<String>, PolyParseError> {
        if *self.peek() != Token::LBracket {
            return Ok(Vec::new());
        }
        self.bump();
        let mut names = Vec::new();
        if *self.peek() != Token::RBracket {
            loop {
                names.push(self.ident("parameter name")?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RBracket, "`]`")?;
        self.expect(Token::Arrow, "`->` after parameter list")?;
        Ok(names)
    }

    /// `S0[i, j]` or `[i, j]` or nothing (a pure-parameter context).
    fn tuple(&mut self) -> Result<(Option<String>, Vec<String>), PolyParseError> {
        let name = match self.peek() {
            Token::Ident(_) => {
                let Token::Ident(n) = self.bump() else { unreachable!() };
                Some(n)
            }
            _ => None,
        };
        if *self.peek() != Token::LBracket {
            if name.is_some() {
                return Err(PolyParseError::new("expected `[` after tuple name", self.offset()));
            }
            return Ok((None, Vec::new()));
        }
        self.bump();
        let mut dims = Vec::new();
        if *self.peek() != Token::RBracket {
            loop {
                dims.push(self.ident("iterator name")?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RBracket, "`]`")?;
        Ok((name, dims))
    }

    fn affine(
        &mut self,
        dims: &[String],
        params: &[String],
    ) -> Result<AffineExpr, PolyParseError> {
        let mut expr = AffineExpr::zero(dims.len(), params.len());
        let mut sign = 1i64;
        if self.accept(&Token::Minus) {
            sign = -1;
        }
        loop {
            let term = self.term(dims, params)?;
            expr = expr + term.scale(sign);
            if self.accept(&Token::Plus) {
                sign = 1;
            } else if self.accept(&Token::Minus) {
                sign = -1;
            } else {
                return Ok(expr);
            }
        }
    }

    fn term(
        &mut self,
        dims: &[String],
        params: &[String],
    ) -> Result<AffineExpr, PolyParseError> {
        let offset = self.offset();
        match self.bump() {
            Token::Int(value) => {
                if self.accept(&Token::Star) {
                    let name = self.ident("identifier after `*`")?;
                    let var = self.resolve(&name, dims, params, offset)?;
                    Ok(var.scale(value))
                } else {
                    Ok(AffineExpr::constant(value, dims.len(), params.len()))
                }
            }
            Token::Ident(name) => self.resolve(&name, dims, params, offset),
            other => Err(PolyParseError::new(
                format!("expected term, found {:?}", other),
                offset,
            )),
        }
    }

    fn resolve(
        &self,
        name: &str,
        dims: &[String],
        params: &[String],
        offset: usize,
    ) -> Result<AffineExpr, PolyParseError> {
        if let Some(i) = dims.iter().position(|d| d == name) {
            Ok(AffineExpr::var(i, dims.len(), params.len()))
        } else if let Some(i) = params.iter().position(|p| p == name) {
            Ok(AffineExpr::param(i, dims.len(), params.len()))
        } else {
            Err(PolyParseError::new(
                format!("unknown identifier `{}`", name),
                offset,
            ))
        }
    }

    /// A comparison chain `0 <= i < N`, yielding one constraint per link.
    fn condition(
        &mut self,
        dims: &[String],
        params: &[String],
        out: &mut Vec<Constraint>,
    ) -> Result<(), PolyParseError> {
        let mut lhs = self.affine(dims, params)?;
        let mut linked = false;
        loop {
            let op = match self.peek() {
                Token::Le | Token::Lt | Token::Ge | Token::Gt | Token::Eq => self.bump(),
                _ if linked => return Ok(()),
                _ => {
                    return Err(PolyParseError::new(
                        format!("expected comparison operator, found {:?}", self.peek()),
                        self.offset(),
                    ));
                }
            };
            let rhs = self.affine(dims, params)?;
            let constraint = match op {
                Token::Le => Constraint::ge_zero(rhs.clone() - lhs),
                Token::Lt => {
                    let mut e = rhs.clone() - lhs;
                    e.constant -= 1;
                    Constraint::ge_zero(e)
                }
                Token::Ge => Constraint::ge_zero(lhs - rhs.clone()),
                Token::Gt => {
                    let mut e = lhs - rhs.clone();
                    e.constant -= 1;
                    Constraint::ge_zero(e)
                }
                Token::Eq => Constraint::eq_zero(lhs - rhs.clone()),
                _ => unreachable!(),
            };
            out.push(constraint);
            lhs = rhs;
            linked = true;
        }
    }

    fn conditions(
        &mut self,
        dims: &[String],
        params: &[String],
    ) -> Result<Vec<Constraint>, PolyParseError> {
        let mut out = Vec::new();
        loop {
            self.condition(dims, params, &mut out)?;
            if !self.accept(&Token::And) {
                return Ok(out);
            }
        }
    }

    fn set(&mut self) -> Result<IntegerSet, PolyParseError> {
        let params = self.params()?;
        self.expect(Token::LBrace, "`{`")?;
        let (tuple_name, dims) = self.tuple()?;

        let mut space = Space::set_with_params(dims.len(), params.len())
            .with_dim_names(dims.clone())
            .with_param_names(params.clone());
        if let Some(name) = tuple_name {
            space = space.with_tuple_name(name);
        }
        let mut set = IntegerSet::from_space(space);

        if self.accept(&Token::Colon) {
            for c in self.conditions(&dims, &params)? {
                set.add_constraint(c);
            }
        }
        self.expect(Token::RBrace, "`}`")?;
        self.expect(Token::Eof, "end of input")?;
        Ok(set)
    }

    fn map(&mut self) -> Result<AffineMap, PolyParseError> {
        let params = self.params()?;
        self.expect(Token::LBrace, "`{`")?;
        let (tuple_name, dims) = self.tuple()?;
        self.expect(Token::Arrow, "`->` in map")?;
        self.expect(Token::LBracket, "`[`")?;
        let mut outputs = Vec::new();
        if *self.peek() != Token::RBracket {
            loop {
                outputs.push(self.affine(&dims, &params)?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RBracket, "`]`")?;
        self.expect(Token::RBrace, "`}`")?;
        self.expect(Token::Eof, "end of input")?;

        let mut map = AffineMap::from_outputs(dims.len(), params.len(), outputs)
            .with_dim_names(dims)
            .with_param_names(params);
        if let Some(name) = tuple_name {
            map.space = map.space.with_tuple_name(name);
        }
        Ok(map)
    }
}

/// Parse a textual integer set.
pub fn parse_set(text: &str) -> Result<IntegerSet, PolyParseError> {
    Parser::new(text)?.set()
}

/// Parse a textual affine map.
pub fn parse_map(text: &str) -> Result<AffineMap, PolyParseError> {
    Parser::new(text)?.map()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::constraint::ConstraintKind;

    #[test]
    fn test_parse_rectangular() {
        let set = parse_set("{ [i, j] : 0 <= i < 10 and 0 <= j < 20 }").unwrap();
        assert_eq!(set.dim(), 2);
        assert!(set.contains(&[9, 19], &[]));
        assert!(!set.contains(&[10, 0], &[]));
    }

    #[test]
    fn test_parse_parametric() {
        let set = parse_set("[N] -> { S0[i] : 0 <= i < N }").unwrap();
        assert_eq!(set.n_param(), 1);
        assert_eq!(set.space.tuple_name.as_deref(), Some("S0"));
        assert!(set.contains(&[4], &[5]));
        assert!(!set.contains(&[5], &[5]));
    }

    #[test]
    fn test_parse_triangular_chain() {
        let set = parse_set("{ [i, j] : 0 <= i <= j < 6 }").unwrap();
        // chain yields three constraints
        assert_eq!(set.constraints.len(), 3);
        assert!(set.contains(&[2, 5], &[]));
        assert!(!set.contains(&[3, 2], &[]));
    }

    #[test]
    fn test_parse_equality_and_coefficients() {
        let set = parse_set("{ [i, j] : j = 2*i and 0 <= i < 4 }").unwrap();
        assert!(set.constraints.constraints.iter()
            .any(|c| c.kind == ConstraintKind::Equality));
        assert!(set.contains(&[3, 6], &[]));
        assert!(!set.contains(&[3, 5], &[]));
    }

    #[test]
    fn test_parse_context_set() {
        let ctx = parse_set("[N, M] -> { : N >= 1 and M >= 1 }").unwrap();
        assert_eq!(ctx.dim(), 0);
        assert_eq!(ctx.n_param(), 2);
    }

    #[test]
    fn test_roundtrip_display() {
        let texts = [
            "{ [i, j] : 0 <= i < 10 and 0 <= j < 10 }",
            "[N] -> { S0[i, j] : 0 <= i < N and i <= j < N }",
            "{ [i] : 0 <= i <= 41 }",
        ];
        for text in texts {
            let set = parse_set(text).unwrap();
            let reparsed = parse_set(&set.to_string()).unwrap();
            assert_eq!(set.dim(), reparsed.dim());
            assert_eq!(set.n_param(), reparsed.n_param());
            if set.n_param() == 0 {
                assert!(set.same_points(&reparsed), "round-trip changed {}", text);
            }
        }
    }

    #[test]
    fn test_parse_map() {
        let map = parse_map("[N] -> { S0[i, j] -> [0, i, j] }").unwrap();
        assert_eq!(map.n_in(), 2);
        assert_eq!(map.n_out(), 3);
        assert_eq!(map.apply(&[4, 5], &[9]), vec![0, 4, 5]);
    }

    #[test]
    fn test_map_roundtrip() {
        let map = parse_map("{ [i, j] -> [j, i + 1] }").unwrap();
        let reparsed = parse_map(&map.to_string()).unwrap();
        assert_eq!(map.apply(&[2, 7], &[]), reparsed.apply(&[2, 7], &[]));
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        assert!(parse_set("{ [i] : 0 <= i < N }").is_err());
    }

    #[test]
    fn test_negative_constants() {
        let set = parse_set("{ [i] : -3 <= i <= -1 }").unwrap();
        assert_eq!(set.points(), vec![vec![-3], vec![-2], vec![-1]]);
    }
}

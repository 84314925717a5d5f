//! C loop-nest emission from polyhedral domains.
//!
//! Bounds come from Fourier-Motzkin projections: for each depth the domain
//! is projected onto its outer dimensions, and the constraints on the
//! innermost remaining dimension become the loop's lower/upper bounds.
//! Multiple bounds fold through `acr_max`/`acr_min`; non-unit coefficients
//! go through `acr_ceild`/`acr_floord`. Dimensions are emitted
//! outermost-to-innermost in the order the schedule fixed; bound order
//! follows the constraint list, no independent tie-break is introduced.

use crate::polyhedral::{IntegerSet, LoopBound};
use crate::utils::errors::AcrError;
use crate::utils::pretty::CodeFormatter;

/// Helper macros emitted once at the top of every generated translation
/// unit.
pub fn emit_preamble(f: &mut CodeFormatter) {
    f.writeln("#ifndef ACR_HELPERS");
    f.writeln("#define ACR_HELPERS");
    f.writeln("#define acr_max(a, b) (((a) > (b)) ? (a) : (b))");
    f.writeln("#define acr_min(a, b) (((a) < (b)) ? (a) : (b))");
    f.writeln("#define acr_floord(n, d) (((n) < 0) ? -((-(n) + (d) - 1) / (d)) : (n) / (d))");
    f.writeln("#define acr_ceild(n, d) (((n) < 0) ? -((-(n)) / (d)) : ((n) + (d) - 1) / (d))");
    f.writeln("#endif");
    f.blank();
}

fn render_bound(
    bound: &LoopBound,
    dim_names: &[String],
    param_names: &[String],
    is_lower: bool,
) -> String {
    let num = bound.num.to_string_with_names(dim_names, param_names);
    if bound.div == 1 {
        num
    } else if is_lower {
        format!("acr_ceild({}, {})", num, bound.div)
    } else {
        format!("acr_floord({}, {})", num, bound.div)
    }
}

fn fold_bounds(rendered: Vec<String>, combiner: &str) -> String {
    let mut unique: Vec<String> = Vec::with_capacity(rendered.len());
    for r in rendered {
        if !unique.contains(&r) {
            unique.push(r);
        }
    }
    let mut iter = unique.into_iter();
    let first = iter.next().expect("no bounds to fold");
    iter.fold(first, |acc, next| format!("{}({}, {})", combiner, next, acc))
}

/// Emit the nested loops scanning `set`, with `body` as the innermost
/// statement text. The set's dimension names become the loop variables;
/// its parameter names are referenced as-is and must be in scope in the
/// surrounding C.
pub fn emit_loop_nest(
    f: &mut CodeFormatter,
    set: &IntegerSet,
    body: &str,
) -> Result<(), AcrError> {
    let n = set.dim();
    let dim_names = set.dim_names();
    let param_names = set.param_names();

    for d in 0..n {
        let proj = set.project_onto_prefix(d + 1);
        let (lowers, uppers) = proj.last_dim_bounds();
        if lowers.is_empty() || uppers.is_empty() {
            return Err(AcrError::Codegen(format!(
                "dimension `{}` of {} has no finite bounds",
                dim_names[d], set
            )));
        }
        let lo = fold_bounds(
            lowers.iter().map(|b| render_bound(b, &dim_names, &param_names, true)).collect(),
            "acr_max",
        );
        let hi = fold_bounds(
            uppers.iter().map(|b| render_bound(b, &dim_names, &param_names, false)).collect(),
            "acr_min",
        );
        let var = &dim_names[d];
        f.writeln(&format!(
            "for (int {var} = {lo}; {var} <= {hi}; {var}++) {{",
            var = var, lo = lo, hi = hi
        ));
        f.indent();
    }

    f.writeln(body);

    for _ in 0..n {
        f.dedent();
        f.writeln("}");
    }
    Ok(())
}

/// Replace whole-identifier occurrences of `from` with `to` in C text.
pub fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    while i < bytes.len() {
        if text[i..].starts_with(from) {
            let before_ok = i == 0 || !is_ident(bytes[i - 1]);
            let after = i + from.len();
            let after_ok = after >= bytes.len() || !is_ident(bytes[after]);
            if before_ok && after_ok {
                out.push_str(to);
                i = after;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::parse_set;

    #[test]
    fn test_rectangular_nest() {
        let set = parse_set("[N] -> { [i, j] : 0 <= i < N and 0 <= j < 8 }").unwrap();
        let mut f = CodeFormatter::default_indent();
        emit_loop_nest(&mut f, &set, "A[i][j] = 0;").unwrap();
        let code = f.finish();
        assert!(code.contains("for (int i = 0; i <= N - 1; i++) {"));
        assert!(code.contains("for (int j = 0; j <= 7; j++) {"));
        assert!(code.contains("A[i][j] = 0;"));
        assert_eq!(code.matches('}').count(), 2);
    }

    #[test]
    fn test_triangular_bound_references_outer_dim() {
        let set = parse_set("{ [i, j] : 0 <= i < 6 and i <= j < 6 }").unwrap();
        let mut f = CodeFormatter::default_indent();
        emit_loop_nest(&mut f, &set, "S;").unwrap();
        let code = f.finish();
        assert!(code.contains("for (int j = i; j <= 5; j++) {"), "unexpected code:\n{}", code);
    }

    #[test]
    fn test_multiple_lower_bounds_fold() {
        let set = parse_set("{ [i, j] : 0 <= i < 6 and 0 <= j < 6 and i <= j }").unwrap();
        let mut f = CodeFormatter::default_indent();
        emit_loop_nest(&mut f, &set, "S;").unwrap();
        let code = f.finish();
        assert!(
            code.contains("for (int j = acr_max(i, 0); j <= 5; j++) {"),
            "unexpected code:\n{}", code
        );
    }

    #[test]
    fn test_unbounded_rejected() {
        let set = parse_set("{ [i] : i >= 0 }").unwrap();
        let mut f = CodeFormatter::default_indent();
        assert!(emit_loop_nest(&mut f, &set, "S;").is_err());
    }

    #[test]
    fn test_replace_identifier() {
        let body = "x = heavy(heavy_init, heavy);";
        let out = replace_identifier(body, "heavy", "cheap");
        assert_eq!(out, "x = cheap(heavy_init, cheap);");
    }
}

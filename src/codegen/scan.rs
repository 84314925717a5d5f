//! Monitoring scan generation.
//!
//! Generated once per kernel: a function scanning the unrestricted
//! monitor-dimension sub-domain (all other dimensions projected out) and
//! writing one byte per cell into the row-major result buffer, through the
//! user's filter function when one is declared. The emitted code is
//! spliced into the original translation unit, so the monitored array, the
//! extent expressions, and the filter are referenced by name and must be
//! in scope there.

use crate::instrument::{monitor_scan_domain, DimensionAnalysis};
use crate::options::KernelOptions;
use crate::runtime::compile::monitoring_symbol;
use crate::scop::Scop;
use crate::utils::errors::AcrResult;
use crate::utils::pretty::CodeFormatter;
use crate::codegen::c::{emit_loop_nest, emit_preamble};

/// Row-major linearization of the monitor cell coordinates, as C text.
fn linear_index(dims: &[String], extents: &[String]) -> String {
    let mut acc = dims[0].clone();
    for d in 1..dims.len() {
        acc = format!("({}) * ({}) + {}", acc, extents[d], dims[d]);
    }
    acc
}

/// Generate the `<prefix>_monitoring(unsigned char*)` function.
pub fn generate_monitoring(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
) -> AcrResult<String> {
    let scan = monitor_scan_domain(scop, analysis);
    let monitor = &options.monitor;
    let dims = scan.dim_names();

    let access = format!(
        "{}{}",
        monitor.array,
        dims.iter().map(|d| format!("[{}]", d)).collect::<String>()
    );
    let cell = match &monitor.filter {
        Some(filter) => format!("{}({})", filter, access),
        None => access,
    };
    let body = format!(
        "result[{}] = (unsigned char)({});",
        linear_index(&dims, &monitor.extents),
        cell
    );

    let mut f = CodeFormatter::default_indent();
    emit_preamble(&mut f);
    f.writeln(&format!(
        "void {}(unsigned char* result) {{",
        monitoring_symbol(&options.prefix)
    ));
    f.indent();
    emit_loop_nest(&mut f, &scan, &body)?;
    f.dedent();
    f.writeln("}");
    Ok(f.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::classify_dimensions;
    use crate::options::{
        Alternative, AlternativeKind, CParam, InitSignature, MonitorSpec, Reduction,
        Selector, Strategy,
    };

    fn fixture() -> (Scop, KernelOptions) {
        let scop = Scop::parse("\
context: [N] -> { : N >= 1 }
statement S0:
  domain: [N] -> { S0[i, j, k] : 0 <= i < N and 0 <= j < N and 0 <= k < 4 }
  body: A[i][j] = update(A[i][j], k);
").unwrap();
        let options = KernelOptions {
            prefix: "heat".to_string(),
            grid_size: 4,
            init: InitSignature {
                return_type: "void".to_string(),
                name: "heat_init".to_string(),
                params: vec![
                    CParam { ctype: "double**".to_string(), name: "A".to_string() },
                    CParam { ctype: "int".to_string(), name: "N".to_string() },
                ],
            },
            monitor: MonitorSpec {
                array: "A".to_string(),
                dims: vec!["i".to_string(), "j".to_string()],
                extents: vec!["N".to_string(), "N".to_string()],
                reduction: Reduction::Max,
                filter: Some("temp_class".to_string()),
            },
            alternatives: vec![Alternative {
                name: "approx".to_string(),
                kind: AlternativeKind::Function {
                    from: "update".to_string(),
                    to: "update_approx".to_string(),
                },
            }],
            strategies: vec![Strategy {
                selector: Selector::Range(0, 255),
                alternative: "approx".to_string(),
            }],
        };
        (scop, options)
    }

    #[test]
    fn test_scan_shape() {
        let (scop, options) = fixture();
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let code = generate_monitoring(&scop, &analysis, &options).unwrap();
        assert!(code.contains("void heat_monitoring(unsigned char* result) {"));
        // k projected out: only the two monitor loops remain
        assert!(code.contains("for (int i = 0; i <= N - 1; i++) {"));
        assert!(code.contains("for (int j = 0; j <= N - 1; j++) {"));
        assert!(!code.contains("int k"));
        assert!(code.contains("result[(i) * (N) + j] = (unsigned char)(temp_class(A[i][j]));"));
    }

    #[test]
    fn test_scan_without_filter() {
        let (scop, mut options) = fixture();
        options.monitor.filter = None;
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let code = generate_monitoring(&scop, &analysis, &options).unwrap();
        assert!(code.contains("= (unsigned char)(A[i][j]);"));
    }

    #[test]
    fn test_linear_index_1d() {
        assert_eq!(linear_index(&["i".to_string()], &["N".to_string()]), "i");
    }
}

//! Specialized kernel generation.
//!
//! Dynamic mode emits one function per classification cycle covering every
//! alternative's restricted sub-domains, so each cycle costs exactly one
//! compile/link/dlopen. Static mode emits one function per
//! (alternative, tile) pair plus the `all_functions` pointer table; tiles
//! whose scan domain is empty get no function and a NULL slot.
//!
//! The generated functions carry the init prototype's parameter list
//! verbatim so they compile against the original translation unit's
//! declarations. Parameter-substitution alternatives shadow the eliminated
//! parameter with a local `const int`; function-swap alternatives rewrite
//! the callee identifier in the statement body.

use crate::instrument::DimensionAnalysis;
use crate::options::{AlternativeKind, KernelOptions};
use crate::runtime::compile::alternative_symbol;
use crate::runtime::data::StaticKernelTable;
use crate::runtime::specialize::{embed_monitor_set, SpecializedDomains};
use crate::scop::{Scop, Statement};
use crate::utils::errors::AcrResult;
use crate::utils::pretty::CodeFormatter;
use crate::codegen::c::{emit_loop_nest, emit_preamble, replace_identifier};

fn transformed_body(stmt: &Statement, kind: &AlternativeKind) -> String {
    match kind {
        AlternativeKind::Parameter { .. } => stmt.body.clone(),
        AlternativeKind::Function { from, to } => replace_identifier(&stmt.body, from, to),
    }
}

fn emit_alternative_region(
    f: &mut CodeFormatter,
    stmt: &Statement,
    kind: &AlternativeKind,
    domain: &crate::polyhedral::IntegerSet,
) -> AcrResult<()> {
    let body = transformed_body(stmt, kind);
    match kind {
        AlternativeKind::Parameter { name, value } => {
            // the parameter was eliminated from the domain; the body may
            // still reference it, so shadow it locally
            f.writeln("{");
            f.indent();
            f.writeln(&format!("const int {} = {};", name, value));
            emit_loop_nest(f, domain, &body)?;
            f.dedent();
            f.writeln("}");
        }
        AlternativeKind::Function { .. } => {
            emit_loop_nest(f, domain, &body)?;
        }
    }
    Ok(())
}

/// Generate the per-cycle specialized function (dynamic mode).
pub fn generate_dynamic(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
    domains: &SpecializedDomains,
) -> AcrResult<String> {
    let mut f = CodeFormatter::default_indent();
    emit_preamble(&mut f);
    f.writeln(&format!(
        "void {}({}) {{",
        alternative_symbol(&options.prefix),
        options.init.param_list()
    ));
    f.indent();

    for (si, (stmt, dims)) in scop.statements.iter().zip(&analysis.per_statement).enumerate() {
        if !dims.is_monitored() {
            // not tiled: runs once, unrestricted
            emit_loop_nest(&mut f, &stmt.domain, &stmt.body)?;
            continue;
        }
        for (ai, alt) in options.alternatives.iter().enumerate() {
            for part in domains.for_pair(ai, si).parts() {
                emit_alternative_region(&mut f, stmt, &alt.kind, part)?;
            }
        }
    }

    f.dedent();
    f.writeln("}");
    Ok(f.finish())
}

/// Emit one `a<alt>_<tile>` function as standalone text.
fn tile_function(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
    table: &StaticKernelTable,
    ai: usize,
    tile: usize,
    symbol: &str,
) -> AcrResult<String> {
    let alt = &options.alternatives[ai];
    let grid = table.grid();
    let mut f = CodeFormatter::default_indent();
    f.writeln(&format!(
        "static void {}({}) {{",
        symbol,
        options.init.param_list()
    ));
    f.indent();
    for (stmt, dims) in scop.statements.iter().zip(&analysis.per_statement) {
        if !dims.is_monitored() {
            continue;
        }
        let start = dims.monitor_dims[0];
        let mut domain = embed_monitor_set(grid.tile_domain(tile), &stmt.domain, start);
        if let AlternativeKind::Parameter { name, value } = &alt.kind {
            let pos = scop.param_index(name)
                .unwrap_or_else(|| panic!("unknown parameter `{}`", name));
            domain = domain.fix_param(pos, *value);
        }
        emit_alternative_region(&mut f, stmt, &alt.kind, &domain)?;
    }
    f.dedent();
    f.writeln("}");
    Ok(f.finish())
}

fn dispatch_table(options: &KernelOptions, table: &StaticKernelTable) -> String {
    // NULL slots are tiles outside the scan domain
    let grid = table.grid();
    let ctypes = options.init.params.iter()
        .map(|p| p.ctype.clone())
        .collect::<Vec<_>>()
        .join(", ");
    let mut f = CodeFormatter::default_indent();
    f.writeln(&format!(
        "static void (*{}_functions[{}][{}])({}) = {{",
        options.prefix,
        options.alternatives.len(),
        grid.total_tiles(),
        ctypes
    ));
    f.indent();
    for ai in 0..options.alternatives.len() {
        let row = (0..grid.total_tiles())
            .map(|t| table.symbol(ai, t).unwrap_or("NULL").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        f.writeln(&format!("{{ {} }},", row));
    }
    f.dedent();
    f.writeln("};");
    f.finish()
}

/// Generate the ahead-of-time per-tile functions and the
/// `all_functions[alternative][tile]` lookup table (static mode).
///
/// Only monitored statements appear in the per-tile functions; statements
/// that never touch the monitored array stay in the original kernel.
pub fn generate_static(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
    table: &StaticKernelTable,
) -> AcrResult<String> {
    let mut out = String::new();
    let mut f = CodeFormatter::default_indent();
    emit_preamble(&mut f);
    out.push_str(&f.finish());

    let grid = table.grid();
    for ai in 0..options.alternatives.len() {
        for t in 0..grid.total_tiles() {
            let Some(symbol) = table.symbol(ai, t) else {
                continue;
            };
            out.push_str(&tile_function(scop, analysis, options, table, ai, t, symbol)?);
            out.push('\n');
        }
    }
    out.push_str(&dispatch_table(options, table));
    Ok(out)
}

/// Static generation across a pool of worker threads.
///
/// Each worker owns its own copies of the polyhedral objects; nothing
/// polyhedral is shared between threads. This is the resource-partitioning
/// rule inherited from wrapped set libraries whose state object cannot
/// cross threads, kept here so a future handle-backed set type drops in
/// without changing the pool.
pub fn generate_static_parallel(
    scop: &Scop,
    analysis: &DimensionAnalysis,
    options: &KernelOptions,
    table: &StaticKernelTable,
    workers: usize,
) -> AcrResult<String> {
    assert!(workers > 0, "worker pool needs at least one thread");
    let grid = table.grid();
    let jobs: Vec<(usize, usize, String)> = (0..options.alternatives.len())
        .flat_map(|ai| (0..grid.total_tiles()).map(move |t| (ai, t)))
        .filter_map(|(ai, t)| table.symbol(ai, t).map(|s| (ai, t, s.to_string())))
        .collect();

    let mut buckets: Vec<Vec<(usize, (usize, usize, String))>> = vec![Vec::new(); workers];
    for (order, job) in jobs.into_iter().enumerate() {
        buckets[order % workers].push((order, job));
    }

    let mut pieces: Vec<(usize, String)> = std::thread::scope(|scope| {
        let handles: Vec<_> = buckets.into_iter().map(|bucket| {
            // disjoint per-thread copies
            let scop = scop.clone();
            let analysis = analysis.clone();
            let options = options.clone();
            let table = table.clone();
            scope.spawn(move || {
                let mut done = Vec::with_capacity(bucket.len());
                for (order, (ai, t, symbol)) in bucket {
                    let text = tile_function(&scop, &analysis, &options, &table, ai, t, &symbol)?;
                    done.push((order, text));
                }
                Ok::<_, crate::utils::errors::AcrError>(done)
            })
        }).collect();
        handles.into_iter()
            .map(|h| h.join().expect("static generation worker panicked"))
            .collect::<Result<Vec<_>, _>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    })?;
    pieces.sort_by_key(|(order, _)| *order);

    let mut out = String::new();
    let mut f = CodeFormatter::default_indent();
    emit_preamble(&mut f);
    out.push_str(&f.finish());
    for (_, text) in pieces {
        out.push_str(&text);
        out.push('\n');
    }
    out.push_str(&dispatch_table(options, table));
    Ok(out)
}

/// Generate the init/destroy call surface: the embedded scop text plus the
/// prototypes the build step splices into the instrumented source.
pub fn generate_init_stub(scop: &Scop, options: &KernelOptions) -> String {
    let mut f = CodeFormatter::default_indent();
    let escaped = scop.to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    f.writeln(&format!(
        "static const char {}_scop_text[] = \"{}\";",
        options.prefix, escaped
    ));
    f.blank();
    f.writeln(&format!(
        "{} {}({});",
        options.init.return_type,
        options.init.name,
        options.init.param_list()
    ));
    f.writeln(&format!("void {}_destroy(void);", options.prefix));
    f.writeln(&format!("void {}_monitoring(unsigned char* result);", options.prefix));
    f.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::classify_dimensions;
    use crate::options::{
        Alternative, CParam, InitSignature, MonitorSpec, Reduction, Selector, Strategy,
    };
    use crate::polyhedral::IntegerSet;
    use crate::runtime::classify::{classify_tiles, StrategyTable};
    use crate::runtime::grid::TileGrid;
    use crate::runtime::specialize::specialize;

    fn fixture() -> (Scop, KernelOptions) {
        let scop = Scop::parse("\
context: [N] -> { : N >= 1 }
statement S0:
  domain: [N] -> { S0[i, j] : 0 <= i < N and 0 <= j < N }
  schedule: [N] -> { S0[i, j] -> [i, j] }
  body: A[i][j] = solve(A, i, j, N);
").unwrap();
        let options = KernelOptions {
            prefix: "sim".to_string(),
            grid_size: 2,
            init: InitSignature {
                return_type: "void".to_string(),
                name: "sim_init".to_string(),
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
                filter: None,
            },
            alternatives: vec![
                Alternative {
                    name: "exact".to_string(),
                    kind: AlternativeKind::Function {
                        from: "solve".to_string(),
                        to: "solve".to_string(),
                    },
                },
                Alternative {
                    name: "approx".to_string(),
                    kind: AlternativeKind::Function {
                        from: "solve".to_string(),
                        to: "solve_approx".to_string(),
                    },
                },
            ],
            strategies: vec![
                Strategy { selector: Selector::Range(0, 127), alternative: "exact".to_string() },
                Strategy { selector: Selector::Range(128, 255), alternative: "approx".to_string() },
            ],
        };
        (scop, options)
    }

    #[test]
    fn test_dynamic_generation() {
        let (scop, options) = fixture();
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let grid = TileGrid::new(&[4, 4], 2).unwrap();
        let table = StrategyTable::build(&options).unwrap();
        let mut buffer = vec![0u8; 16];
        for c in 8..16 {
            buffer[c] = 255; // bottom half approx
        }
        let unions = classify_tiles(&grid, &table, Reduction::Max, &buffer).unwrap();
        let domains = specialize(&scop, &analysis, &options, &unions);
        let code = generate_dynamic(&scop, &analysis, &options, &domains).unwrap();

        assert!(code.contains("void sim_alternative(double** A, int N) {"));
        assert!(code.contains("solve_approx(A, i, j, N);"));
        assert!(code.contains("solve(A, i, j, N);"));
        // one loop nest per assigned tile: 2 tiles exact + 2 tiles approx,
        // two loops each
        assert_eq!(code.matches("for (int i").count(), 4);
    }

    #[test]
    fn test_static_generation() {
        let (scop, options) = fixture();
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let grid = TileGrid::new(&[4, 4], 2).unwrap();
        let scan = IntegerSet::rectangular(&[4, 4]);
        let static_table = StaticKernelTable::build(grid, &scan, options.alternatives.len());
        let code = generate_static(&scop, &analysis, &options, &static_table).unwrap();

        // 2 alternatives x 4 tiles
        assert!(code.contains("static void a0_0(double** A, int N) {"));
        assert!(code.contains("static void a1_3(double** A, int N) {"));
        assert!(code.contains("static void (*sim_functions[2][4])(double**, int) = {"));
        assert!(!code.contains("NULL"));
    }

    #[test]
    fn test_static_table_has_null_for_clipped_out_tiles() {
        let (scop, options) = fixture();
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let grid = TileGrid::new(&[4, 4], 3).unwrap(); // 2x2 tiles over 4x4
        let scan = IntegerSet::rectangular(&[3, 3]); // scan stops at 3
        let static_table = StaticKernelTable::build(grid, &scan, 1);
        let code = generate_static(&scop, &analysis, &options, &static_table).unwrap();
        assert!(code.contains("NULL"));
        assert!(code.contains("a0_0"));
    }

    #[test]
    fn test_parallel_static_matches_sequential() {
        let (scop, options) = fixture();
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let grid = TileGrid::new(&[4, 4], 2).unwrap();
        let scan = IntegerSet::rectangular(&[4, 4]);
        let table = StaticKernelTable::build(grid, &scan, options.alternatives.len());
        let sequential = generate_static(&scop, &analysis, &options, &table).unwrap();
        let parallel =
            generate_static_parallel(&scop, &analysis, &options, &table, 3).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parameter_alternative_shadow() {
        let (scop, mut options) = fixture();
        options.alternatives[1].kind = AlternativeKind::Parameter {
            name: "N".to_string(),
            value: 4,
        };
        let analysis = classify_dimensions(&scop, &options).unwrap();
        let grid = TileGrid::new(&[4, 4], 2).unwrap();
        let table = StrategyTable::build(&options).unwrap();
        let buffer = vec![255u8; 16];
        let unions = classify_tiles(&grid, &table, Reduction::Max, &buffer).unwrap();
        let domains = specialize(&scop, &analysis, &options, &unions);
        let code = generate_dynamic(&scop, &analysis, &options, &domains).unwrap();
        assert!(code.contains("const int N = 4;"));
        // eliminated parameter no longer appears in the bounds: the upper
        // bound folds the literal 3 (from N = 4) with the tile edge
        assert!(code.contains("acr_min(1, 3)"), "unexpected code:\n{}", code);
    }

    #[test]
    fn test_init_stub() {
        let (scop, options) = fixture();
        let stub = generate_init_stub(&scop, &options);
        assert!(stub.contains("static const char sim_scop_text[] ="));
        assert!(stub.contains("void sim_init(double** A, int N);"));
        assert!(stub.contains("void sim_destroy(void);"));
        assert!(!stub.contains('\n') || stub.contains("\\n"));
    }
}

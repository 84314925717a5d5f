//! ACR Command Line Interface
//!
//! Usage:
//!   acr --scop kernel.scop --options kernel.json --emit scan
//!   acr --help
//!
//! Examples:
//!   acr -s heat.scop -c heat.json --emit scan          # monitoring scan code
//!   acr -s heat.scop -c heat.json --emit table \
//!       --param N=512                                  # static function table
//!   acr -s heat.scop -c heat.json --emit all -o out.c

use acr::codegen::{generate_init_stub, generate_monitoring, generate_static};
use acr::instrument::classify_dimensions;
use acr::options::KernelOptions;
use acr::runtime::{StaticKernelTable, StrategyTable, TileGrid};
use acr::scop::Scop;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// ACR - adaptive code refinement instrumentation tool
#[derive(Parser, Debug)]
#[command(name = "acr")]
#[command(version)]
#[command(about = "Generate monitoring and specialized-kernel code for pragma-annotated loop nests", long_about = None)]
struct Cli {
    /// Embedded polyhedral representation (.scop text file)
    #[arg(short, long, value_name = "FILE")]
    scop: PathBuf,

    /// Kernel option tree (JSON)
    #[arg(short = 'c', long = "options", value_name = "FILE")]
    options: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "all")]
    emit: EmitKind,

    /// Parameter values for static generation, e.g. `N=512`
    #[arg(long, value_name = "NAME=VALUE")]
    param: Vec<String>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// The monitoring scan function
    Scan,
    /// The static per-tile function table (needs --param for every
    /// program parameter)
    Table,
    /// The init/destroy call surface with the embedded scop text
    Init,
    /// Everything the build step splices into the instrumented source
    All,
}

fn parse_params(args: &[String]) -> Result<Vec<(String, i64)>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("malformed --param `{}` (expected NAME=VALUE)", arg);
        };
        let value: i64 = value.trim().parse()
            .with_context(|| format!("malformed --param value in `{}`", arg))?;
        values.push((name.trim().to_string(), value));
    }
    Ok(values)
}

fn generate_table(
    scop: &Scop,
    options: &KernelOptions,
    params: &[(String, i64)],
) -> Result<String> {
    let analysis = classify_dimensions(scop, options)?;
    for p in &scop.params {
        if !params.iter().any(|(name, _)| name == p) {
            bail!("static generation needs --param {}=<value>", p);
        }
    }
    let instantiated = scop.instantiate(params);
    let inst_analysis = classify_dimensions(&instantiated, options)?;
    let scan = acr::instrument::monitor_scan_domain(&instantiated, &inst_analysis);
    let extents: Vec<i64> = scan.lexmax()
        .context("monitored scan domain is empty")?
        .iter()
        .map(|&m| m + 1)
        .collect();
    let grid = TileGrid::new(&extents, options.grid_size)?;
    debug!("static table over {} tiles", grid.total_tiles());
    let table = StaticKernelTable::build(grid, &scan, options.alternatives.len());
    Ok(generate_static(scop, &analysis, options, &table)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("ACR v{}", acr::VERSION);
    debug!("scop file: {:?}", cli.scop);

    let scop_text = fs::read_to_string(&cli.scop)
        .with_context(|| format!("reading {:?}", cli.scop))?;
    let scop = Scop::parse(&scop_text)
        .context("parsing the embedded polyhedral representation")?;
    let options_text = fs::read_to_string(&cli.options)
        .with_context(|| format!("reading {:?}", cli.options))?;
    let options: KernelOptions = serde_json::from_str(&options_text)
        .context("parsing the kernel option tree")?;

    options.validate(&scop)?;
    // the lookup table build is the setup-time strategy coverage check
    let table = StrategyTable::build(&options)?;
    if !table.is_total() {
        log::warn!(
            "strategies for `{}` leave uncovered monitor values; classification \
             will fail on them",
            options.prefix
        );
    }

    let analysis = classify_dimensions(&scop, &options)?;
    let params = parse_params(&cli.param)?;

    let mut sections: Vec<String> = Vec::new();
    match cli.emit {
        EmitKind::Scan => {
            sections.push(generate_monitoring(&scop, &analysis, &options)?);
        }
        EmitKind::Table => {
            sections.push(generate_table(&scop, &options, &params)?);
        }
        EmitKind::Init => {
            sections.push(generate_init_stub(&scop, &options));
        }
        EmitKind::All => {
            sections.push(generate_init_stub(&scop, &options));
            sections.push(generate_monitoring(&scop, &analysis, &options)?);
            if !params.is_empty() || scop.params.is_empty() {
                sections.push(generate_table(&scop, &options, &params)?);
            } else {
                info!("skipping static table: no --param values given");
            }
        }
    }
    let code = sections.join("\n");

    match &cli.output {
        Some(path) => {
            fs::write(path, code).with_context(|| format!("writing {:?}", path))?;
            info!("wrote {:?}", path);
        }
        None => print!("{}", code),
    }
    Ok(())
}

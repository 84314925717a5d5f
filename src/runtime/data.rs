//! Per-kernel runtime data.
//!
//! One [`KernelRuntime`] lives for each instrumented kernel: it owns the
//! parsed scop, the tile grid, the strategy table, and the coordinator
//! thread, and publishes the two artifacts the kernel thread reads:
//! the current monitoring buffer and the installed specialized function.
//! Both are `ArcSwap`-published: a reader always observes either the old
//! or the new complete artifact, never a partial one, and never blocks.

use crate::instrument::{classify_dimensions, DimensionAnalysis};
use crate::options::KernelOptions;
use crate::polyhedral::IntegerSet;
use crate::runtime::classify::{tile_decisions, StrategyTable};
use crate::runtime::compile::{tile_symbol, AlternativeCompiler, CompiledKernel};
use crate::runtime::coordinator::{Coordinator, CoordinatorCommand, CycleReport};
use crate::runtime::grid::TileGrid;
use crate::runtime::specialize::SpecializedDomains;
use crate::scop::Scop;
use crate::utils::errors::{AcrResult, ClassificationError};
use arc_swap::ArcSwapOption;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// The monitoring collaborator: deterministically writes one byte per
/// monitored cell into the provided buffer.
pub type MonitoringFn = Box<dyn Fn(&mut [u8]) + Send>;

/// A fully-installed specialized function artifact.
#[derive(Debug)]
pub struct InstalledFunction {
    /// The classification cycle that produced it
    pub cycle: u64,
    /// The loaded artifact
    pub kernel: CompiledKernel,
}

/// State shared between the kernel thread(s) and the coordinator.
pub struct RuntimeShared {
    /// Unique symbol prefix for this kernel
    pub prefix: String,
    /// The parsed scop
    pub scop: Scop,
    /// The validated option tree
    pub options: KernelOptions,
    /// Build-time dimension classification
    pub analysis: DimensionAnalysis,
    /// Precomputed tile grid
    pub grid: TileGrid,
    /// Byte-to-alternative lookup table
    pub table: StrategyTable,
    /// Most recent complete classification buffer
    pub monitoring_data: ArcSwapOption<Vec<u8>>,
    /// Most recent complete compiled artifact; `None` selects the
    /// original unspecialized kernel
    pub installed: ArcSwapOption<InstalledFunction>,
    /// Restricted domains of the in-progress cycle. Mutated only by the
    /// coordinator while generating; the lock serializes racing manual
    /// triggers.
    pub restricted: Mutex<Option<SpecializedDomains>>,
    /// Shutdown flag, observed at every coordinator wait point
    pub stop: AtomicBool,
}

/// The per-kernel runtime handle (dynamic mode).
pub struct KernelRuntime {
    shared: Arc<RuntimeShared>,
    cmd_tx: Sender<CoordinatorCommand>,
    report_rx: Receiver<CycleReport>,
    handle: Option<JoinHandle<()>>,
}

impl KernelRuntime {
    /// Parse the embedded scop text, validate the options, build the tile
    /// grid and strategy table, and spawn the coordinator thread.
    ///
    /// `extents` are the runtime monitor-dimension extents
    /// (`monitor_dim_max`), known once the instrumented program has its
    /// arrays; `monitoring` and `compiler` are the two injected
    /// collaborators.
    pub fn init(
        scop_text: &str,
        options: KernelOptions,
        extents: &[i64],
        monitoring: MonitoringFn,
        compiler: Box<dyn AlternativeCompiler>,
    ) -> AcrResult<KernelRuntime> {
        let scop = Scop::parse(scop_text)?;
        options.validate(&scop)?;
        let analysis = classify_dimensions(&scop, &options)?;
        let grid = TileGrid::new(extents, options.grid_size)?;
        let table = StrategyTable::build(&options)?;

        let shared = Arc::new(RuntimeShared {
            prefix: options.prefix.clone(),
            scop,
            options,
            analysis,
            grid,
            table,
            monitoring_data: ArcSwapOption::empty(),
            installed: ArcSwapOption::empty(),
            restricted: Mutex::new(None),
            stop: AtomicBool::new(false),
        });

        // One pending request at most; completion reports never block the
        // coordinator.
        let (cmd_tx, cmd_rx) = bounded(1);
        let (report_tx, report_rx) = unbounded();

        let coordinator = Coordinator::new(
            Arc::clone(&shared),
            monitoring,
            compiler,
            cmd_rx,
            report_tx,
        );
        let handle = std::thread::Builder::new()
            .name(format!("acr-coord-{}", shared.prefix))
            .spawn(move || coordinator.run())
            .map_err(crate::utils::errors::AcrError::Io)?;

        info!("runtime initialized for kernel `{}`", shared.prefix);
        Ok(KernelRuntime {
            shared,
            cmd_tx,
            report_rx,
            handle: Some(handle),
        })
    }

    /// Shared state, for generated-code glue.
    pub fn shared(&self) -> &Arc<RuntimeShared> {
        &self.shared
    }

    /// Ask the coordinator to run one monitor-classify-generate-install
    /// cycle. Returns `false` when a cycle is already pending; requests
    /// never stack.
    pub fn request_refinement(&self) -> bool {
        self.cmd_tx.try_send(CoordinatorCommand::Refine).is_ok()
    }

    /// Block until the in-flight cycle completes. `None` when the
    /// coordinator has already exited.
    pub fn wait_cycle(&self) -> Option<CycleReport> {
        self.report_rx.recv().ok()
    }

    /// Convenience: request a cycle and wait for its report.
    pub fn refine_blocking(&self) -> Option<CycleReport> {
        if !self.request_refinement() {
            return None;
        }
        self.wait_cycle()
    }

    /// The currently-installed specialized function, if any. Lock-free;
    /// kernel threads call this on every dispatch and fall back to the
    /// original function on `None`.
    pub fn dispatch(&self) -> Option<Arc<InstalledFunction>> {
        self.shared.installed.load_full()
    }

    /// The most recent classification buffer, if any.
    pub fn monitoring_data(&self) -> Option<Arc<Vec<u8>>> {
        self.shared.monitoring_data.load_full()
    }

    /// Join the coordinator. An in-flight install completes first; no new
    /// cycle starts once the stop flag is visible.
    pub fn destroy(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let _ = self.cmd_tx.try_send(CoordinatorCommand::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("coordinator thread for `{}` panicked", self.shared.prefix);
            }
        }
    }
}

impl Drop for KernelRuntime {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

/// Static (ahead-of-time) runtime data: the per-(alternative, tile)
/// function table plus the precomputed scan bounds, so tile enumeration
/// never queries the polyhedral library at runtime.
#[derive(Debug, Clone)]
pub struct StaticKernelTable {
    grid: TileGrid,
    min_max: Vec<[i64; 2]>,
    symbols: Vec<Vec<Option<String>>>,
}

impl StaticKernelTable {
    /// Build the table. `scan_domain` is the parameter-free monitor
    /// sub-domain; tiles that map onto no monitored cell get no function
    /// and a `None` slot.
    pub fn build(grid: TileGrid, scan_domain: &IntegerSet, n_alternatives: usize) -> StaticKernelTable {
        assert_eq!(scan_domain.n_param(), 0, "static build requires instantiated parameters");
        assert_eq!(scan_domain.dim(), grid.n_dims(), "scan domain arity mismatch");

        let lexmin = scan_domain.lexmin().expect("empty monitored scan domain");
        let lexmax = scan_domain.lexmax().expect("empty monitored scan domain");
        let min_max = (0..grid.n_dims())
            .map(|d| [lexmin[d], lexmax[d]])
            .collect();

        let mut symbols = Vec::with_capacity(n_alternatives);
        for alt in 0..n_alternatives {
            let mut row = Vec::with_capacity(grid.total_tiles());
            for t in 0..grid.total_tiles() {
                let occupied = !grid.tile_domain(t).intersect(scan_domain).is_empty();
                row.push(occupied.then(|| tile_symbol(alt, t)));
            }
            symbols.push(row);
        }
        StaticKernelTable { grid, min_max, symbols }
    }

    /// Precomputed lexicographic bounds of the scan domain, per dimension.
    pub fn min_max(&self) -> &[[i64; 2]] {
        &self.min_max
    }

    /// The symbol for a table slot, `None` for excluded tiles.
    pub fn symbol(&self, alt: usize, tile: usize) -> Option<&str> {
        self.symbols[alt][tile].as_deref()
    }

    /// The grid the table was built over.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Per-tile alternative selection for one classification buffer;
    /// `None` for excluded tiles. This is the static-mode dispatch index
    /// into `all_functions[alt][tile]`.
    pub fn select(
        &self,
        table: &StrategyTable,
        reduction: crate::options::Reduction,
        buffer: &[u8],
    ) -> Result<Vec<Option<usize>>, ClassificationError> {
        let decisions = tile_decisions(&self.grid, table, reduction, buffer)?;
        Ok(decisions.into_iter().map(|d| d.map(|(alt, _)| alt)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_table_bounds_and_slots() {
        let grid = TileGrid::new(&[10, 10], 4).unwrap();
        let scan = IntegerSet::rectangular(&[10, 10]);
        let table = StaticKernelTable::build(grid, &scan, 2);
        assert_eq!(table.min_max(), &[[0, 9], [0, 9]]);
        assert_eq!(table.symbol(1, 8), Some("a1_8"));
        assert_eq!(table.symbol(0, 0), Some("a0_0"));
    }

    #[test]
    fn test_static_table_excludes_empty_tiles() {
        // monitored region covers only the first 4 cells of a 10-cell row:
        // the grid still has 3 tiles, but tiles past the region get no slot
        let grid = TileGrid::new(&[10], 4).unwrap();
        let scan = IntegerSet::rectangular(&[4]);
        let table = StaticKernelTable::build(grid, &scan, 1);
        assert_eq!(table.symbol(0, 0), Some("a0_0"));
        assert_eq!(table.symbol(0, 1), None);
        assert_eq!(table.symbol(0, 2), None);
    }
}

//! The adaptive-specialization runtime.
//!
//! Everything that runs while the instrumented kernel executes: the tile
//! grid, the monitor-to-alternative classifier, the domain specializer,
//! the external-compiler seam, and the coordinator thread tying them
//! together.

pub mod grid;
pub mod classify;
pub mod specialize;
pub mod compile;
pub mod coordinator;
pub mod data;

pub use grid::TileGrid;
pub use classify::{classify_tiles, tile_decisions, StrategyTable};
pub use specialize::{embed_monitor_set, specialize, SpecializedDomains};
pub use compile::{
    alternative_symbol, monitoring_symbol, tile_symbol,
    AlternativeCompiler, CompiledKernel, SystemCompiler, EXTRA_CFLAGS_VAR,
};
pub use coordinator::{CoordinatorCommand, CoordinatorState, CycleReport};
pub use data::{InstalledFunction, KernelRuntime, MonitoringFn, RuntimeShared, StaticKernelTable};

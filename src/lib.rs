//! # ACR - Adaptive Code Refinement
//!
//! A source-to-source instrumentation tool and runtime for numerical loop
//! kernels annotated with pragma-declared alternatives (cheaper or
//! approximate computations). The runtime monitors the kernel's data,
//! decides per spatial tile of the iteration space which alternative
//! applies, regenerates the loop nest restricted to each alternative's
//! sub-domain, and hot-swaps the compiled result while the kernel keeps
//! running in another thread.
//!
//! ## Architecture
//!
//! ```text
//! scop text -> Scop -> dimension classifier -> tile grid
//!                                                |
//! monitoring buffer -> strategy table -> per-alternative tile unions
//!                                                |
//!                    domain specializer -> code generator -> cc -> dlopen
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use acr::prelude::*;
//!
//! let runtime = KernelRuntime::init(
//!     scop_text,
//!     options,
//!     &[512, 512],
//!     Box::new(|buf| monitor_array(buf)),
//!     Box::new(SystemCompiler::new()),
//! )?;
//! runtime.refine_blocking();
//! let function = runtime.dispatch();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(dead_code)] // During development

pub mod polyhedral;
pub mod scop;
pub mod options;
pub mod instrument;
pub mod runtime;
pub mod codegen;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::polyhedral::{
        AffineExpr, AffineMap, Constraint, ConstraintKind, IntegerSet, SetUnion, Space,
        parse_map, parse_set,
    };
    pub use crate::scop::{Scop, Statement};
    pub use crate::options::{
        Alternative, AlternativeKind, KernelOptions, MonitorSpec, Reduction,
        Selector, Strategy,
    };
    pub use crate::instrument::{classify_dimensions, monitor_scan_domain, DimTag};
    pub use crate::runtime::{
        classify_tiles, specialize, AlternativeCompiler, CompiledKernel,
        CoordinatorState, CycleReport, KernelRuntime, StaticKernelTable,
        StrategyTable, SystemCompiler, TileGrid,
    };
    pub use crate::codegen::{generate_dynamic, generate_monitoring, generate_static};
    pub use crate::utils::errors::*;
}

use anyhow::Result;

/// Parse the embedded textual scop representation.
pub fn parse_scop(text: &str) -> Result<scop::Scop> {
    Ok(scop::Scop::parse(text)?)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

//! Code generation: monitoring scans and specialized kernels.
//!
//! All products are C text compiled against the original translation
//! unit's declarations. The scan and the static table are generated once
//! at build time; the dynamic specialized function is regenerated every
//! classification cycle by the coordinator.

pub mod c;
pub mod scan;
pub mod kernel;

pub use c::{emit_loop_nest, emit_preamble, replace_identifier};
pub use scan::generate_monitoring;
pub use kernel::{
    generate_dynamic, generate_init_stub, generate_static, generate_static_parallel,
};

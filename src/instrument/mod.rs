//! Build-time instrumentation analyses.
//!
//! These passes run once, when the source-to-source tool rewrites the
//! kernel, not per classification cycle.

pub mod dims;

pub use dims::{classify_dimensions, monitor_scan_domain, DimTag, DimensionAnalysis, StatementDims};

//! External compiler invocation and dynamic loading.
//!
//! The coordinator pipes each generated translation unit into the system C
//! compiler as a position-independent shared library, then opens the result
//! and resolves the conventional symbols. The compiler is behind a trait so
//! tests can install a stub; the kernel thread only ever sees fully-loaded
//! [`CompiledKernel`] values.

use crate::utils::errors::ToolchainError;
use libloading::Library;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Environment variable carrying extra compiler flags, colon-separated.
pub const EXTRA_CFLAGS_VAR: &str = "ACR_EXTRA_CFLAGS";

/// Flag used when `ACR_EXTRA_CFLAGS` is unset or malformed.
const DEFAULT_OPT_FLAG: &str = "-O2";

/// Symbol name for the per-cycle specialized function.
pub fn alternative_symbol(prefix: &str) -> String {
    format!("{}_alternative", prefix)
}

/// Symbol name for a static-mode per-(alternative, tile) function.
pub fn tile_symbol(alt: usize, tile: usize) -> String {
    format!("a{}_{}", alt, tile)
}

/// Symbol name for the monitoring scan function.
pub fn monitoring_symbol(prefix: &str) -> String {
    format!("{}_monitoring", prefix)
}

/// The seam between the coordinator and the toolchain.
pub trait AlternativeCompiler: Send {
    /// Compile one generated translation unit into a loadable kernel.
    fn compile(&self, source: &str) -> Result<CompiledKernel, ToolchainError>;
}

/// A fully-built compiled artifact.
///
/// Owns the dynamic library handle; symbols stay valid for as long as any
/// `Arc<CompiledKernel>` is alive, so an in-flight kernel call can keep the
/// previous cycle's artifact referenced while a new one is installed. The
/// temporary shared object is removed when the last reference drops.
#[derive(Debug)]
pub struct CompiledKernel {
    library: Option<Library>,
    path: Option<PathBuf>,
}

impl CompiledKernel {
    /// Open a shared object produced by the external compiler.
    pub fn load(path: PathBuf) -> Result<CompiledKernel, ToolchainError> {
        // Safety: the object was just produced by the system compiler from
        // generated source; loading runs no untrusted initializers beyond
        // what any dlopen of our own artifact would.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            ToolchainError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!("loaded shared object {}", path.display());
        Ok(CompiledKernel { library: Some(library), path: Some(path) })
    }

    /// A library-less kernel for tests and stub compilers.
    pub fn stub() -> CompiledKernel {
        CompiledKernel { library: None, path: None }
    }

    /// Resolve a symbol by name.
    ///
    /// # Safety
    /// The caller must supply the correct function type for the symbol.
    pub unsafe fn symbol<T>(&self, name: &str) -> Result<libloading::Symbol<'_, T>, ToolchainError> {
        let library = self.library.as_ref().ok_or_else(|| ToolchainError::SymbolMissing {
            symbol: name.to_string(),
        })?;
        library.get(name.as_bytes()).map_err(|_| ToolchainError::SymbolMissing {
            symbol: name.to_string(),
        })
    }

    /// Whether the kernel holds a real library handle.
    pub fn is_loaded(&self) -> bool {
        self.library.is_some()
    }
}

impl Drop for CompiledKernel {
    fn drop(&mut self) {
        // close before unlinking
        self.library.take();
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// The real system-compiler invocation.
pub struct SystemCompiler {
    compiler: String,
    extra_flags: Vec<String>,
}

// The environment is read once per process, like the getenv-at-init the
// generated wrappers rely on.
static EXTRA_FLAGS: Lazy<Vec<String>> =
    Lazy::new(|| parse_extra_cflags(env::var(EXTRA_CFLAGS_VAR).ok().as_deref()));

impl SystemCompiler {
    /// Use `cc` (or `$CC`) with flags from `ACR_EXTRA_CFLAGS`.
    pub fn new() -> SystemCompiler {
        let compiler = env::var("CC").unwrap_or_else(|_| "cc".to_string());
        SystemCompiler {
            compiler,
            extra_flags: EXTRA_FLAGS.clone(),
        }
    }

    /// Use a specific compiler binary.
    pub fn with_compiler(compiler: impl Into<String>) -> SystemCompiler {
        SystemCompiler {
            compiler: compiler.into(),
            extra_flags: EXTRA_FLAGS.clone(),
        }
    }
}

impl Default for SystemCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the colon-separated flag list. Segments not shaped like flags are
/// discarded; a value yielding nothing usable falls back to the single
/// default optimization flag.
fn parse_extra_cflags(value: Option<&str>) -> Vec<String> {
    let Some(value) = value else {
        return vec![DEFAULT_OPT_FLAG.to_string()];
    };
    let flags: Vec<String> = value
        .split(':')
        .map(str::trim)
        .filter(|s| s.starts_with('-'))
        .map(str::to_string)
        .collect();
    if flags.is_empty() {
        warn!(
            "{} is set but carries no usable flags; using {}",
            EXTRA_CFLAGS_VAR, DEFAULT_OPT_FLAG
        );
        return vec![DEFAULT_OPT_FLAG.to_string()];
    }
    flags
}

impl AlternativeCompiler for SystemCompiler {
    fn compile(&self, source: &str) -> Result<CompiledKernel, ToolchainError> {
        // Keep the output path alive past compilation; the kernel owns it
        // from here and unlinks it on drop.
        let output = tempfile::Builder::new()
            .prefix("acr_kernel_")
            .suffix(".so")
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| ToolchainError::Io(e.error))?;

        let mut child = Command::new(&self.compiler)
            .arg("-xc")
            .arg("-")
            .arg("-fPIC")
            .arg("-shared")
            .args(&self.extra_flags)
            .arg("-o")
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        let result = child.wait_with_output()?;

        if !result.status.success() {
            let _ = std::fs::remove_file(&output);
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            error!("{} exited with {}: {}", self.compiler, result.status, stderr);
            return Err(ToolchainError::CompilerFailed {
                compiler: self.compiler.clone(),
                stderr,
            });
        }

        CompiledKernel::load(output)
    }
}

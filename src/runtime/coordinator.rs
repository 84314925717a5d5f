//! The runtime coordinator.
//!
//! A long-lived thread driving the monitor -> classify -> generate ->
//! compile -> install cycle while the kernel thread keeps executing
//! through the last-installed function pointer. Commands arrive on a
//! bounded channel (replacing the original condvar hand-off with explicit
//! state-transition messages); completion reports go back on a second
//! channel, giving strict alternation: no two cycles overlap, and kernel
//! execution overlaps only the previous cycle's work.
//!
//! Shutdown: the stop flag is checked at every wait point; a cycle that
//! already started always runs to completion (including the install), so a
//! half-built artifact is never published and never leaked.

use crate::runtime::classify::classify_tiles;
use crate::runtime::compile::AlternativeCompiler;
use crate::runtime::data::{InstalledFunction, MonitoringFn, RuntimeShared};
use crate::runtime::specialize::specialize;
use crate::codegen::kernel::generate_dynamic;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Messages into the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// Run one refinement cycle
    Refine,
    /// Shut down
    Stop,
}

/// Coordinator states, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for a request
    Idle,
    /// Running the monitoring scan
    Monitoring,
    /// Reducing the buffer to per-tile selections
    Classifying,
    /// Specializing domains, generating and compiling code
    Generating,
    /// Publishing the new artifact
    Installing,
    /// Shutting down
    Stopping,
}

/// Outcome of one cycle, reported back to the requester.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Whether a new artifact was installed
    pub installed: bool,
    /// The failure that abandoned the cycle, if any
    pub error: Option<String>,
}

pub(crate) struct Coordinator {
    shared: Arc<RuntimeShared>,
    monitoring: MonitoringFn,
    compiler: Box<dyn AlternativeCompiler>,
    cmd_rx: Receiver<CoordinatorCommand>,
    report_tx: Sender<CycleReport>,
    cycle: u64,
    state: CoordinatorState,
}

impl Coordinator {
    pub(crate) fn new(
        shared: Arc<RuntimeShared>,
        monitoring: MonitoringFn,
        compiler: Box<dyn AlternativeCompiler>,
        cmd_rx: Receiver<CoordinatorCommand>,
        report_tx: Sender<CycleReport>,
    ) -> Coordinator {
        Coordinator {
            shared,
            monitoring,
            compiler,
            cmd_rx,
            report_tx,
            cycle: 0,
            state: CoordinatorState::Idle,
        }
    }

    fn enter(&mut self, state: CoordinatorState) {
        debug!("coordinator `{}`: {:?} -> {:?}", self.shared.prefix, self.state, state);
        self.state = state;
    }

    pub(crate) fn run(mut self) {
        loop {
            self.enter(CoordinatorState::Idle);
            match self.cmd_rx.recv() {
                Ok(CoordinatorCommand::Refine) => {}
                Ok(CoordinatorCommand::Stop) | Err(_) => break,
            }
            if self.shared.stop.load(Ordering::SeqCst) {
                break;
            }
            let report = self.run_cycle();
            // never blocks: the report channel is unbounded
            let _ = self.report_tx.send(report);
            if self.shared.stop.load(Ordering::SeqCst) {
                break;
            }
        }
        self.enter(CoordinatorState::Stopping);
        info!("coordinator `{}` stopped after {} cycles", self.shared.prefix, self.cycle);
    }

    fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let shared = Arc::clone(&self.shared);

        self.enter(CoordinatorState::Monitoring);
        let mut buffer = vec![0u8; shared.grid.total_cells()];
        (self.monitoring)(&mut buffer);
        let buffer = Arc::new(buffer);
        // publish only after the scan wrote every byte
        shared.monitoring_data.store(Some(Arc::clone(&buffer)));

        self.enter(CoordinatorState::Classifying);
        let unions = match classify_tiles(
            &shared.grid,
            &shared.table,
            shared.options.monitor.reduction,
            &buffer,
        ) {
            Ok(unions) => unions,
            Err(e) => {
                error!("cycle {}: {}", cycle, e);
                return CycleReport { cycle, installed: false, error: Some(e.to_string()) };
            }
        };

        self.enter(CoordinatorState::Generating);
        let domains = specialize(&shared.scop, &shared.analysis, &shared.options, &unions);
        let source = {
            // the lock serializes a racing manual trigger against this
            // cycle's domain mutation
            let mut restricted = shared.restricted.lock().unwrap();
            *restricted = Some(domains.clone());
            match generate_dynamic(&shared.scop, &shared.analysis, &shared.options, &domains) {
                Ok(source) => source,
                Err(e) => {
                    error!("cycle {}: {}", cycle, e);
                    return CycleReport { cycle, installed: false, error: Some(e.to_string()) };
                }
            }
        };
        let kernel = match self.compiler.compile(&source) {
            Ok(kernel) => kernel,
            Err(e) => {
                // compile failure abandons the cycle; the previously
                // installed function stays active and no retry happens
                error!("cycle {}: {}", cycle, e);
                return CycleReport { cycle, installed: false, error: Some(e.to_string()) };
            }
        };

        self.enter(CoordinatorState::Installing);
        shared.installed.store(Some(Arc::new(InstalledFunction { cycle, kernel })));
        debug!("cycle {}: new specialized function installed", cycle);
        CycleReport { cycle, installed: true, error: None }
    }
}

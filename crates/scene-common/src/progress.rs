//! Progress reporting and cooperative cancellation.
//!
//! Long-running operations take a `&dyn ProgressMonitor`, report coarse work
//! units and poll [`ProgressMonitor::is_cancelled`] between scan lines, bands,
//! layers or tiles. A cancelled operation returns
//! [`SceneError::UserCancelled`] and discards its partial output.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{SceneError, SceneResult};

/// Receives progress of a long-running task and signals cancellation.
pub trait ProgressMonitor: Send + Sync {
    /// Start a task made of `total_work` units.
    fn begin_task(&self, name: &str, total_work: u32);

    /// Report that `units` more units are finished.
    fn worked(&self, units: u32);

    /// Describe the current step of the task.
    fn set_sub_task_name(&self, _name: &str) {}

    /// Whether the caller asked to abort.
    fn is_cancelled(&self) -> bool;

    /// Finish the task; remaining units count as done.
    fn done(&self);
}

/// Return `UserCancelled` if the monitor was cancelled.
pub fn check_cancelled(pm: &dyn ProgressMonitor) -> SceneResult<()> {
    if pm.is_cancelled() {
        Err(SceneError::UserCancelled)
    } else {
        Ok(())
    }
}

/// Monitor that ignores progress and is never cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressMonitor;

impl ProgressMonitor for NullProgressMonitor {
    fn begin_task(&self, _name: &str, _total_work: u32) {}
    fn worked(&self, _units: u32) {}
    fn is_cancelled(&self) -> bool {
        false
    }
    fn done(&self) {}
}

/// Thread-safe monitor backed by atomics; `cancel()` may be called from any
/// thread while an operation is running.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    total: AtomicU64,
    worked: AtomicU64,
    task: Mutex<String>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Units reported so far.
    pub fn worked_units(&self) -> u64 {
        self.worked.load(Ordering::Relaxed)
    }

    /// Units announced by the last `begin_task`.
    pub fn total_units(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Name of the current task or sub-task.
    pub fn task_name(&self) -> String {
        self.task.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ProgressMonitor for CancelFlag {
    fn begin_task(&self, name: &str, total_work: u32) {
        self.total.store(total_work as u64, Ordering::Relaxed);
        self.worked.store(0, Ordering::Relaxed);
        self.set_sub_task_name(name);
    }

    fn worked(&self, units: u32) {
        self.worked.fetch_add(units as u64, Ordering::Relaxed);
    }

    fn set_sub_task_name(&self, name: &str) {
        if let Ok(mut task) = self.task.lock() {
            *task = name.to_string();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn done(&self) {
        let total = self.total.load(Ordering::Relaxed);
        self.worked.fetch_max(total, Ordering::Relaxed);
    }
}

/// Delegates a budget of `parent_units` of a parent task to a child task.
///
/// Child work is scaled into parent units; cancellation is forwarded.
pub struct SubProgressMonitor<'a> {
    parent: &'a dyn ProgressMonitor,
    parent_units: u32,
    child_total: AtomicU32,
    child_worked: AtomicU32,
    reported: AtomicU32,
}

impl<'a> SubProgressMonitor<'a> {
    pub fn new(parent: &'a dyn ProgressMonitor, parent_units: u32) -> Self {
        Self {
            parent,
            parent_units,
            child_total: AtomicU32::new(0),
            child_worked: AtomicU32::new(0),
            reported: AtomicU32::new(0),
        }
    }

    fn report_up_to(&self, target: u32) {
        let target = target.min(self.parent_units);
        let previous = self.reported.fetch_max(target, Ordering::Relaxed);
        if target > previous {
            self.parent.worked(target - previous);
        }
    }
}

impl ProgressMonitor for SubProgressMonitor<'_> {
    fn begin_task(&self, name: &str, total_work: u32) {
        self.child_total.store(total_work, Ordering::Relaxed);
        self.child_worked.store(0, Ordering::Relaxed);
        self.parent.set_sub_task_name(name);
    }

    fn worked(&self, units: u32) {
        let total = self.child_total.load(Ordering::Relaxed);
        if total == 0 {
            return;
        }
        let done = self.child_worked.fetch_add(units, Ordering::Relaxed) + units;
        let scaled = (done.min(total) as u64 * self.parent_units as u64 / total as u64) as u32;
        self.report_up_to(scaled);
    }

    fn set_sub_task_name(&self, name: &str) {
        self.parent.set_sub_task_name(name);
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }

    fn done(&self) {
        self.report_up_to(self.parent_units);
    }
}

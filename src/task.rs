//! Background group computation.
//!
//! [`ContrastTask::spawn`] moves a [`ContrastRequest`] onto a named worker
//! thread and returns a [`TaskHandle`].  The worker reports
//! [`TaskEvent::Progress`] after every subject and exactly one
//! [`TaskEvent::Finished`] carrying the typed result.  There is no
//! cancellation; a started task runs to completion or failure.
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::contrast::{ContrastRequest, GroupContrast};

#[derive(Debug)]
pub enum TaskEvent {
    Progress { done: usize, total: usize },
    Finished(Result<GroupContrast>),
}

impl TaskEvent {
    /// Percent complete for progress events.
    pub fn percent(&self) -> Option<f64> {
        match self {
            TaskEvent::Progress { done, total } if *total > 0 => {
                Some(*done as f64 / *total as f64 * 100.0)
            }
            _ => None,
        }
    }
}

pub struct ContrastTask;

impl ContrastTask {
    pub fn spawn(cfg: Arc<AnalysisConfig>, request: ContrastRequest) -> Result<TaskHandle> {
        let (tx, rx) = crossbeam_channel::unbounded::<TaskEvent>();
        let join = thread::Builder::new()
            .name("contrast-worker".into())
            .spawn(move || {
                let progress_tx = tx.clone();
                let result = request.run(&cfg, |done, total| {
                    // The handle may already be gone; progress is best-effort.
                    let _ = progress_tx.send(TaskEvent::Progress { done, total });
                });
                if let Err(e) = &result {
                    warn!(error = %format!("{e:#}"), "group contrast failed");
                }
                let _ = tx.send(TaskEvent::Finished(result));
            })
            .context("spawning contrast worker")?;
        Ok(TaskHandle { events: rx, join: Some(join), finished: false })
    }
}

/// Caller side of a running [`ContrastTask`].
pub struct TaskHandle {
    events: Receiver<TaskEvent>,
    join: Option<JoinHandle<()>>,
    finished: bool,
}

impl TaskHandle {
    /// Next pending event, without blocking.
    ///
    /// After the worker has gone away without reporting (it panicked), a
    /// single synthetic `Finished(Err(..))` is returned.
    pub fn try_next(&mut self) -> Option<TaskEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(ev) => {
                if matches!(ev, TaskEvent::Finished(_)) {
                    self.finish();
                }
                Some(ev)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finish();
                Some(TaskEvent::Finished(Err(anyhow!("contrast worker exited without a result"))))
            }
        }
    }

    /// Every event pending right now, ending with `Finished` if it arrived.
    pub fn poll(&mut self) -> Vec<TaskEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Block until the task completes, forwarding progress to `on_progress`.
    pub fn wait_with(mut self, mut on_progress: impl FnMut(usize, usize)) -> Result<GroupContrast> {
        while !self.finished {
            let ev = match self.events.recv() {
                Ok(ev) => ev,
                Err(_) => {
                    self.finish();
                    return Err(anyhow!("contrast worker exited without a result"));
                }
            };
            match ev {
                TaskEvent::Progress { done, total } => on_progress(done, total),
                TaskEvent::Finished(result) => {
                    self.finish();
                    return result;
                }
            }
        }
        Err(anyhow!("task result was already taken"))
    }

    /// Block until the task completes.
    pub fn wait(self) -> Result<GroupContrast> {
        self.wait_with(|_, _| {})
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("contrast worker panicked");
            }
        }
    }
}

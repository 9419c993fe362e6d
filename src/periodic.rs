//! Background task driving sweep passes on a fixed interval.

use crate::emitter::FinalizerEventEmitter;
use crate::error::SweepTaskError;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Stop flag paired with a condvar so the worker wakes promptly on shutdown
/// instead of sleeping out its interval.
struct StopSignal {
    stopped: AtomicBool,
    mutex: Mutex<()>,
    cond: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
        // Taking the mutex orders the store against a worker that is
        // between its flag check and its wait.
        let _lock = self.mutex.lock();
        self.cond.notify_all();
    }

    /// Wait out `interval` or until stop is requested. `true` means the
    /// worker should run another pass.
    fn wait(&self, interval: Duration) -> bool {
        let mut lock = self.mutex.lock();
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        let _ = self.cond.wait_for(&mut lock, interval);
        !self.stopped.load(Ordering::Acquire)
    }
}

/// Runs [`FinalizerEventEmitter::emit_sweep_events`] from a dedicated thread
/// on a fixed interval. Dropping a running task stops and joins it.
pub struct PeriodicSweep {
    emitter: Arc<FinalizerEventEmitter>,
    interval: Duration,
    signal: Arc<StopSignal>,
    worker: Option<JoinHandle<()>>,
}

impl PeriodicSweep {
    pub fn new(emitter: Arc<FinalizerEventEmitter>, interval: Duration) -> Self {
        Self {
            emitter,
            interval,
            signal: Arc::new(StopSignal::new()),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the sweep thread. The first pass runs after one full interval.
    pub fn start(&mut self) -> Result<(), SweepTaskError> {
        if self.worker.is_some() {
            return Err(SweepTaskError::AlreadyRunning);
        }

        let signal = Arc::new(StopSignal::new());
        self.signal = signal.clone();
        let emitter = self.emitter.clone();
        let interval = self.interval;

        let worker = thread::Builder::new()
            .name("finalizer-sweep".to_owned())
            .spawn(move || {
                tracing::debug!(interval_ms = interval.as_millis() as u64, "sweep task started");
                while signal.wait(interval) {
                    emitter.emit_sweep_events();
                }
                tracing::debug!("sweep task stopped");
            })
            .map_err(|e| SweepTaskError::Spawn(e.to_string()))?;

        self.worker = Some(worker);
        Ok(())
    }

    /// Signal the worker and join it. An in-flight pass runs to completion
    /// first.
    pub fn stop(&mut self) -> Result<(), SweepTaskError> {
        let worker = self.worker.take().ok_or(SweepTaskError::NotRunning)?;
        self.signal.request_stop();
        if worker.join().is_err() {
            tracing::warn!("finalizer sweep thread panicked");
        }
        Ok(())
    }
}

impl Drop for PeriodicSweep {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

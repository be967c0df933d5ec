//! Background galvo simulation.
//!
//! [`SimWorker`] moves a [`GalvoSimulator`] onto its own thread so the caller
//! (typically a render loop running at display rate) never blocks on the
//! physics, which runs at tens of kHz of simulated time.
//!
//! Frames are pushed with [`SimWorker::submit_frame()`]. The worker always
//! works on the newest frame it has been given: queued frames that were
//! overtaken are skipped, and a frame being simulated is abandoned as soon as
//! a newer one is submitted. Only fully simulated frames are published, as an
//! immutable `Arc<SimFrame>` snapshot, so readers never see a half-finished
//! trajectory.
//!
//! ```no_run
//! use laser_emu::{GalvoConfig, LaserFrame, SimWorker};
//!
//! let worker = SimWorker::new(GalvoConfig::default());
//! worker.submit_frame(LaserFrame::default())?;
//! if let Some(published) = worker.latest_frame() {
//!     println!("frame #{} has {} points", published.sequence, published.frame.len());
//! }
//! # Ok::<(), laser_emu::Error>(())
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::galvo::{GalvoConfig, GalvoSimulator, SimOutcome};
use crate::types::{LaserFrame, SimFrame};

/// Status updates held for [`SimWorker::update()`]; newer ones are dropped
/// while the queue is full.
pub const STATUS_QUEUE_CAPACITY: usize = 64;

/// Command sent to the worker thread.
#[derive(Debug, Clone)]
enum WorkerCommand {
    /// Simulate a frame, tagged with its submission generation.
    Simulate { frame: LaserFrame, generation: u64 },
    /// Replace the galvo configuration before the next frame.
    Configure(GalvoConfig),
    /// Return the mirrors to rest before the next frame.
    Reset,
    /// Shut the worker down.
    Stop,
}

/// Status update from the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    /// A frame was simulated to the end (or to the step cap) and published.
    Published { sequence: u64, outcome: SimOutcome },
    /// A frame was given up on because a newer one arrived.
    Abandoned { steps: usize },
}

/// A simulated frame as published by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFrame {
    /// Publication counter, starting at 1.
    pub sequence: u64,
    pub frame: Arc<SimFrame>,
    pub outcome: SimOutcome,
}

/// Counters collected from worker status updates by [`SimWorker::update()`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub published: u64,
    pub abandoned: u64,
    pub step_limited: u64,
    pub last_outcome: Option<SimOutcome>,
}

/// State shared between the handle and the worker thread.
#[derive(Debug, Default)]
struct Shared {
    latest: Mutex<Option<PublishedFrame>>,
    /// Bumped on every submission; the worker compares it to the frame it runs.
    generation: AtomicU64,
    /// Sequence number of the most recent publication.
    sequence: AtomicU64,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Option<PublishedFrame>> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) != generation
    }
}

/// Background worker that owns a [`GalvoSimulator`].
///
/// Dropping the worker abandons any in-flight frame and joins the thread.
pub struct SimWorker {
    command_tx: Sender<WorkerCommand>,
    status_rx: Receiver<WorkerStatus>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    stats: WorkerStats,
}

impl SimWorker {
    /// Spawns the worker thread with a fresh simulator.
    pub fn new(config: GalvoConfig) -> Self {
        Self::with_simulator(GalvoSimulator::new(config))
    }

    /// Spawns the worker thread, taking ownership of `simulator`.
    pub fn with_simulator(simulator: GalvoSimulator) -> Self {
        let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
        let (status_tx, status_rx) = mpsc::sync_channel::<WorkerStatus>(STATUS_QUEUE_CAPACITY);
        let shared = Arc::new(Shared::default());

        let shared_for_loop = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            Self::worker_loop(simulator, command_rx, status_tx, shared_for_loop);
        });

        Self {
            command_tx,
            status_rx,
            shared,
            handle: Some(handle),
            stats: WorkerStats::default(),
        }
    }

    /// Queues a frame for simulation (non-blocking).
    ///
    /// Supersedes any frame that is queued or being simulated.
    pub fn submit_frame(&self, frame: LaserFrame) -> Result<()> {
        self.ensure_running()?;
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.send(WorkerCommand::Simulate { frame, generation })
    }

    /// Replaces the galvo configuration, effective from the next frame.
    pub fn configure(&self, config: GalvoConfig) -> Result<()> {
        self.ensure_running()?;
        self.send(WorkerCommand::Configure(config))
    }

    /// Returns the mirrors to rest, effective from the next frame.
    pub fn reset(&self) -> Result<()> {
        self.ensure_running()?;
        self.send(WorkerCommand::Reset)
    }

    /// The most recently published frame, if any. Does not consume it.
    pub fn latest_frame(&self) -> Option<PublishedFrame> {
        self.shared.slot().clone()
    }

    /// Takes the most recently published frame, leaving the slot empty.
    pub fn take_frame(&self) -> Option<PublishedFrame> {
        self.shared.slot().take()
    }

    /// Sequence number of the most recent publication (0 before the first).
    pub fn sequence(&self) -> u64 {
        self.shared.sequence.load(Ordering::Acquire)
    }

    /// Drains status updates from the worker thread into [`stats()`](Self::stats).
    ///
    /// At most [`STATUS_QUEUE_CAPACITY`] updates wait between calls, so the
    /// stats undercount when this is called rarely. [`sequence()`](Self::sequence)
    /// always reflects every publication.
    pub fn update(&mut self) {
        while let Ok(status) = self.status_rx.try_recv() {
            match status {
                WorkerStatus::Published { outcome, .. } => {
                    self.stats.published += 1;
                    if matches!(outcome, SimOutcome::StepLimit { .. }) {
                        self.stats.step_limited += 1;
                    }
                    self.stats.last_outcome = Some(outcome);
                }
                WorkerStatus::Abandoned { .. } => {
                    self.stats.abandoned += 1;
                }
            }
        }
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Checks if the worker thread is still alive.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the worker and waits for the thread to exit.
    ///
    /// Later submissions fail with [`Error::Stopped`].
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // Abandon whatever is in flight so the thread notices the stop quickly.
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let _ = self.command_tx.send(WorkerCommand::Stop);
        if handle.join().is_err() {
            log::warn!("simulation worker panicked");
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::Stopped);
        }
        Ok(())
    }

    fn send(&self, command: WorkerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::disconnected("simulation worker has exited"))
    }

    fn worker_loop(
        mut simulator: GalvoSimulator,
        command_rx: Receiver<WorkerCommand>,
        status_tx: SyncSender<WorkerStatus>,
        shared: Arc<Shared>,
    ) {
        log::debug!("simulation worker started");

        while let Ok(command) = command_rx.recv() {
            // Drain everything queued, keeping only the newest frame.
            let mut pending: Option<(LaserFrame, u64)> = None;
            let mut next = Some(command);
            let mut stop = false;
            while let Some(command) = next.take() {
                match command {
                    WorkerCommand::Simulate { frame, generation } => {
                        if pending.is_some() {
                            log::debug!("skipping superseded frame");
                        }
                        pending = Some((frame, generation));
                    }
                    WorkerCommand::Configure(config) => simulator.set_config(config),
                    WorkerCommand::Reset => simulator.reset(),
                    WorkerCommand::Stop => {
                        stop = true;
                        break;
                    }
                }
                next = match command_rx.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        stop = true;
                        None
                    }
                };
            }
            if stop {
                break;
            }

            let Some((frame, generation)) = pending else {
                continue;
            };

            let simulation = simulator.simulate_until(&frame, || shared.is_superseded(generation));
            if let SimOutcome::Abandoned { steps } = simulation.outcome {
                log::debug!("abandoned frame of {} points after {} steps", frame.len(), steps);
                report(&status_tx, WorkerStatus::Abandoned { steps });
                continue;
            }

            let outcome = simulation.outcome;
            let sequence = {
                let mut slot = shared.slot();
                let sequence = shared.sequence.load(Ordering::Acquire) + 1;
                *slot = Some(PublishedFrame {
                    sequence,
                    frame: Arc::new(simulation.frame),
                    outcome,
                });
                shared.sequence.store(sequence, Ordering::Release);
                sequence
            };
            report(&status_tx, WorkerStatus::Published { sequence, outcome });
        }

        log::debug!("simulation worker stopped");
    }
}

/// Sends a status without blocking the simulation on a slow reader.
fn report(status_tx: &SyncSender<WorkerStatus>, status: WorkerStatus) {
    if let Err(TrySendError::Full(status)) = status_tx.try_send(status) {
        log::trace!("status queue full, dropping {:?}", status);
    }
}

impl Drop for SimWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

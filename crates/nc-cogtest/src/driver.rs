//! Async driver for a test session
//!
//! The driver owns a [`SequenceTest`] inside a tokio task and is its only
//! mutator:
//! - Commands arrive over an mpsc channel and are answered over oneshots
//! - Timed transitions (highlights, settle, next attempt) use one timer slot
//!   keyed to the phase that scheduled it
//! - The observable [`TestView`] is published on a watch channel
//!
//! Leaving a phase replaces or clears its timer. Confirmation, cancellation
//! and dropping every [`DriverHandle`] end the task; no timer fires after
//! that.

use crate::engine::{InputOutcome, Phase, SequenceTest, TestSnapshot, TestSummary};
use crate::error::{DriverError, TestError};
use crate::sequence::{Color, SequenceGenerator};
use async_trait::async_trait;
use nc_core::TimingConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Receives the end of a session
#[async_trait]
pub trait TestObserver: Send + Sync {
    /// Result confirmed with a score in 0..=100
    async fn on_complete(&self, score: u32);

    /// Session abandoned; nothing should be recorded
    async fn on_cancel(&self);
}

/// Final outcome reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Confirmed score, 0..=100
    Completed(u32),
    /// Closed without a score
    Cancelled,
}

/// Observer forwarding outcomes into a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TestOutcome>,
}

impl ChannelObserver {
    /// Create observer and the receiving end
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TestOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TestObserver for ChannelObserver {
    async fn on_complete(&self, score: u32) {
        let _ = self.tx.send(TestOutcome::Completed(score));
    }

    async fn on_cancel(&self) {
        let _ = self.tx.send(TestOutcome::Cancelled);
    }
}

/// What a front end renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestView {
    /// Engine state
    pub snapshot: TestSnapshot,
    /// Pad lit by playback, if any
    pub highlighted: Option<Color>,
    /// Result of the most recent input
    pub last_outcome: Option<InputOutcome>,
    /// Set once the session reaches the result phase
    pub summary: Option<TestSummary>,
}

/// How the driver task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Result confirmed with this score
    Completed(u32),
    /// Session cancelled
    Cancelled,
    /// Every handle dropped before the session ended
    Detached,
}

type Reply<T> = oneshot::Sender<Result<T, TestError>>;

#[derive(Debug)]
enum Command {
    Start(Reply<()>),
    Input(Color, Reply<InputOutcome>),
    Confirm(Reply<u32>),
    Cancel(Reply<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Highlight(usize),
    Dim(usize),
    EnterRecall,
    NextAttempt,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    phase: Phase,
    kind: TimerKind,
    at: Instant,
}

/// Cloneable command side of a running driver
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<TestView>,
}

impl DriverHandle {
    /// Leave the intro
    pub async fn start(&self) -> Result<(), DriverError> {
        self.request(Command::Start).await
    }

    /// Submit one color during recall
    pub async fn input(&self, color: Color) -> Result<InputOutcome, DriverError> {
        self.request(|reply| Command::Input(color, reply)).await
    }

    /// Confirm the result; the observer is notified before this returns
    pub async fn confirm(&self) -> Result<u32, DriverError> {
        self.request(Command::Confirm).await
    }

    /// Cancel the session; the observer is notified before this returns
    pub async fn cancel(&self) -> Result<(), DriverError> {
        self.request(Command::Cancel).await
    }

    /// Subscribe to view updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TestView> {
        self.view.clone()
    }

    /// Latest published view
    #[must_use]
    pub fn view(&self) -> TestView {
        self.view.borrow().clone()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)?.map_err(DriverError::from)
    }
}

/// Join side of a running driver
#[derive(Debug)]
pub struct DriverTask {
    task: JoinHandle<DriverExit>,
}

impl DriverTask {
    /// Wait for the session to end
    pub async fn finished(self) -> Result<DriverExit, DriverError> {
        Ok(self.task.await?)
    }

    /// Check if the task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the session down immediately
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn a driver for `engine` on the current runtime
pub fn spawn<G, O>(engine: SequenceTest<G>, timing: TimingConfig, observer: Arc<O>) -> (DriverHandle, DriverTask)
where
    G: SequenceGenerator + 'static,
    O: TestObserver + ?Sized + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(16);
    let (view_tx, view_rx) = watch::channel(TestView {
        snapshot: engine.snapshot(),
        highlighted: None,
        last_outcome: None,
        summary: None,
    });

    let driver = Driver {
        engine,
        timing,
        observer,
        commands: commands_rx,
        view: view_tx,
        timer: None,
        anchor: Instant::now(),
        highlighted: None,
        last_outcome: None,
    };
    let task = tokio::spawn(driver.run());

    (
        DriverHandle {
            commands: commands_tx,
            view: view_rx,
        },
        DriverTask { task },
    )
}

struct Driver<G, O: ?Sized> {
    engine: SequenceTest<G>,
    timing: TimingConfig,
    observer: Arc<O>,
    commands: mpsc::Receiver<Command>,
    view: watch::Sender<TestView>,
    timer: Option<Timer>,
    /// Start of the current playback
    anchor: Instant,
    highlighted: Option<Color>,
    last_outcome: Option<InputOutcome>,
}

impl<G, O> Driver<G, O>
where
    G: SequenceGenerator,
    O: TestObserver + ?Sized,
{
    async fn run(mut self) -> DriverExit {
        loop {
            let deadline = self.timer.map(|t| t.at);
            tokio::select! {
                biased;
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!(session = %self.engine.id(), "all handles dropped");
                        return DriverExit::Detached;
                    };
                    if let Some(exit) = self.handle(command).await {
                        return exit;
                    }
                }
                () = sleep_until(deadline) => self.fire(),
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Option<DriverExit> {
        match command {
            Command::Start(reply) => {
                let result = self.engine.start().map(|_| ());
                if result.is_ok() {
                    self.last_outcome = None;
                    self.begin_playback();
                }
                self.publish();
                let _ = reply.send(result);
                None
            }
            Command::Input(color, reply) => {
                let result = self.engine.input(color);
                if let Ok(outcome) = result {
                    self.last_outcome = Some(outcome);
                    if outcome.awaits_next_attempt() {
                        self.schedule(TimerKind::NextAttempt, Instant::now() + self.timing.next_attempt());
                    } else if outcome.ends_test() {
                        self.timer = None;
                    }
                }
                self.publish();
                let _ = reply.send(result);
                None
            }
            Command::Confirm(reply) => match self.engine.confirm() {
                Ok(score) => {
                    self.timer = None;
                    self.publish();
                    self.observer.on_complete(score).await;
                    let _ = reply.send(Ok(score));
                    Some(DriverExit::Completed(score))
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                    None
                }
            },
            Command::Cancel(reply) => match self.engine.cancel() {
                Ok(()) => {
                    self.timer = None;
                    self.highlighted = None;
                    self.publish();
                    self.observer.on_cancel().await;
                    let _ = reply.send(Ok(()));
                    Some(DriverExit::Cancelled)
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                    None
                }
            },
        }
    }

    fn fire(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        if timer.phase != self.engine.phase() {
            debug!(session = %self.engine.id(), kind = ?timer.kind, "stale timer dropped");
            return;
        }

        let len = self.engine.sequence().len();
        match timer.kind {
            TimerKind::Highlight(index) => {
                self.highlighted = self.engine.sequence().get(index).copied();
                let off = self.anchor + steps(self.timing.step(), index + 1) + self.timing.pulse();
                self.schedule(TimerKind::Dim(index), off);
            }
            TimerKind::Dim(index) => {
                self.highlighted = None;
                if index + 1 < len {
                    let next = self.anchor + steps(self.timing.step(), index + 2);
                    self.schedule(TimerKind::Highlight(index + 1), next);
                } else {
                    self.schedule_recall(len);
                }
            }
            TimerKind::EnterRecall => {
                if let Err(err) = self.engine.finish_playback() {
                    warn!(session = %self.engine.id(), %err, "playback could not finish");
                }
            }
            TimerKind::NextAttempt => match self.engine.begin_attempt() {
                Ok(_) => {
                    self.last_outcome = None;
                    self.begin_playback();
                }
                Err(err) => warn!(session = %self.engine.id(), %err, "next attempt could not start"),
            },
        }
        self.publish();
    }

    /// Element `i` lights at `anchor + (i + 1) * step` for one pulse; recall
    /// opens one step after the last element plus the settle delay.
    fn begin_playback(&mut self) {
        self.anchor = Instant::now();
        self.highlighted = None;
        if self.engine.sequence().is_empty() {
            self.schedule_recall(0);
        } else {
            self.schedule(TimerKind::Highlight(0), self.anchor + self.timing.step());
        }
    }

    fn schedule_recall(&mut self, len: usize) {
        let at = self.anchor + steps(self.timing.step(), len + 1) + self.timing.settle();
        self.schedule(TimerKind::EnterRecall, at);
    }

    fn schedule(&mut self, kind: TimerKind, at: Instant) {
        self.timer = Some(Timer {
            phase: self.engine.phase(),
            kind,
            at,
        });
    }

    fn publish(&self) {
        let view = TestView {
            snapshot: self.engine.snapshot(),
            highlighted: self.highlighted,
            last_outcome: self.last_outcome,
            summary: self.engine.summary(),
        };
        self.view.send_replace(view);
    }
}

fn steps(step: Duration, n: usize) -> Duration {
    step.saturating_mul(u32::try_from(n).unwrap_or(u32::MAX))
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

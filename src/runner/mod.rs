//! Repeated invocation of a unit of work with bounded concurrency.
//!
//! Each iteration hands `concurrency` copies of the work to a worker pool and
//! waits for all of them before sleeping `delay` and starting the next one.
//! The loop ends after `max_count` iterations or when the controller's
//! interrupt flag is raised, then prints a timing summary.
//!
//! ```text
//! Idle -> Running -> StoppedByCount | StoppedByInterrupt -> Reporting -> Done
//! ```

mod pool;
mod work;

pub use pool::{Job, WorkerPool};
pub use work::{Action, ActionRegistry, WorkDescriptor};

use crate::debug::DebugHook;
use crate::util::panic_message;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// How often waiting and sleeping check the interrupt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("Count must be at least 1 (got {0})")]
    InvalidCount(u64),
    #[error("Delay must be greater than 0 (got {0})")]
    InvalidDelay(f64),
    #[error("worker pool failed: {0}")]
    Pool(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Validated loop parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    delay: Duration,
    max_count: Option<u64>,
    concurrency: usize,
}

impl LoopConfig {
    pub fn new(
        delay_secs: f64,
        max_count: Option<u64>,
        concurrency: usize,
    ) -> Result<Self, RunnerError> {
        if concurrency < 1 {
            return Err(RunnerError::InvalidConcurrency(concurrency));
        }
        if let Some(count) = max_count
            && count < 1
        {
            return Err(RunnerError::InvalidCount(count));
        }
        if !delay_secs.is_finite() || delay_secs <= 0.0 {
            return Err(RunnerError::InvalidDelay(delay_secs));
        }
        let delay = Duration::try_from_secs_f64(delay_secs)
            .map_err(|_| RunnerError::InvalidDelay(delay_secs))?;

        Ok(Self {
            delay,
            max_count,
            concurrency,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_count(&self) -> Option<u64> {
        self.max_count
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Running,
    StoppedByCount,
    StoppedByInterrupt,
    Reporting,
    Done,
}

/// Mutable state of one run, owned by the controller.
#[derive(Debug)]
pub struct LoopState {
    pub phase: LoopPhase,
    pub iteration_count: u64,
    pub start_time: Instant,
}

impl LoopState {
    fn new() -> Self {
        Self {
            phase: LoopPhase::Idle,
            iteration_count: 0,
            start_time: Instant::now(),
        }
    }

    fn enter(&mut self, phase: LoopPhase) {
        debug!("Loop phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} after {} iterations, {:.2} secs",
            self.phase,
            self.iteration_count,
            self.start_time.elapsed().as_secs_f64()
        )
    }
}

/// Final accounting of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub iterations: u64,
    pub concurrency: usize,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl LoopReport {
    pub fn runs(&self) -> u64 {
        self.iterations * self.concurrency as u64
    }
}

impl fmt::Display for LoopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        write!(
            f,
            "Looped {} time{} in {:.2} secs",
            self.iterations,
            if self.iterations > 1 { "s" } else { "" },
            secs
        )?;

        if self.concurrency > 1 {
            write!(
                f,
                " with concurrency of {} ({} runs",
                self.concurrency,
                self.runs()
            )?;
            if self.iterations > 0 {
                let per_loop = secs / self.iterations as f64;
                write!(
                    f,
                    ", {:.2} secs per loop, {:.2} secs per run",
                    per_loop,
                    per_loop / self.concurrency as f64
                )?;
            }
            f.write_str(")")?;
        }

        Ok(())
    }
}

enum IterationOutcome {
    Completed,
    Interrupted,
}

/// Drives the loop from the calling thread.
pub struct RepeatRunner {
    work: WorkDescriptor,
    config: LoopConfig,
    actions: Arc<ActionRegistry>,
}

impl RepeatRunner {
    pub fn new(work: WorkDescriptor, config: LoopConfig, actions: Arc<ActionRegistry>) -> Self {
        Self {
            work,
            config,
            actions,
        }
    }

    /// Runs until the count is reached or `interrupted` is set.
    ///
    /// Invocation failures are written to `out` and do not stop the loop.
    /// The summary line is written to `out` before returning.
    pub fn run(
        &self,
        interrupted: &AtomicBool,
        debug_hook: Option<&DebugHook>,
        out: &mut impl Write,
    ) -> Result<LoopReport, RunnerError> {
        let pool = WorkerPool::new(self.config.concurrency).map_err(RunnerError::Pool)?;
        let mut state = LoopState::new();
        state.enter(LoopPhase::Running);

        loop {
            if interrupted.load(Ordering::SeqCst) {
                state.enter(LoopPhase::StoppedByInterrupt);
                break;
            }
            if let Some(hook) = debug_hook {
                hook.poll(&state);
            }

            match self.run_iteration(&pool, interrupted, debug_hook, &state, out)? {
                IterationOutcome::Completed => state.iteration_count += 1,
                IterationOutcome::Interrupted => {
                    state.enter(LoopPhase::StoppedByInterrupt);
                    break;
                }
            }

            if self
                .config
                .max_count
                .is_some_and(|max| state.iteration_count >= max)
            {
                state.enter(LoopPhase::StoppedByCount);
                break;
            }

            if !sleep_unless_interrupted(self.config.delay, interrupted, debug_hook, &state) {
                state.enter(LoopPhase::StoppedByInterrupt);
                break;
            }
        }

        let interrupted_run = state.phase == LoopPhase::StoppedByInterrupt;
        pool.shutdown();

        state.enter(LoopPhase::Reporting);
        let report = LoopReport {
            iterations: state.iteration_count,
            concurrency: self.config.concurrency,
            elapsed: state.start_time.elapsed(),
            interrupted: interrupted_run,
        };
        writeln!(out, "\n{}", report).map_err(RunnerError::Output)?;
        state.enter(LoopPhase::Done);

        Ok(report)
    }

    fn run_iteration(
        &self,
        pool: &WorkerPool,
        interrupted: &AtomicBool,
        debug_hook: Option<&DebugHook>,
        state: &LoopState,
        out: &mut impl Write,
    ) -> Result<IterationOutcome, RunnerError> {
        let (tx, rx) = mpsc::channel::<Result<(), String>>();

        for _ in 0..self.config.concurrency {
            let tx = tx.clone();
            let work = self.work.clone();
            let actions = Arc::clone(&self.actions);
            pool.execute(Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| work.invoke(&actions)))
                    .unwrap_or_else(|payload| Err(panic_message(payload)));
                // The controller may have stopped listening after an interrupt
                let _ = tx.send(outcome);
            }))
            .map_err(RunnerError::Pool)?;
        }
        drop(tx);

        let mut pending = self.config.concurrency;
        while pending > 0 {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(())) => pending -= 1,
                Ok(Err(message)) => {
                    writeln!(out, "{}", message).map_err(RunnerError::Output)?;
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if interrupted.load(Ordering::SeqCst) {
                        return Ok(IterationOutcome::Interrupted);
                    }
                    if let Some(hook) = debug_hook {
                        hook.poll(state);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(IterationOutcome::Completed)
    }
}

/// Sleeps in short slices. Returns `false` if interrupted meanwhile.
fn sleep_unless_interrupted(
    delay: Duration,
    interrupted: &AtomicBool,
    debug_hook: Option<&DebugHook>,
    state: &LoopState,
) -> bool {
    let mut remaining = delay;
    while remaining > Duration::ZERO {
        if interrupted.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(hook) = debug_hook {
            hook.poll(state);
        }
        let slice = remaining.min(POLL_INTERVAL);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    !interrupted.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_actions(calls: &Arc<AtomicUsize>) -> Arc<ActionRegistry> {
        let mut actions = ActionRegistry::new();
        let counter = Arc::clone(calls);
        actions.register("test:count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        actions.register("test:fail", || Err("boom".to_string()));
        actions.register("test:panic", || panic!("exploded"));
        Arc::new(actions)
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            LoopConfig::new(1.0, None, 0),
            Err(RunnerError::InvalidConcurrency(0))
        ));
        assert!(matches!(
            LoopConfig::new(1.0, Some(0), 1),
            Err(RunnerError::InvalidCount(0))
        ));
        assert!(matches!(
            LoopConfig::new(0.0, None, 1),
            Err(RunnerError::InvalidDelay(_))
        ));
        assert!(matches!(
            LoopConfig::new(-1.0, None, 1),
            Err(RunnerError::InvalidDelay(_))
        ));
        assert!(matches!(
            LoopConfig::new(f64::NAN, None, 1),
            Err(RunnerError::InvalidDelay(_))
        ));
        // Finite but beyond what a Duration can hold
        assert!(matches!(
            LoopConfig::new(1e300, None, 1),
            Err(RunnerError::InvalidDelay(_))
        ));

        let config = LoopConfig::new(0.5, Some(3), 2).unwrap();
        assert_eq!(config.delay(), Duration::from_millis(500));
        assert_eq!(config.max_count(), Some(3));
        assert_eq!(config.concurrency(), 2);
    }

    #[test]
    fn test_runs_max_count_iterations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:count"),
            LoopConfig::new(0.01, Some(4), 1).unwrap(),
            counting_actions(&calls),
        );
        let mut out = Vec::new();

        let report = runner.run(&AtomicBool::new(false), None, &mut out).unwrap();

        assert_eq!(report.iterations, 4);
        assert!(!report.interrupted);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\nLooped 4 times in "));
        assert!(!text.contains("concurrency"));
    }

    #[test]
    fn test_concurrency_multiplies_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:count"),
            LoopConfig::new(0.01, Some(2), 3).unwrap(),
            counting_actions(&calls),
        );
        let mut out = Vec::new();

        let report = runner.run(&AtomicBool::new(false), None, &mut out).unwrap();

        assert_eq!(report.runs(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Looped 2 times"));
        assert!(text.contains("with concurrency of 3 (6 runs"));
        assert!(text.contains("secs per run)"));
    }

    #[test]
    fn test_single_iteration_wording() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:count"),
            LoopConfig::new(0.01, Some(1), 1).unwrap(),
            counting_actions(&calls),
        );
        let mut out = Vec::new();

        runner.run(&AtomicBool::new(false), None, &mut out).unwrap();

        assert!(String::from_utf8(out).unwrap().contains("Looped 1 time in "));
    }

    #[test]
    fn test_failures_do_not_stop_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let actions = counting_actions(&calls);
        let mut out = Vec::new();

        let failing = RepeatRunner::new(
            WorkDescriptor::parse("test:fail"),
            LoopConfig::new(0.01, Some(3), 2).unwrap(),
            Arc::clone(&actions),
        );
        let report = failing.run(&AtomicBool::new(false), None, &mut out).unwrap();
        assert_eq!(report.iterations, 3);

        let panicking = RepeatRunner::new(
            WorkDescriptor::parse("test:panic"),
            LoopConfig::new(0.01, Some(2), 1).unwrap(),
            actions,
        );
        let report = panicking.run(&AtomicBool::new(false), None, &mut out).unwrap();
        assert_eq!(report.iterations, 2);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("boom\n").count(), 6);
        assert_eq!(text.matches("exploded\n").count(), 2);
    }

    #[test]
    fn test_interrupt_before_start() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:count"),
            LoopConfig::new(0.01, None, 2).unwrap(),
            counting_actions(&calls),
        );
        let mut out = Vec::new();

        let report = runner.run(&AtomicBool::new(true), None, &mut out).unwrap();

        assert!(report.interrupted);
        assert_eq!(report.iterations, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Looped 0 time in "));
        assert!(text.contains("with concurrency of 2 (0 runs)"));
    }

    #[test]
    fn test_interrupt_during_sleep() {
        let calls = Arc::new(AtomicUsize::new(0));
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let counter = Arc::clone(&calls);
        let mut actions = ActionRegistry::new();
        actions.register("test:stop", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:stop"),
            LoopConfig::new(60.0, None, 1).unwrap(),
            Arc::new(actions),
        );
        let mut out = Vec::new();

        let report = runner.run(&interrupted, None, &mut out).unwrap();

        assert!(report.interrupted);
        assert_eq!(report.iterations, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(report.elapsed < Duration::from_secs(60));
    }

    #[test]
    fn test_interrupt_during_iteration_abandons_it() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let mut actions = ActionRegistry::new();
        actions.register("test:slow", move || {
            flag.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            Err("late failure".to_string())
        });
        let runner = RepeatRunner::new(
            WorkDescriptor::parse("test:slow"),
            LoopConfig::new(0.01, Some(5), 1).unwrap(),
            Arc::new(actions),
        );
        let mut out = Vec::new();

        let report = runner.run(&interrupted, None, &mut out).unwrap();

        assert!(report.interrupted);
        assert_eq!(report.iterations, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("late failure"));
        assert!(text.contains("Looped 0 time in "));
    }

    #[test]
    fn test_report_display() {
        let report = LoopReport {
            iterations: 10,
            concurrency: 5,
            elapsed: Duration::from_secs(5),
            interrupted: false,
        };

        assert_eq!(
            report.to_string(),
            "Looped 10 times in 5.00 secs with concurrency of 5 (50 runs, 0.50 secs per loop, 0.10 secs per run)"
        );
    }
}

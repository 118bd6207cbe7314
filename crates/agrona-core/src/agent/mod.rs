//! Duty-cycle agent runtime: a small contract for "do a bounded unit of
//! work, report how much, repeat" loops, plus a dedicated-thread runner and
//! a non-threaded invoker for embedding the same agent cooperatively.
//!
//! Built on plain `std::thread::spawn` (no async runtime pulled in for this)
//! and a single-start CAS gate in the style of a producer-registration check:
//! a plain `compare_exchange` since there is exactly one slot rather than a
//! counted pool.

mod composite;

pub use composite::{CompositeAgent, DynamicCompositeAgent};

use crate::error::AgentError;
use crate::handler::{AtomicCounter, ErrorHandler, NoOpErrorHandler};
use crate::idle::IdleStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// One duty-cycle unit: do a bounded amount of work, report how much.
///
/// `do_work` returning `Ok(0)` tells the idle strategy nothing happened this
/// cycle; returning `Err(AgentError::Terminal)` asks the host (runner or
/// invoker) to end the duty cycle cleanly, without treating it as a fault.
pub trait Agent: Send {
    /// Runs once before the first `do_work`. The default does nothing.
    fn on_start(&mut self) -> Result<(), AgentError> {
        Ok(())
    }

    /// Performs one bounded unit of work, returning how much was done.
    fn do_work(&mut self) -> Result<usize, AgentError>;

    /// Runs once after the duty cycle ends, exactly once regardless of how
    /// many times the host attempts to close. The default does nothing.
    fn on_close(&mut self) -> Result<(), AgentError> {
        Ok(())
    }

    /// A short, stable name for logs and composite role names.
    fn role_name(&self) -> &str;
}

struct Shared<A, H> {
    agent: Mutex<A>,
    error_handler: H,
    error_counter: Option<AtomicCounter>,
    running: AtomicBool,
    started: AtomicBool,
    closing: AtomicBool,
}

impl<A: Agent, H: ErrorHandler> Shared<A, H> {
    fn report(&self, error: AgentError) {
        if let AgentError::Terminal = error {
            return;
        }
        self.error_handler.on_error(&error);
        if let Some(counter) = &self.error_counter {
            counter.increment();
        }
    }

    /// Runs `agent.on_close()` exactly once across however many callers
    /// (the worker thread at natural loop exit, and/or `AgentRunner::close`)
    /// race to invoke it.
    fn run_close_once(&self) {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let mut agent = self.agent.lock().expect("agent mutex poisoned");
            if let Err(e) = agent.on_close() {
                self.report(e);
            }
        }
    }
}

/// Owns exactly one thread dedicated to one [`Agent`]: spawns it on
/// [`AgentRunner::start`], idles between `do_work` calls per the configured
/// [`IdleStrategy`], and routes non-terminal errors to an [`ErrorHandler`]
/// plus an optional [`AtomicCounter`].
pub struct AgentRunner<A: Agent + 'static, I: IdleStrategy + 'static, H: ErrorHandler + 'static = NoOpErrorHandler> {
    shared: Arc<Shared<A, H>>,
    idle_strategy: Option<I>,
    handle: Option<JoinHandle<()>>,
}

impl<A: Agent + 'static, I: IdleStrategy + 'static> AgentRunner<A, I, NoOpErrorHandler> {
    /// Creates a runner with a silent [`NoOpErrorHandler`] and no error counter.
    #[must_use]
    pub fn new(agent: A, idle_strategy: I) -> Self {
        Self::with_error_handler(agent, idle_strategy, NoOpErrorHandler, None)
    }
}

impl<A: Agent + 'static, I: IdleStrategy + 'static, H: ErrorHandler + 'static> AgentRunner<A, I, H> {
    /// Creates a runner with an explicit [`ErrorHandler`] and optional shared
    /// error counter.
    #[must_use]
    pub fn with_error_handler(agent: A, idle_strategy: I, error_handler: H, error_counter: Option<AtomicCounter>) -> Self {
        Self {
            shared: Arc::new(Shared {
                agent: Mutex::new(agent),
                error_handler,
                error_counter,
                running: AtomicBool::new(false),
                started: AtomicBool::new(false),
                closing: AtomicBool::new(false),
            }),
            idle_strategy: Some(idle_strategy),
            handle: None,
        }
    }

    /// Spawns the worker thread. Returns `false` without spawning anything
    /// if this runner has already been started (the single-start
    /// invariant — a second `start()` is a no-op, not an error).
    pub fn start(&mut self) -> bool {
        if self
            .shared
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let mut idle_strategy = self
            .idle_strategy
            .take()
            .expect("idle strategy only taken once, guarded by the started CAS above");
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let thread_name = {
            let agent = shared.agent.lock().expect("agent mutex poisoned");
            format!("agent-runner-{}", agent.role_name())
        };

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                {
                    let mut agent = shared.agent.lock().expect("agent mutex poisoned");
                    if let Err(e) = agent.on_start() {
                        drop(agent);
                        shared.running.store(false, Ordering::Release);
                        shared.report(e);
                        shared.run_close_once();
                        return;
                    }
                }

                while shared.running.load(Ordering::Acquire) {
                    let result = {
                        let mut agent = shared.agent.lock().expect("agent mutex poisoned");
                        agent.do_work()
                    };
                    match result {
                        Ok(work_count) => idle_strategy.idle(work_count),
                        Err(AgentError::Terminal) => break,
                        Err(e) => shared.report(e),
                    }
                }

                shared.running.store(false, Ordering::Release);
                shared.run_close_once();
            })
            .expect("failed to spawn agent runner thread");

        self.handle = Some(handle);
        true
    }

    /// Stops the duty cycle, joins the worker thread, and ensures
    /// `agent.on_close()` has run exactly once before returning.
    pub fn close(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.shared.run_close_once();
    }

    /// Total errors observed so far, if this runner was given an [`AtomicCounter`].
    #[must_use]
    pub fn error_count(&self) -> Option<i64> {
        self.shared.error_counter.as_ref().map(AtomicCounter::get)
    }

    /// Whether the worker thread is currently looping.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl<A: Agent + 'static, I: IdleStrategy + 'static, H: ErrorHandler + 'static> Drop for AgentRunner<A, I, H> {
    fn drop(&mut self) {
        if self.shared.started.load(Ordering::Acquire) {
            self.close();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvokerState {
    Init,
    Running,
    Closed,
}

/// A non-threaded host for an [`Agent`]: the caller's own thread invokes
/// `do_work` via [`AgentInvoker::invoke`], for cooperative embedding where a
/// dedicated thread per agent is not wanted. Not thread-safe.
pub struct AgentInvoker<A: Agent, H: ErrorHandler = NoOpErrorHandler> {
    agent: A,
    error_handler: H,
    error_counter: Option<AtomicCounter>,
    state: InvokerState,
}

impl<A: Agent> AgentInvoker<A, NoOpErrorHandler> {
    /// Creates an invoker with a silent [`NoOpErrorHandler`] and no error counter.
    #[must_use]
    pub fn new(agent: A) -> Self {
        Self::with_error_handler(agent, NoOpErrorHandler, None)
    }
}

impl<A: Agent, H: ErrorHandler> AgentInvoker<A, H> {
    /// Creates an invoker with an explicit [`ErrorHandler`] and optional
    /// shared error counter.
    #[must_use]
    pub fn with_error_handler(agent: A, error_handler: H, error_counter: Option<AtomicCounter>) -> Self {
        Self {
            agent,
            error_handler,
            error_counter,
            state: InvokerState::Init,
        }
    }

    fn report(&self, error: AgentError) {
        if let AgentError::Terminal = error {
            return;
        }
        self.error_handler.on_error(&error);
        if let Some(counter) = &self.error_counter {
            counter.increment();
        }
    }

    /// Runs `agent.on_start()` once, transitioning `Init -> Running`. A
    /// second call is a no-op.
    ///
    /// # Errors
    /// Propagates `on_start`'s error; the invoker moves straight to `Closed`
    /// without ever reaching `Running`.
    pub fn start(&mut self) -> Result<(), AgentError> {
        if self.state != InvokerState::Init {
            return Ok(());
        }
        match self.agent.on_start() {
            Ok(()) => {
                self.state = InvokerState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = InvokerState::Closed;
                Err(e)
            }
        }
    }

    /// Calls `agent.do_work()` if `Running`, returning the work count (`0`
    /// if not running). A terminal result closes the invoker; any other
    /// error is routed to the [`ErrorHandler`] and counted.
    pub fn invoke(&mut self) -> usize {
        if self.state != InvokerState::Running {
            return 0;
        }
        match self.agent.do_work() {
            Ok(count) => count,
            Err(AgentError::Terminal) => {
                self.close();
                0
            }
            Err(e) => {
                self.report(e);
                0
            }
        }
    }

    /// Runs `agent.on_close()` at most once, transitioning to `Closed`.
    pub fn close(&mut self) {
        if self.state == InvokerState::Closed {
            return;
        }
        self.state = InvokerState::Closed;
        if let Err(e) = self.agent.on_close() {
            self.report(e);
        }
    }

    /// Shared access to the hosted agent, e.g. for inspection between invokes.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Exclusive access to the hosted agent.
    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idle::NoOpIdleStrategy;
    use std::sync::atomic::AtomicUsize;

    struct CountingAgent {
        calls: Arc<AtomicUsize>,
        terminate_after: usize,
    }

    impl Agent for CountingAgent {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.terminate_after {
                return Err(AgentError::Terminal);
            }
            Ok(1)
        }
        fn role_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn runner_starts_once_and_reaches_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut runner = AgentRunner::new(
            CountingAgent {
                calls: Arc::clone(&calls),
                terminate_after: 5,
            },
            NoOpIdleStrategy,
        );
        assert!(runner.start());
        assert!(!runner.start(), "second start() must be a no-op");
        runner.close();
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }

    struct FailingAgent {
        error_counter_check: Arc<AtomicUsize>,
    }
    impl Agent for FailingAgent {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            self.error_counter_check.fetch_add(1, Ordering::SeqCst);
            if self.error_counter_check.load(Ordering::SeqCst) > 3 {
                return Err(AgentError::Terminal);
            }
            Err(AgentError::Other(Box::new(std::io::Error::other("boom"))))
        }
        fn role_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn runner_routes_non_terminal_errors_to_counter() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = AtomicCounter::new();
        let mut runner = AgentRunner::with_error_handler(
            FailingAgent {
                error_counter_check: Arc::clone(&seen),
            },
            NoOpIdleStrategy,
            NoOpErrorHandler,
            Some(counter),
        );
        runner.start();
        runner.close();
        assert!(runner.error_count().unwrap() >= 1);
    }

    struct OnceAgent;
    impl Agent for OnceAgent {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            Ok(0)
        }
        fn role_name(&self) -> &str {
            "once"
        }
    }

    #[test]
    fn invoker_runs_start_then_invoke_then_close() {
        let mut invoker = AgentInvoker::new(OnceAgent);
        invoker.start().unwrap();
        assert_eq!(invoker.invoke(), 0);
        invoker.close();
        invoker.close(); // idempotent
    }

    struct TerminalOnFirstInvoke;
    impl Agent for TerminalOnFirstInvoke {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            Err(AgentError::Terminal)
        }
        fn role_name(&self) -> &str {
            "terminal-first"
        }
    }

    #[test]
    fn invoker_closes_itself_on_terminal() {
        let mut invoker = AgentInvoker::new(TerminalOnFirstInvoke);
        invoker.start().unwrap();
        invoker.invoke();
        assert_eq!(invoker.invoke(), 0, "invoke after self-close must no-op");
    }
}

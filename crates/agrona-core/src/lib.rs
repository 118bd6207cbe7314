//! Lock-free concurrency and shared-memory primitives: an ordered-access byte
//! buffer, bounded SPSC/MPSC/MPMC queues, a single-writer broadcast buffer, a
//! duty-cycle agent runtime, idle strategies, clocks and a Snowflake-style id
//! generator, and a cross-process liveness marker file.
//!
//! Every primitive here picks its own memory-ordering explicitly rather than
//! hiding behind a single default; callers choose plain, opaque (relaxed),
//! acquire/release, or sequentially-consistent access by the method they
//! call.
//!
//! # Example
//!
//! ```
//! use agrona_core::config::Config;
//! use agrona_core::queue::Spsc;
//!
//! let queue: Spsc<u64> = Spsc::new(Config::new(4, 1, false));
//! assert!(queue.offer(42));
//! assert_eq!(queue.poll(), Some(42));
//! ```

pub mod agent;
pub mod broadcast;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod idle;
#[cfg(feature = "mmap")]
pub mod markfile;
pub mod queue;

pub use agent::{Agent, AgentInvoker, AgentRunner, CompositeAgent, DynamicCompositeAgent};
pub use buffer::AtomicBuffer;
pub use error::{AgentError, BroadcastError, BufferError, MarkFileError, QueueError, SnowflakeError};
pub use handler::{AtomicCounter, ControlledAction, ControlledMessageHandler, ErrorHandler, MessageHandler, NoOpErrorHandler};
pub use idle::{
    BackoffIdleStrategy, BusySpinIdleStrategy, ControllableIdleStrategy, ControlledStatus, IdleStrategy, NoOpIdleStrategy,
    SleepingIdleStrategy, YieldingIdleStrategy,
};
pub use queue::{Metrics, MetricsSnapshot, Mpmc, Mpsc, Producer, Reservation, Spsc};

#[cfg(feature = "mmap")]
pub use markfile::{ExistencePolicy, MarkFile};

//! Bounded array queues: SPSC, MPSC and MPMC variants over a shared
//! capacity/metrics model, each picking the cheapest synchronization its
//! producer/consumer cardinality allows.

mod common;
mod mpmc;
mod mpsc;
mod spsc;

pub use common::{Metrics, MetricsSnapshot};
pub use mpmc::Mpmc;
pub use mpsc::{Mpsc, Producer};
pub use spsc::{Reservation, Spsc};

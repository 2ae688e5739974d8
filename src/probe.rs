//! Probe Layer
//!
//! Single reachability checks against one host. Each probe spawns the
//! system `ping` tool once and extracts latency and packet loss from its
//! output.
//!
//! # Architecture
//!
//! - [`Prober`]: Core trait for implementing reachability checks
//! - [`Dialect`]: Platform-specific output parser, chosen once at startup
//! - [`PingProber`]: Production prober backed by `ping -c 1` / `ping -n 1`
//!
//! # Example
//!
//! ```rust,no_run
//! use connwatch::probe::{PingProber, Prober};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let prober = PingProber::new().with_timeout(Duration::from_secs(2));
//! match prober.probe("8.8.8.8").await {
//!     Ok(metrics) => println!("{} ms", metrics.latency_ms),
//!     Err(e) => println!("unreachable: {e}"),
//! }
//! # }
//! ```

mod dialect;
mod ping;
mod traits;

pub use dialect::Dialect;
pub use ping::{DEFAULT_PROGRAM, PingProber};
pub use traits::{DEFAULT_TIMEOUT, MAX_TIMEOUT, ProbeError, ProbeMetrics, Prober};

//! A declarative HTTP load-testing engine.
//!
//! A YAML document describes a workflow (an ordered sequence of HTTP steps
//! sharing a per-iteration variable scope) and, optionally, a time-phased
//! concurrency profile. The engine spawns and scales actors to match that
//! profile, runs the workflow repeatedly per actor, collects one [`Event`]
//! per step attempt, and reduces the captured stream into [`Metrics`] that
//! can be gated by [`Thresholds`].
//!
//! ## Example
//!
//! ```no_run
//! use rlt_flow::config;
//! use rlt_flow::coordinator::Coordinator;
//! use rlt_flow::collector::{self, Collector};
//! use rlt_flow::workflow::Workflow;
//! use reqwest::Client;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load("workload.yaml".as_ref())?;
//!     let (reporter, collector) = Collector::new(collector::DEFAULT_CAPACITY);
//!     let workflow = Arc::new(Workflow::new(config.workflow, Client::new(), config.sources));
//!     let coordinator = Coordinator::new(reporter);
//!     let ctx = CancellationToken::new();
//!
//!     coordinator.spawn(&ctx, 5, workflow);
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     ctx.cancel();
//!     coordinator.wait().await;
//!     collector.close().await;
//!
//!     let metrics = rlt_flow::metrics::compute(&collector.events(), collector.duration());
//!     println!("{:#?}", metrics);
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]

pub mod cli;
pub mod clock;
pub mod collector;
pub mod config;
pub mod coordinator;
pub mod datasource;
pub mod duration;
pub mod error;
pub mod event;
pub mod jsonpath;
pub mod metrics;
pub mod output;
pub mod phase;
pub mod rate_limiter;
pub mod runner;
pub mod status;
pub mod step;
pub mod template;
pub mod testserver;
pub mod threshold;
mod util;
pub mod workflow;

pub use crate::event::Event;
pub use crate::metrics::Metrics;
pub use crate::threshold::{ThresholdResults, Thresholds};

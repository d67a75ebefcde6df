//! 批量运行模块：以有界并发执行多个独立的 run。
//!
//! # Batch Runs
//!
//! Whole runs are independent (each owns its accumulator and message list), so a batch
//! simply drives several of them at once on one [`Runner`](crate::Runner), with at most
//! `max_concurrency` in flight.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchRunner`] | Runs a list of requests with bounded concurrency |
//! | [`BatchConfig`] | Concurrency bound (default 5) and error policy |
//! | [`BatchResult`] | Per-index results and failures, in input order |
//! | [`BatchError`] | An infrastructure failure of one run |

mod executor;

pub use executor::{BatchConfig, BatchError, BatchResult, BatchRunner};

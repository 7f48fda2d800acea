#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The status aggregator (spec §4.7): builds a `ReportMap` per
//! translation pass, merges self-owned entries into each object's live
//! status while preserving foreign-controller entries, writes with
//! optimistic concurrency, and sweeps entries for objects no longer
//! reported.

pub mod aggregator;
pub mod merge;
pub mod report;
pub mod sweeper;
pub mod writer;

pub use aggregator::Aggregator;
pub use report::{AncestorKey, ParentStatus, ReportMap};
pub use sweeper::stale_objects;
pub use writer::{write_status, WriteError, WriteOutcome};

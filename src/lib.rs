//! memtools - Memory diagnostic utilities.
//!
//! This library provides the core functionality shared between:
//! - `show-mem` - system commit/physical memory and per-process memory report
//! - `loop` - repeats a function, snippet or command and reports timing
//!
//! The [`census`] module is used in-process to summarize and dump live objects.

pub mod census;
pub mod collector;
pub mod debug;
pub mod fmt;
pub mod report;
pub mod runner;
pub mod storage;
pub mod util;

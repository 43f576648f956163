//! Memory counter collection for Linux.
//!
//! This module reads system and per-process memory counters from the Linux
//! `/proc` filesystem, with support for mocking for testing on other platforms.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │       MemInfoProvider (trait)               │
//! │  ┌───────────────────────────────────────┐  │
//! │  │          ProcfsProvider               │  │
//! │  │  - /proc/meminfo (commit, physical)   │  │
//! │  │  - /proc/[pid]/status (name, rss)     │  │
//! │  │  - /proc/[pid]/smaps (private)        │  │
//! │  └──────────────────┬────────────────────┘  │
//! │              ┌──────▼──────┐                │
//! │              │  FileSystem │ (trait)        │
//! │              └──────┬──────┘                │
//! └─────────────────────┼───────────────────────┘
//!              ┌────────┴────────┐
//!       ┌──────▼──────┐   ┌──────▼──────┐
//!       │   RealFs    │   │   MockFs    │
//!       │  (Linux)    │   │  (Testing)  │
//!       └─────────────┘   └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use memtools::collector::{MemInfoProvider, MockFs, ProcfsProvider};
//!
//! let provider = ProcfsProvider::new(MockFs::typical_system(), "/proc");
//! let commit = provider.read_system_commit().unwrap();
//! assert!(commit.used < commit.total);
//! ```

pub mod mock;
pub mod procfs;
mod traits;

pub use mock::MockFs;
pub use procfs::{CollectError, MemInfoProvider, MemStat, ProcfsProvider};
pub use traits::{FileSystem, RealFs};

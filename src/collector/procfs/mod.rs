//! Memory collection from the Linux `/proc` filesystem.
//!
//! `parser` holds pure parsers; `provider` wires them to a [`FileSystem`]
//! and exposes the [`MemInfoProvider`] interface the reporter depends on.
//!
//! [`FileSystem`]: crate::collector::FileSystem

pub mod parser;
pub mod provider;

pub use provider::{CollectError, MemInfoProvider, MemStat, ProcfsProvider};

//! Durable state kept between invocations.

mod delta;

pub use delta::{DEFAULT_PREFIX, DeltaStore};

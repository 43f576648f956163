use crate::util::panic_message;
use std::fmt::{Debug, Write as _};
use std::panic::{self, AssertUnwindSafe};

/// One object as seen by the census.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    type_name: String,
    size: u64,
    repr: Result<String, String>,
}

impl ObjectRecord {
    /// Builds a record from already-known parts.
    ///
    /// `repr` carries the error message when the object could not be rendered.
    pub fn new(type_name: impl Into<String>, size: u64, repr: Result<String, String>) -> Self {
        Self {
            type_name: type_name.into(),
            size,
            repr,
        }
    }

    /// Captures type, shallow size and `Debug` rendering of `value`.
    ///
    /// A `Debug` impl that fails or panics yields an error repr instead.
    pub fn of<T: Debug + ?Sized>(value: &T) -> Self {
        let repr = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut repr = String::new();
            write!(repr, "{:?}", value)
                .map(|()| repr)
                .map_err(|e| e.to_string())
        }))
        .unwrap_or_else(|payload| Err(panic_message(payload)));

        Self {
            type_name: std::any::type_name::<T>().to_string(),
            size: std::mem::size_of_val(value) as u64,
            repr,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn repr(&self) -> Result<&str, &str> {
        self.repr.as_deref().map_err(String::as_str)
    }
}

/// Something the census can describe.
///
/// Implemented for every `Debug` type, so anything printable can be tracked.
pub trait Inspect: Send + Sync {
    fn record(&self) -> ObjectRecord;
}

impl<T: Debug + Send + Sync + 'static> Inspect for T {
    fn record(&self) -> ObjectRecord {
        ObjectRecord::of(self)
    }
}

/// Debug adapter that always fails, for exercising error paths.
#[cfg(test)]
pub(crate) struct Unprintable;

#[cfg(test)]
impl Debug for Unprintable {
    fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Err(std::fmt::Error)
    }
}

/// Debug adapter that panics while rendering.
#[cfg(test)]
pub(crate) struct Exploding;

#[cfg(test)]
impl Debug for Exploding {
    fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        panic!("repr exploded")
    }
}

//! Census of in-process objects grouped by type.
//!
//! Rust has no heap walker, so the live set comes from an explicit
//! [`ObjectRegistry`]: values are tracked when created and drop out once
//! their last strong reference is gone. Callers may also pass any
//! `&[ObjectRecord]` they assembled themselves.
//!
//! Sizes are shallow (`size_of_val`): a `Vec` counts its own header, not the
//! elements it points to.

mod dump;
mod record;
mod registry;
mod summary;

pub use dump::{DEFAULT_DUMP_DIR, default_dump_path, write_dump};
pub use record::{Inspect, ObjectRecord};
pub use registry::ObjectRegistry;
pub use summary::{Census, SummaryTable, TypeAggregate};

use crate::fmt::NumberFormat;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default number of rows per summary table.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum CensusError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Summaries and dumps over a supplied object set or a registry's live set.
pub struct ObjectCensus<'a> {
    registry: &'a ObjectRegistry,
    numbers: NumberFormat,
}

impl<'a> ObjectCensus<'a> {
    pub fn new(registry: &'a ObjectRegistry, numbers: NumberFormat) -> Self {
        Self { registry, numbers }
    }

    /// Census over the process-wide registry.
    pub fn global(numbers: NumberFormat) -> ObjectCensus<'static> {
        ObjectCensus::new(ObjectRegistry::global(), numbers)
    }

    fn resolve<'o>(&self, objects: Option<&'o [ObjectRecord]>) -> Cow<'o, [ObjectRecord]> {
        match objects {
            Some(objects) => Cow::Borrowed(objects),
            None => {
                let freed = self.registry.collect();
                debug!("Pruned {} dropped objects before census", freed);
                Cow::Owned(self.registry.enumerate())
            }
        }
    }

    /// Returns the size-ordered and count-ordered tables, each cut to `limit` rows.
    pub fn summarize(&self, objects: Option<&[ObjectRecord]>, limit: usize) -> (String, String) {
        let objects = self.resolve(objects);
        let census = Census::from_records(&objects);
        (
            census.size_table(self.numbers).render(limit),
            census.count_table(self.numbers).render(limit),
        )
    }

    /// Prints totals followed by both truncated tables.
    pub fn print_summary(
        &self,
        objects: Option<&[ObjectRecord]>,
        limit: usize,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let objects = self.resolve(objects);
        let census = Census::from_records(&objects);

        writeln!(out, "Objects count {}", self.numbers.integer(census.total_count()))?;
        writeln!(out, "Objects size {}", self.numbers.integer(census.total_size()))?;
        writeln!(out)?;

        for table in [census.size_table(self.numbers), census.count_table(self.numbers)] {
            writeln!(out, "{}", table.render(limit))?;
            writeln!(out)?;
        }

        Ok(())
    }

    /// Writes every object, largest first, to `path` (default `/var/tmp/objects-<pid>`).
    ///
    /// Returns the one-line summary, which is also printed to stdout.
    pub fn dump(
        &self,
        objects: Option<&[ObjectRecord]>,
        path: Option<&Path>,
    ) -> Result<String, CensusError> {
        let objects = self.resolve(objects);
        let path = path.map_or_else(default_dump_path, Path::to_path_buf);

        let message = write_dump(&objects, &path, self.numbers)?;
        println!("{}", message);

        Ok(message)
    }
}

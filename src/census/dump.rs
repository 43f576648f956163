//! Full per-object dump file.
//!
//! Layout:
//!
//! ```text
//! Objects count: 11
//! Objects size: 903
//!
//! Objects summary:
//! <size table>
//!
//! <count table>
//!
//! IDX 2: 280 dict {'hello': 'world'}
//! ...
//! ```
//!
//! `IDX` is the position in the supplied sequence, so a line can be traced
//! back to the object it came from.

use super::CensusError;
use super::record::ObjectRecord;
use super::summary::Census;
use crate::fmt::NumberFormat;
use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_DUMP_DIR: &str = "/var/tmp";

/// `/var/tmp/objects-<pid>` for the current process.
pub fn default_dump_path() -> PathBuf {
    Path::new(DEFAULT_DUMP_DIR).join(format!("objects-{}", std::process::id()))
}

/// Writes `objects` to `path`, replacing any previous content.
///
/// An object whose representation failed is written with an `EXCEPTION:`
/// marker instead; it never stops the dump.
pub fn write_dump(
    objects: &[ObjectRecord],
    path: &Path,
    numbers: NumberFormat,
) -> Result<String, CensusError> {
    let io_err = |source| CensusError::Io {
        path: path.to_path_buf(),
        source,
    };

    let census = Census::from_records(objects);
    let total_size = census.total_size();

    // Largest first; equal sizes keep the later index first
    let mut order: Vec<(u64, usize)> = objects
        .iter()
        .enumerate()
        .map(|(idx, o)| (o.size(), idx))
        .collect();
    order.sort_by_key(|&entry| Reverse(entry));

    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);

    write!(
        w,
        "Objects count: {}\nObjects size: {}\n\n",
        numbers.integer(objects.len() as u64),
        numbers.integer(total_size)
    )
    .map_err(io_err)?;
    write!(
        w,
        "Objects summary:\n{}\n\n{}\n\n",
        census.size_table(numbers).render_full(),
        census.count_table(numbers).render_full()
    )
    .map_err(io_err)?;

    for (size, idx) in order {
        let object = &objects[idx];
        let written = match object.repr() {
            Ok(repr) => writeln!(w, "IDX {}: {} {} {}", idx, size, object.type_name(), repr),
            Err(e) => writeln!(
                w,
                "IDX {}: {} {} EXCEPTION: {}",
                idx,
                size,
                object.type_name(),
                e
            ),
        };
        written.map_err(io_err)?;
    }

    w.flush().map_err(io_err)?;

    Ok(format!(
        "Wrote {} objects to {} ({} bytes)",
        objects.len(),
        path.display(),
        total_size
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::census::record::Unprintable;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_dump_path_has_pid() {
        let path = default_dump_path();

        assert_eq!(path.parent(), Some(Path::new("/var/tmp")));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("objects-{}", std::process::id()).as_str())
        );
    }

    #[test]
    fn test_write_dump_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("objects-12345");
        let objects = vec![
            ObjectRecord::new("int", 24, Ok("1".into())),
            ObjectRecord::new("int", 24, Ok("2".into())),
            ObjectRecord::new("dict", 280, Ok("{'hello': 'world'}".into())),
            ObjectRecord::new("object", 16, Ok("<object>".into())),
        ];

        let message = write_dump(&objects, &path, NumberFormat::plain()).unwrap();

        assert_eq!(
            message,
            format!("Wrote 4 objects to {} (344 bytes)", path.display())
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Objects count: 4\n\
             Objects size: 344\n\
             \n\
             Objects summary:\n\
             \x20     Size Count Type\n\
             \x20      280     1 dict\n\
             \x20       48     2 int\n\
             \x20       16     1 object\n\
             \n\
             Count       Size Type\n\
             \x20   2         48 int\n\
             \x20   1        280 dict\n\
             \x20   1         16 object\n\
             \n\
             IDX 2: 280 dict {'hello': 'world'}\n\
             IDX 1: 24 int 2\n\
             IDX 0: 24 int 1\n\
             IDX 3: 16 object <object>\n"
        );
    }

    #[test]
    fn test_write_dump_survives_failing_repr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("objects");
        let objects = vec![
            ObjectRecord::of(&7u64),
            ObjectRecord::of(&Unprintable),
            ObjectRecord::of(&String::from("after")),
        ];

        write_dump(&objects, &path, NumberFormat::plain()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(&format!(
            "IDX 1: 0 {} EXCEPTION: an error occurred when formatting an argument\n",
            std::any::type_name::<Unprintable>()
        )));
        assert!(content.contains("IDX 0: 8 u64 7\n"));
        assert!(content.contains("IDX 2: 24 alloc::string::String \"after\"\n"));
    }

    #[test]
    fn test_write_dump_indices_are_stable() {
        let dir = TempDir::new().unwrap();
        let objects: Vec<ObjectRecord> = (0..5u64)
            .map(|i| ObjectRecord::new("blob", i * 10, Ok(format!("#{}", i))))
            .collect();

        let first = dir.path().join("a");
        let second = dir.path().join("b");
        write_dump(&objects, &first, NumberFormat::plain()).unwrap();
        write_dump(&objects, &second, NumberFormat::plain()).unwrap();

        let a = fs::read_to_string(&first).unwrap();
        assert_eq!(a, fs::read_to_string(&second).unwrap());
        assert!(a.contains("IDX 4: 40 blob #4\nIDX 3: 30 blob #3\n"));
    }

    #[test]
    fn test_write_dump_unwritable_path() {
        let objects = vec![ObjectRecord::new("int", 24, Ok("1".into()))];

        let err = write_dump(
            &objects,
            Path::new("/nonexistent/dir/objects"),
            NumberFormat::plain(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("/nonexistent/dir/objects"));
    }
}

//! Per-type aggregation and the two summary tables.

use super::record::ObjectRecord;
use crate::fmt::NumberFormat;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Count and cumulative shallow size of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAggregate {
    pub type_name: String,
    pub count: u64,
    pub total_size: u64,
}

/// Objects grouped by type, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Census {
    groups: Vec<TypeAggregate>,
}

impl Census {
    /// Groups `records` by type name. Each record lands in exactly one group.
    pub fn from_records(records: &[ObjectRecord]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<TypeAggregate> = Vec::new();

        for record in records {
            let slot = *index.entry(record.type_name()).or_insert_with(|| {
                groups.push(TypeAggregate {
                    type_name: record.type_name().to_string(),
                    count: 0,
                    total_size: 0,
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.count += 1;
            group.total_size += record.size();
        }

        Self { groups }
    }

    pub fn groups(&self) -> &[TypeAggregate] {
        &self.groups
    }

    pub fn total_count(&self) -> u64 {
        self.groups.iter().map(|g| g.count).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.groups.iter().map(|g| g.total_size).sum()
    }

    /// Groups ordered by `(size, count, type)`, all descending.
    pub fn by_size(&self) -> Vec<&TypeAggregate> {
        let mut sorted: Vec<&TypeAggregate> = self.groups.iter().collect();
        sorted.sort_by_key(|g| Reverse((g.total_size, g.count, g.type_name.as_str())));
        sorted
    }

    /// Groups ordered by `(count, size, type)`, all descending.
    pub fn by_count(&self) -> Vec<&TypeAggregate> {
        let mut sorted: Vec<&TypeAggregate> = self.groups.iter().collect();
        sorted.sort_by_key(|g| Reverse((g.count, g.total_size, g.type_name.as_str())));
        sorted
    }

    pub fn size_table(&self, numbers: NumberFormat) -> SummaryTable {
        let mut lines = vec![format!("{:>10} {:>5} {}", "Size", "Count", "Type")];
        lines.extend(self.by_size().into_iter().map(|g| {
            format!(
                "{:>10} {:>5} {}",
                numbers.integer(g.total_size),
                numbers.integer(g.count),
                g.type_name
            )
        }));
        SummaryTable { lines }
    }

    pub fn count_table(&self, numbers: NumberFormat) -> SummaryTable {
        let mut lines = vec![format!("{:>5} {:>10} {}", "Count", "Size", "Type")];
        lines.extend(self.by_count().into_iter().map(|g| {
            format!(
                "{:>5} {:>10} {}",
                numbers.integer(g.count),
                numbers.integer(g.total_size),
                g.type_name
            )
        }));
        SummaryTable { lines }
    }
}

/// A rendered summary: header line followed by one line per type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTable {
    lines: Vec<String>,
}

impl SummaryTable {
    /// Number of lines, header included.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines joined with newlines, no trailing newline.
    pub fn render_full(&self) -> String {
        self.lines.join("\n")
    }

    /// Header plus at most `limit` rows, then `... N more` if rows were cut.
    pub fn render(&self, limit: usize) -> String {
        let shown = limit.saturating_add(1);
        if self.lines.len() <= shown {
            return self.render_full();
        }

        let mut out = self.lines[..shown].join("\n");
        out.push_str(&format!("\n... {} more", self.lines.len() - shown));
        out
    }
}

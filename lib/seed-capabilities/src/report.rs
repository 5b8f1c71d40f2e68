/// Outcome of one table in an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Committed,
    Failed(String),
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub inserted: usize,
    pub skipped: usize,
    pub deduplicated: usize,
    pub status: TableStatus,
}

impl TableReport {
    pub fn not_started(table: &str) -> Self {
        TableReport {
            table: table.to_string(),
            inserted: 0,
            skipped: 0,
            deduplicated: 0,
            status: TableStatus::NotStarted,
        }
    }
}

/// Per-table counts in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub order: Vec<String>,
    pub tables: Vec<TableReport>,
}

impl ImportReport {
    /// A report listing every table of `order` as not yet started.
    pub fn pending(order: &[String]) -> Self {
        ImportReport {
            order: order.to_vec(),
            tables: order.iter().map(|t| TableReport::not_started(t)).collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut TableReport> {
        self.tables.iter_mut().find(|t| t.table == name)
    }

    pub fn total_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.tables.iter().map(|t| t.skipped).sum()
    }

    pub fn committed(&self) -> impl Iterator<Item = &TableReport> {
        self.tables
            .iter()
            .filter(|t| t.status == TableStatus::Committed)
    }
}

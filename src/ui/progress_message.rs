/// Progress events emitted by the importer while it streams rows
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressMessage {
    Started {
        columns: usize,
    },
    Rows {
        rows: usize,
        imported: usize,
        failed: usize,
    },
    Finished {
        imported: usize,
        failed: usize,
    },
}

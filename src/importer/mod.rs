//! Streaming CSV bulk importer
//!
//! Reads a CSV document with a header row, validates each data row on its
//! own and writes valid rows through a [`RecordSink`]. Every row is
//! committed individually: a bad row is recorded in the [`ImportReport`] and
//! processing continues with the next one. Only structural problems
//! (encoding, header, I/O, storage loss) abort the run.
//!
//! Memory use is bounded by a single record regardless of file size.

mod errors;
mod report;
pub mod schema;
pub mod sink;

pub use errors::ImportError;
pub use report::{ImportReport, RowError};
pub use schema::{FieldKind, FieldSpec, ImportSchema, ParsedRow, Value, sock_schema};
pub use sink::{RecordSink, SinkError, SockSink};

use std::io::Read;
use crossbeam::channel::Sender;
use csv::StringRecord;
use tokio_util::sync::CancellationToken;
use crate::ui::ProgressMessage;

/// Default field delimiter of stock files
pub const DEFAULT_DELIMITER: u8 = b';';

/// How often (in rows) progress is reported
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub delimiter: u8,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { delimiter: DEFAULT_DELIMITER }
    }
}

pub struct Importer {
    schema: ImportSchema,
    options: ImportOptions,
    cancel: CancellationToken,
    progress: Option<Sender<ProgressMessage>>,
}

impl Importer {
    pub fn new(schema: ImportSchema, options: ImportOptions) -> Self {
        Self {
            schema,
            options,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Stop between rows once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Sender<ProgressMessage>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn notify(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            // The receiver may be gone (UI closed); the import does not care.
            let _ = tx.send(msg);
        }
    }

    /// Run the import from `input` into `sink`
    pub fn run<R: Read, S: RecordSink>(&self, input: R, sink: &mut S) -> Result<ImportReport, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let mut record = StringRecord::new();
        let mut report = ImportReport::default();

        if !reader.read_record(&mut record).map_err(ImportError::from_csv)? {
            tracing::info!("Import source is empty, nothing to do");
            return Ok(report);
        }

        let binding = self.schema.bind(&record)?;
        for column in binding.ignored() {
            tracing::warn!("Ignoring unknown column '{}'", column);
        }
        self.notify(ProgressMessage::Started { columns: binding.width() });

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Import cancelled after {} rows ({} committed)", report.rows, report.imported);
                report.cancelled = true;
                break;
            }

            if !reader.read_record(&mut record).map_err(ImportError::from_csv)? {
                break;
            }
            report.rows += 1;
            let row = report.rows;

            match binding.parse(&self.schema, row, &record) {
                Ok(parsed) => match sink.write(&parsed) {
                    Ok(()) => report.imported += 1,
                    Err(SinkError::Row { column, reason }) => {
                        report.reject([RowError { row, column, reason }]);
                    }
                    Err(SinkError::Fatal(source)) => {
                        tracing::error!("Storage failure at row {}: {}", row, source);
                        return Err(ImportError::Storage { imported: report.imported, source });
                    }
                },
                Err(errors) => {
                    tracing::debug!("Rejected row {}: {} problem(s)", row, errors.len());
                    report.reject(errors);
                }
            }

            if row % PROGRESS_EVERY == 0 {
                self.notify(ProgressMessage::Rows {
                    rows: report.rows,
                    imported: report.imported,
                    failed: report.failed,
                });
            }
        }

        self.notify(ProgressMessage::Finished {
            imported: report.imported,
            failed: report.failed,
        });
        tracing::info!(
            "Import finished: {} rows, {} imported, {} failed",
            report.rows, report.imported, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    /// Collects rows in memory; fails rows whose color is "boom"
    #[derive(Debug, Default)]
    struct VecSink {
        rows: Vec<ParsedRow>,
    }

    impl RecordSink for VecSink {
        fn write(&mut self, row: &ParsedRow) -> Result<(), SinkError> {
            if row.text("color") == Some("boom") {
                return Err(SinkError::Row { column: Some("color".into()), reason: "rejected".into() });
            }
            self.rows.push(row.clone());
            Ok(())
        }
    }

    fn import(data: &str) -> Result<(ImportReport, VecSink), ImportError> {
        let mut sink = VecSink::default();
        let report = Importer::new(sock_schema(), ImportOptions::default())
            .run(data.as_bytes(), &mut sink)?;
        Ok((report, sink))
    }

    #[test]
    fn test_all_valid_rows_commit() {
        let (report, sink) = import("color;cottonPercentage;quantity\nred;40;10\nblue;80;5\ngreen;0;1\n").unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(report.rows, 3);
        assert!(report.is_clean());
        assert_eq!(sink.rows.len(), 3);
    }

    #[test]
    fn test_malformed_row_is_reported_and_skipped() {
        let (report, sink) = import("color;cottonPercentage;quantity\nred;40;10\n;50;3\nblue;80;5\n").unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 2);
        assert_eq!(report.errors[0].column.as_deref(), Some("color"));
        assert_eq!(sink.rows[1].text("color"), Some("blue"));
    }

    #[test]
    fn test_empty_and_header_only() {
        let (report, _) = import("").unwrap();
        assert_eq!(report, ImportReport::default());

        let (report, _) = import("color;cottonPercentage;quantity\n").unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(report.imported, 0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_duplicate_header_fails_before_rows() {
        let err = import("color;color;quantity\nred;red;1\n").unwrap_err();
        assert!(matches!(err, ImportError::DuplicateColumn(_)));
    }

    #[test]
    fn test_ragged_rows_are_row_errors() {
        let (report, _) = import("color;cottonPercentage;quantity\nred;40\nblue;80;5;extra\ngreen;10;2\n").unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[1].row, 2);
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let mut data = b"color;cottonPercentage;quantity\nred;40;10\n".to_vec();
        data.extend_from_slice(&[0xff, 0xfe, b';', b'1', b';', b'1', b'\n']);
        let mut sink = VecSink::default();
        let err = Importer::new(sock_schema(), ImportOptions::default())
            .run(&data[..], &mut sink)
            .unwrap_err();
        assert!(matches!(err, ImportError::Encoding { .. }));
    }

    #[test]
    fn test_sink_row_errors_do_not_abort() {
        let (report, sink) = import("color;cottonPercentage;quantity\nboom;40;1\nred;40;1\n").unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].reason, "rejected");
        assert_eq!(sink.rows.len(), 1);
    }

    #[test]
    fn test_cancelled_before_start_commits_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = VecSink::default();
        let report = Importer::new(sock_schema(), ImportOptions::default())
            .with_cancel(cancel)
            .run("color;cottonPercentage;quantity\nred;40;1\n".as_bytes(), &mut sink)
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.imported, 0);
        assert!(sink.rows.is_empty());
    }

    /// Writes through to the store and fires `cancel` after `after` rows
    struct CancelAfter<'a> {
        inner: SockSink<'a>,
        cancel: CancellationToken,
        after: usize,
        written: usize,
    }

    impl RecordSink for CancelAfter<'_> {
        fn write(&mut self, row: &ParsedRow) -> Result<(), SinkError> {
            self.inner.write(row)?;
            self.written += 1;
            if self.written == self.after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    #[test]
    fn test_cancel_mid_stream_keeps_committed_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancellationToken::new();
        let mut sink = CancelAfter {
            inner: SockSink::new(&store),
            cancel: cancel.clone(),
            after: 2,
            written: 0,
        };
        let data = "color;cottonPercentage;quantity\nred;10;1\nblue;20;2\ngreen;30;3\nblack;40;4\n";

        let report = Importer::new(sock_schema(), ImportOptions::default())
            .with_cancel(cancel)
            .run(data.as_bytes(), &mut sink)
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.rows, 2);
        assert_eq!(report.imported, 2);
        assert_eq!(store.count_socks().unwrap(), 2);
        assert!(store.find_by_color_and_cotton("green", 30).unwrap().is_none());
    }

    #[test]
    fn test_stock_limit_is_a_row_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let data = format!(
            "color;cottonPercentage;quantity\nred;10;{}\nred;10;5\nblue;10;1\ngreen;10;{}\n",
            crate::sock::MAX_QUANTITY,
            i64::MAX
        );
        let report = Importer::new(sock_schema(), ImportOptions::default())
            .run(data.as_bytes(), &mut SockSink::new(&store))
            .unwrap();

        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.errors[0].row, 2);
        assert_eq!(report.errors[0].column.as_deref(), Some("quantity"));
        assert_eq!(report.errors[1].row, 4);
        assert!(report.errors[1].reason.contains("greater than maximum"));
        assert_eq!(
            store.find_by_color_and_cotton("red", 10).unwrap().unwrap().quantity,
            crate::sock::MAX_QUANTITY
        );
        assert_eq!(store.total_quantity("blue", 0, 100).unwrap(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let mut sink = VecSink::default();
        let report = Importer::new(sock_schema(), ImportOptions { delimiter: b',' })
            .run("color,cottonPercentage,quantity\nred,40,1\n".as_bytes(), &mut sink)
            .unwrap();
        assert_eq!(report.imported, 1);
    }

    #[test]
    fn test_progress_messages() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut sink = VecSink::default();
        Importer::new(sock_schema(), ImportOptions::default())
            .with_progress(tx)
            .run("color;cottonPercentage;quantity\nred;40;1\n".as_bytes(), &mut sink)
            .unwrap();
        let messages: Vec<_> = rx.try_iter().collect();
        assert!(matches!(messages.first(), Some(ProgressMessage::Started { columns: 3 })));
        assert!(matches!(messages.last(), Some(ProgressMessage::Finished { imported: 1, failed: 0 })));
    }

    #[test]
    fn test_sock_sink_merges_positions() {
        let store = SqliteStore::open_in_memory().unwrap();
        let data = "color;cottonPercentage;quantity\nred;40;10\nred;40;5\nblue;80;5\n";
        let report = Importer::new(sock_schema(), ImportOptions::default())
            .run(data.as_bytes(), &mut SockSink::new(&store))
            .unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(store.count_socks().unwrap(), 2);
        assert_eq!(store.find_by_color_and_cotton("red", 40).unwrap().unwrap().quantity, 15);
    }
}

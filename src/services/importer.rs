// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk quote import from a two-column `content,author` CSV.
//!
//! The reader classifies rows and feeds valid ones through a bounded channel
//! to a fixed pool of insert workers.

use serde::Serialize;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::db::QuoteStore;
use crate::models::quote::{QuoteDraft, DEFAULT_AUTHOR};

pub const DEFAULT_WORKERS: usize = 4;
const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub workers: usize,
    /// Validate and count without inserting
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            dry_run: false,
        }
    }
}

/// Final counts. `processed` rows reached a worker; `inserted` were written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    inserted: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn summary(&self) -> ImportSummary {
        ImportSummary {
            processed: self.processed.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// What to do with one CSV row.
#[derive(Debug, PartialEq, Eq)]
pub enum RowOutcome {
    Insert(QuoteDraft),
    Skip(&'static str),
    Invalid(String),
}

pub fn classify_row(record: &csv::StringRecord) -> RowOutcome {
    if record.len() < 2 {
        return RowOutcome::Skip("insufficient columns");
    }
    let content = record[0].trim();
    if content.is_empty() {
        return RowOutcome::Skip("empty quote");
    }
    let author = match record[1].trim() {
        "" => DEFAULT_AUTHOR,
        author => author,
    };
    match QuoteDraft::new(content, author) {
        Ok(draft) => RowOutcome::Insert(draft),
        Err(e) => RowOutcome::Invalid(e.to_string()),
    }
}

/// Import every data row of `input`. The first row is a header and is dropped.
pub async fn import_csv<R: Read>(
    input: R,
    store: Arc<dyn QuoteStore>,
    options: ImportOptions,
) -> ImportSummary {
    let counters = Arc::new(Counters::default());
    let (tx, rx) = mpsc::channel::<(u64, QuoteDraft)>(CHANNEL_CAPACITY);
    let rx = Arc::new(Mutex::new(rx));

    let workers: Vec<_> = (1..=options.workers.max(1))
        .map(|id| {
            tokio::spawn(worker(
                id,
                rx.clone(),
                store.clone(),
                counters.clone(),
                options.dry_run,
            ))
        })
        .collect();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let mut row = 0u64;
    for result in reader.records() {
        row += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(row, error = %e, "Unreadable CSV row");
                counters.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        match classify_row(&record) {
            RowOutcome::Insert(draft) => {
                if tx.send((row, draft)).await.is_err() {
                    tracing::error!("All import workers exited early");
                    break;
                }
            }
            RowOutcome::Skip(reason) => {
                tracing::debug!(row, reason, "Skipping row");
                counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            RowOutcome::Invalid(reason) => {
                tracing::warn!(row, %reason, "Invalid quote");
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    drop(tx);

    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Import worker panicked");
        }
    }

    let summary = counters.summary();
    tracing::info!(
        rows = row,
        processed = summary.processed,
        inserted = summary.inserted,
        skipped = summary.skipped,
        errors = summary.errors,
        dry_run = options.dry_run,
        "Import finished"
    );
    summary
}

async fn worker(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<(u64, QuoteDraft)>>>,
    store: Arc<dyn QuoteStore>,
    counters: Arc<Counters>,
    dry_run: bool,
) {
    loop {
        let job = jobs.lock().await.recv().await;
        let Some((row, draft)) = job else {
            break;
        };

        counters.processed.fetch_add(1, Ordering::Relaxed);
        if dry_run {
            continue;
        }
        match store.create(&draft).await {
            Ok(_) => {
                counters.inserted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(worker = id, row, error = %e, "Quote insert failed");
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    const SAMPLE: &str = "\
quote,author,category
\"Be here now.\",Ram Dass,mindfulness
\"  Breathe.  \",,calm
,Nobody,empty
only-one-column
\"Rest, then begin again.\",\"  Anon  \",rest
";

    #[test]
    fn test_classify_row() {
        let row = csv::StringRecord::from(vec!["  Breathe. ", ""]);
        assert_eq!(
            classify_row(&row),
            RowOutcome::Insert(QuoteDraft {
                content: "Breathe.".into(),
                author: "Unknown".into(),
            })
        );
        assert_eq!(
            classify_row(&csv::StringRecord::from(vec!["x"])),
            RowOutcome::Skip("insufficient columns")
        );
        let long = "q".repeat(1001);
        assert!(matches!(
            classify_row(&csv::StringRecord::from(vec![long.as_str(), "a"])),
            RowOutcome::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn test_import_inserts_valid_rows() {
        let store = Arc::new(MemoryStore::new());
        let summary = import_csv(SAMPLE.as_bytes(), store.clone(), ImportOptions::default()).await;

        assert_eq!(
            summary,
            ImportSummary {
                processed: 3,
                inserted: 3,
                skipped: 2,
                errors: 0,
            }
        );

        let quotes = QuoteStore::list(&*store).await.unwrap();
        assert_eq!(quotes.len(), 3);
        assert!(quotes
            .iter()
            .any(|q| q.content == "Breathe." && q.author == "Unknown"));
        assert!(quotes.iter().any(|q| q.author == "Anon"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let summary = import_csv(
            SAMPLE.as_bytes(),
            store.clone(),
            ImportOptions {
                workers: 2,
                dry_run: true,
            },
        )
        .await;

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.inserted, 0);
        assert!(QuoteStore::list(&*store).await.unwrap().is_empty());
    }
}

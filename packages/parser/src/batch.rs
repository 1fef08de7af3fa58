//! Batch driver for JSON Lines corpora.
//!
//! Every input line is one raw record and every surviving record becomes one
//! output line. Records are independent, so chunks of lines are built on a
//! `rayon` pool; results are written back in input order. A failing record
//! (invalid UTF-8 or JSON, invariant violation, schema mismatch or panic) is
//! logged and skipped without affecting its neighbours.

use std::any::Any;
use std::io::{BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde_json::Value;

use crate::config::BatchConfig;
use crate::document::build_document;
use crate::error::{ParserError, Result};
use crate::schema::SchemaValidator;
use crate::types::{Document, RawRecord};

/// Result of processing one input line.
#[derive(Debug)]
pub enum LineOutcome {
    /// The serialized document, without trailing newline.
    Written(String),

    /// The record was not written.
    Skipped {
        /// Corpus id recovered from the raw line, when it has one.
        corpusid: Option<i64>,
        reason: ParserError,
    },
}

/// Counters of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Non-blank lines read.
    pub processed: usize,
    pub written: usize,
    pub skipped: usize,
}

impl std::ops::AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

/// Decode, build, validate and serialize a single line.
pub fn process_line(line: &str, validator: Option<&SchemaValidator>) -> LineOutcome {
    match render_line(line, validator) {
        Ok(json) => LineOutcome::Written(json),
        Err(reason) => LineOutcome::Skipped {
            corpusid: recover_corpusid(line),
            reason,
        },
    }
}

/// Like [`process_line`] for a raw byte line; invalid UTF-8 skips the record.
pub fn process_bytes(line: &[u8], validator: Option<&SchemaValidator>) -> LineOutcome {
    match std::str::from_utf8(line) {
        Ok(text) => process_line(text, validator),
        Err(e) => LineOutcome::Skipped {
            corpusid: recover_corpusid(&String::from_utf8_lossy(line)),
            reason: ParserError::InvalidUtf8(e),
        },
    }
}

fn render_line(line: &str, validator: Option<&SchemaValidator>) -> Result<String> {
    let record: RawRecord = serde_json::from_str(line)?;
    let document = build_contained(&record)?;

    if let Some(validator) = validator {
        validator.validate(&serde_json::to_value(&document)?)?;
    }

    Ok(serde_json::to_string(&document)?)
}

/// Build a document, turning a panic into an error for this record only.
fn build_contained(record: &RawRecord) -> Result<Document> {
    match catch_unwind(AssertUnwindSafe(|| build_document(record))) {
        Ok(result) => result,
        Err(payload) => Err(ParserError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

fn recover_corpusid(line: &str) -> Option<i64> {
    serde_json::from_str::<Value>(line).ok()?.get("corpusid")?.as_i64()
}

/// A worker pool and schema validator, built once and reused for every
/// input of a run.
pub struct BatchRunner {
    pool: rayon::ThreadPool,
    validator: Option<SchemaValidator>,
    chunk_size: usize,
}

impl BatchRunner {
    /// Build the worker pool and, when validation is on, compile the schema.
    ///
    /// # Errors
    /// Returns an error when the schema cannot be compiled or the pool
    /// cannot be built.
    pub fn new(config: &BatchConfig) -> Result<Self> {
        let validator = if config.validate {
            Some(SchemaValidator::new()?)
        } else {
            None
        };

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build()?;

        tracing::debug!(
            workers = pool.current_num_threads(),
            chunk_size = config.chunk_size,
            validate = config.validate,
            "batch runner ready"
        );

        Ok(Self {
            pool,
            validator,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Process every line of `reader` and write the documents to `writer`.
    ///
    /// # Errors
    /// Returns an error when reading or writing fails. Per-record failures,
    /// including lines that are not UTF-8, are counted, not returned.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, writer: W) -> Result<BatchStats> {
        self.run_with_progress(reader, writer, |_| {})
    }

    /// Like [`BatchRunner::run`], reporting the running totals after every chunk.
    ///
    /// # Errors
    /// See [`BatchRunner::run`].
    pub fn run_with_progress<R, W, F>(
        &self,
        reader: R,
        mut writer: W,
        mut on_chunk: F,
    ) -> Result<BatchStats>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&BatchStats),
    {
        let mut stats = BatchStats::default();
        let mut chunk: Vec<(usize, Vec<u8>)> = Vec::with_capacity(self.chunk_size);

        // Lines are split as bytes; decoding happens per record.
        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            chunk.push((index + 1, line));

            if chunk.len() >= self.chunk_size {
                self.flush_chunk(&mut chunk, &mut writer, &mut stats)?;
                on_chunk(&stats);
            }
        }

        if !chunk.is_empty() {
            self.flush_chunk(&mut chunk, &mut writer, &mut stats)?;
            on_chunk(&stats);
        }

        writer.flush()?;
        Ok(stats)
    }

    fn flush_chunk<W: Write>(
        &self,
        chunk: &mut Vec<(usize, Vec<u8>)>,
        writer: &mut W,
        stats: &mut BatchStats,
    ) -> Result<()> {
        let validator = self.validator.as_ref();
        let outcomes: Vec<LineOutcome> = self.pool.install(|| {
            chunk
                .par_iter()
                .map(|(_, line)| process_bytes(line, validator))
                .collect()
        });

        for ((line_no, _), outcome) in chunk.drain(..).zip(outcomes) {
            stats.processed += 1;
            match outcome {
                LineOutcome::Written(json) => {
                    writer.write_all(json.as_bytes())?;
                    writer.write_all(b"\n")?;
                    stats.written += 1;
                }
                LineOutcome::Skipped { corpusid, reason } => {
                    stats.skipped += 1;
                    log_skipped(line_no, corpusid, &reason);
                }
            }
        }

        Ok(())
    }
}

fn log_skipped(line_no: usize, corpusid: Option<i64>, reason: &ParserError) {
    match reason {
        ParserError::InvariantViolation { .. } | ParserError::Panicked(_) => {
            tracing::error!(
                line = line_no,
                corpusid = ?corpusid,
                error = %reason,
                "skipping record"
            );
        }
        _ => {
            tracing::warn!(
                line = line_no,
                corpusid = ?corpusid,
                error = %reason,
                "skipping record"
            );
        }
    }
}

/// Process every line of `reader` with a runner built for `config`.
///
/// # Errors
/// See [`BatchRunner::new`] and [`BatchRunner::run`].
pub fn run_batch<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    config: &BatchConfig,
) -> Result<BatchStats> {
    BatchRunner::new(config)?.run(reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn record_line(corpusid: i64) -> String {
        serde_json::json!({
            "corpusid": corpusid,
            "externalids": {"DOI": null},
            "content": {
                "text": "Body text.",
                "annotations": {"paragraph": [{"start": 0, "end": 10}]}
            }
        })
        .to_string()
    }

    fn written_ids(output: &[u8]) -> Vec<i64> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| {
                let value: Value = serde_json::from_str(l).unwrap();
                value["corpusid"].as_i64().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_process_line_writes_document() {
        let validator = SchemaValidator::new().unwrap();
        match process_line(&record_line(7), Some(&validator)) {
            LineOutcome::Written(json) => {
                let value: Value = serde_json::from_str(&json).unwrap();
                assert_eq!(value["corpusid"], 7);
                assert_eq!(value["sections"][0]["paragraphs"][0]["text"], "Body text.");
                assert!(value.get("warnings").is_none());
            }
            other => panic!("expected written line, got {other:?}"),
        }
    }

    #[test]
    fn test_process_line_skips_undecodable_record_with_corpusid() {
        let line = r#"{"corpusid": 9, "content": "not an object"}"#;
        match process_line(line, None) {
            LineOutcome::Skipped { corpusid, reason } => {
                assert_eq!(corpusid, Some(9));
                assert!(matches!(reason, ParserError::Decode(_)));
            }
            other => panic!("expected skipped line, got {other:?}"),
        }
    }

    #[test]
    fn test_process_line_garbage_has_no_corpusid() {
        match process_line("{{{", None) {
            LineOutcome::Skipped { corpusid, .. } => assert_eq!(corpusid, None),
            other => panic!("expected skipped line, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");

        let payload = catch_unwind(|| std::panic::panic_any(5_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_run_batch_preserves_order_and_skips_failures() {
        let input = [
            record_line(1),
            String::new(),
            "not json".to_string(),
            record_line(2),
            record_line(3),
            "   ".to_string(),
            record_line(4),
        ]
        .join("\n");
        let config = BatchConfig::new().with_workers(2).with_chunk_size(2);
        let mut output = Vec::new();

        let stats = run_batch(Cursor::new(input), &mut output, &config).unwrap();

        assert_eq!(
            stats,
            BatchStats {
                processed: 5,
                written: 4,
                skipped: 1,
            }
        );
        assert_eq!(written_ids(&output), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_run_batch_reports_progress_per_chunk() {
        let input = (1..=5).map(record_line).collect::<Vec<_>>().join("\n");
        let config = BatchConfig::new().with_chunk_size(2).with_validation(false);
        let mut seen = Vec::new();

        let runner = BatchRunner::new(&config).unwrap();

        let stats = runner
            .run_with_progress(Cursor::new(input), std::io::sink(), |s| {
                seen.push(s.processed);
            })
            .unwrap();

        assert_eq!(stats.written, 5);
        assert_eq!(seen, vec![2, 4, 5]);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped_and_batch_continues() {
        let mut input = Vec::new();
        input.extend_from_slice(record_line(1).as_bytes());
        input.extend_from_slice(b"\n{\"corpusid\": 2, \"x\": \"\xff\xfe\"}\n");
        input.extend_from_slice(record_line(3).as_bytes());
        input.push(b'\n');
        let config = BatchConfig::new().with_chunk_size(2);
        let mut output = Vec::new();

        let stats = run_batch(Cursor::new(input), &mut output, &config).unwrap();

        assert_eq!(
            stats,
            BatchStats {
                processed: 3,
                written: 2,
                skipped: 1,
            }
        );
        assert_eq!(written_ids(&output), vec![1, 3]);
    }

    #[test]
    fn test_process_bytes_recovers_corpusid_from_invalid_utf8() {
        match process_bytes(b"{\"corpusid\": 2, \"x\": \"\xff\"}", None) {
            LineOutcome::Skipped { corpusid, reason } => {
                assert_eq!(corpusid, Some(2));
                assert!(matches!(reason, ParserError::InvalidUtf8(_)));
            }
            other => panic!("expected skipped line, got {other:?}"),
        }
    }

    #[test]
    fn test_runner_is_reused_across_inputs() {
        let runner = BatchRunner::new(&BatchConfig::new().with_workers(2)).unwrap();
        let mut output = Vec::new();

        let first = runner.run(Cursor::new(record_line(1)), &mut output).unwrap();
        let second = runner
            .run(Cursor::new(format!("{}\r\n{}", record_line(2), record_line(3))), &mut output)
            .unwrap();

        assert_eq!(first.written, 1);
        assert_eq!(second.written, 2);
        assert_eq!(written_ids(&output), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_input() {
        let stats = run_batch(Cursor::new(""), std::io::sink(), &BatchConfig::new()).unwrap();
        assert_eq!(stats, BatchStats::default());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = BatchStats {
            processed: 2,
            written: 1,
            skipped: 1,
        };
        total += BatchStats {
            processed: 3,
            written: 3,
            skipped: 0,
        };
        assert_eq!(total.processed, 5);
        assert_eq!(total.written, 4);
    }
}

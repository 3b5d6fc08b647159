// src/export.rs

//! Hands finished file records to whatever stores them.
//!
//! Sinks are fed one record at a time, so callers can stream results as files
//! finish or dump a whole batch at once.

use crate::error::Result;
use crate::model::{Detection, FileRecord};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub trait ResultSink {
    fn write_record(&mut self, id: &str, record: &FileRecord) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

pub fn format_timestamp(timestamp: i64) -> Option<String> {
    Utc.timestamp_opt(timestamp, 0).single().map(|t| t.to_rfc3339())
}

#[derive(Serialize)]
struct RecordLine<'a> {
    id: &'a str,
    filename: &'a str,
    author: Option<&'a str>,
    timestamp: Option<String>,
    sha: Option<&'a str>,
    detected_kus: &'a BTreeMap<String, Detection>,
    elapsed_time: f64,
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn write_record(&mut self, id: &str, record: &FileRecord) -> Result<()> {
        let line = RecordLine {
            id,
            filename: &record.filename,
            author: record.provenance.author.as_deref(),
            timestamp: record.provenance.timestamp.and_then(format_timestamp),
            sha: record.provenance.revision.as_deref(),
            detected_kus: record.results(),
            elapsed_time: record.elapsed().as_secs_f64(),
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Table with one column per concept: `1`, `0`, or empty when the concept
/// was never scanned for that file.
pub struct CsvSink<W: Write> {
    writer: W,
    concepts: Vec<String>,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, concepts: Vec<String>) -> Self {
        Self {
            writer,
            concepts,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let mut cells: Vec<String> = ["filename", "author", "timestamp", "sha"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        cells.extend(self.concepts.iter().cloned());
        write_row(&mut self.writer, &cells)?;
        self.header_written = true;
        Ok(())
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn write_record(&mut self, _id: &str, record: &FileRecord) -> Result<()> {
        self.write_header()?;

        let provenance = &record.provenance;
        let mut cells = vec![
            record.filename.clone(),
            provenance.author.clone().unwrap_or_default(),
            provenance
                .timestamp
                .and_then(format_timestamp)
                .unwrap_or_default(),
            provenance.revision.clone().unwrap_or_default(),
        ];
        cells.extend(self.concepts.iter().map(|concept| {
            match record.result(concept) {
                Some(detection) if detection.is_positive() => "1".to_string(),
                Some(_) => "0".to_string(),
                None => String::new(),
            }
        }));
        write_row(&mut self.writer, &cells)
    }

    fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        Ok(())
    }
}

fn write_row(writer: &mut impl Write, cells: &[String]) -> Result<()> {
    let row: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    writeln!(writer, "{}", row.join(","))?;
    Ok(())
}

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

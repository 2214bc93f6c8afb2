//! Record export to JSON and CSV files.

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use herdlog_core::AnimalRecord;

use crate::{EngineError, Store};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CSV_HEADER: &str =
    "ID,Animal ID,Date,Image Path,Body Length,Height,Chest Width,Rump Angle,ATC Score,Synced";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: i64,
    animal_id: &'a str,
    date: String,
    image_path: &'a str,
    body_length: f64,
    height: f64,
    chest_width: f64,
    rump_angle: f64,
    atc_score: i32,
    synced: bool,
}

impl<'a> From<&'a AnimalRecord> for ExportRow<'a> {
    fn from(record: &'a AnimalRecord) -> Self {
        Self {
            id: record.id.get(),
            animal_id: &record.animal_id,
            date: record.date.format(DATE_FORMAT).to_string(),
            image_path: &record.image_path,
            body_length: record.measurements.body_length,
            height: record.measurements.height,
            chest_width: record.measurements.chest_width,
            rump_angle: record.measurements.rump_angle,
            atc_score: record.atc_score,
            synced: record.synced,
        }
    }
}

/// Pretty-printed JSON array, dates as `yyyy-MM-dd HH:mm:ss` UTC.
pub fn write_json<W: Write>(records: &[AnimalRecord], writer: W) -> Result<(), EngineError> {
    let rows: Vec<ExportRow<'_>> = records.iter().map(ExportRow::from).collect();
    serde_json::to_writer_pretty(writer, &rows)?;
    Ok(())
}

pub fn write_csv<W: Write>(records: &[AnimalRecord], mut writer: W) -> Result<(), EngineError> {
    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        let row = ExportRow::from(record);
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{}",
            row.id,
            quote_field(row.animal_id),
            row.date,
            quote_field(row.image_path),
            row.body_length,
            row.height,
            row.chest_width,
            row.rump_angle,
            row.atc_score,
            row.synced,
        )?;
    }
    Ok(())
}

/// Quote a field when it contains a comma, a quote or a line break.
fn quote_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Create the first free `cattle_records_<stamp>[_n].<ext>` in `dir`.
/// Creation is exclusive, so a name taken by a concurrent export is skipped.
fn create_export_file(dir: &Path, stamp: &str, ext: &str) -> io::Result<(PathBuf, File)> {
    let mut path = dir.join(format!("cattle_records_{stamp}.{ext}"));
    let mut n = 1;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                path = dir.join(format!("cattle_records_{stamp}_{n}.{ext}"));
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

impl Store {
    /// Snapshot every record (newest first) into a new file under `dir`.
    pub fn export_to_dir(&self, dir: &Path, format: ExportFormat) -> Result<PathBuf, EngineError> {
        let records = self.get_all()?;
        fs::create_dir_all(dir)?;
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let (path, file) = create_export_file(dir, &stamp, format.extension())?;

        let mut writer = BufWriter::new(file);
        match format {
            ExportFormat::Json => write_json(&records, &mut writer)?,
            ExportFormat::Csv => write_csv(&records, &mut writer)?,
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), count = records.len(), "exported records");
        Ok(path)
    }
}

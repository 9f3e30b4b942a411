//! Functions specifically for reading Kraken2 mpa-style reports.
//!
//! Each report line is `lineage<TAB>count`, where the lineage is a
//! `|`-separated list of prefixed tokens (`d__Bacteria|p__Proteobacteria|...`).
//! Reports may be gzip, bzip2 or zstd compressed; the codec is picked from
//! the file extension.

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use itertools::Itertools;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::bio::{TaxonomicLevel, LINEAGE_KEY_SEPARATOR, REPORT_LEVEL_SEPARATOR};
use crate::pipeline::ProcessingError;

/// One eligible line of a report: the full lineage and its read count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageRecord {
    tokens: Vec<String>,
    count: u64,
}

impl LineageRecord {
    pub fn new(tokens: Vec<String>, count: u64) -> Self {
        LineageRecord { tokens, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Lineage rejoined with `;`, the row key of the abundance table.
    pub fn lineage_key(&self) -> String {
        self.tokens.iter().join(&LINEAGE_KEY_SEPARATOR.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bzip2,
    Zstd,
}

const COMPRESSED_EXTENSIONS: [&str; 3] = ["gz", "bz2", "zst"];

impl Compression {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("gz") => Compression::Gzip,
            Some("bz2") => Compression::Bzip2,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        }
    }
}

/// Reads a whole report into memory, decompressing it if needed.
///
/// The file handle is closed before this returns. A failure to open or read
/// the file is a missing/unreadable input; content that is not valid UTF-8
/// is an input format error pointing at the offending line.
pub fn read_report(path: &Path) -> Result<String, ProcessingError> {
    let missing = |source: std::io::Error| ProcessingError::MissingFile {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(missing)?;
    let buffered = BufReader::new(file);
    let mut reader: Box<dyn Read> = match Compression::from_path(path) {
        Compression::None => Box::new(buffered),
        Compression::Gzip => Box::new(MultiGzDecoder::new(buffered)),
        Compression::Bzip2 => Box::new(MultiBzDecoder::new(buffered)),
        Compression::Zstd => {
            Box::new(zstd::stream::read::Decoder::with_buffer(buffered).map_err(missing)?)
        }
    };

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(missing)?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    String::from_utf8(bytes).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() as u64 + 1;
        ProcessingError::InputFormat {
            path: path.display().to_string(),
            line,
            message: "report is not valid UTF-8 text".to_string(),
        }
    })
}

/// Derives the sample (column) name of a report from its file name.
///
/// Directories are dropped, then a compression suffix, then the final
/// extension: `runs/MP1_A_mpa.txt.gz` becomes `MP1_A_mpa`.
pub fn sample_name(path: &Path) -> Option<String> {
    let file_name = Path::new(path.file_name()?);
    let uncompressed = match file_name.extension().and_then(|e| e.to_str()) {
        Some(ext) if COMPRESSED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            Path::new(file_name.file_stem()?)
        }
        _ => file_name,
    };
    uncompressed
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Parses the text of one report and keeps the lines reported at `rank`.
///
/// A line is kept when the last token of its lineage starts with the rank's
/// prefix. Every line, kept or not, must have exactly two TAB-separated
/// fields and a non-negative integer count.
///
/// # Arguments
///
/// * `source` - Name of the report, used in error messages.
/// * `content` - The full report text.
/// * `rank` - The rank the tables are built at.
pub fn parse_report(
    source: &str,
    content: &str,
    rank: TaxonomicLevel,
) -> Result<Vec<LineageRecord>, ProcessingError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    let mut total_lines = 0usize;

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        total_lines += 1;

        if record.len() != 2 {
            return Err(ProcessingError::InputFormat {
                path: source.to_string(),
                line,
                message: format!(
                    "expected 2 tab-separated fields (lineage, count), found {}",
                    record.len()
                ),
            });
        }

        let count: u64 = record[1]
            .trim()
            .parse()
            .map_err(|_| ProcessingError::InputFormat {
                path: source.to_string(),
                line,
                message: format!("read count '{}' is not a non-negative integer", &record[1]),
            })?;

        let tokens: Vec<&str> = record[0].split(REPORT_LEVEL_SEPARATOR).collect();
        let eligible = tokens
            .last()
            .map_or(false, |last| rank.matches_token(last));
        if eligible {
            records.push(LineageRecord::new(
                tokens.into_iter().map(str::to_string).collect(),
                count,
            ));
        }
    }

    debug!(
        "{}: {} of {} lines reported at rank {}",
        source,
        records.len(),
        total_lines,
        rank
    );
    Ok(records)
}

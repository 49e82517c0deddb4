//! Resilient CSV reader with an encoding fallback chain, plus the output writer.
//!
//! Reading tries an ordered list of [`ReadStrategy`] values and keeps the first
//! that succeeds:
//!
//! ```text
//! utf-8 strict → utf-8 lenient → utf-8-sig strict → utf-8-sig lenient
//!   → latin-1 strict → latin-1 lenient → windows-1252 strict → windows-1252 lenient
//!   → lossy utf-8 (replacement characters) lenient
//! ```
//!
//! A strict parse rejects the whole attempt on the first malformed row; a
//! lenient parse skips malformed rows. No column typing happens here: every
//! cell is either [`Cell::Text`] or [`Cell::Missing`].

pub mod writer;

pub use writer::{write_table, write_table_to};

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use crate::error::{IngestResult, IngestionError};
use crate::models::{Cell, Table};

/// Raw values read as missing, matched exactly.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// =============================================================================
// Encodings and strategies
// =============================================================================

/// Text encodings tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte-order mark.
    Utf8Sig,
    Latin1,
    Windows1252,
}

impl TextEncoding {
    /// Order in which encodings are attempted.
    pub const FALLBACK_ORDER: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Utf8Sig,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decode without replacement; `None` on any malformed sequence.
    pub fn decode_strict(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            TextEncoding::Utf8 => {
                encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
            }
            TextEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(body)
            }
            // ISO-8859-1 maps every byte to the code point of the same value.
            // encoding_rs only offers ISO-8859-15 and windows-1252 under that
            // label, and both remap some of the 0x80..=0xBF range.
            TextEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
            TextEncoding::Windows1252 => {
                encoding_rs::WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "encoding", rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Exact decoding, any malformed row fails the attempt.
    Strict(TextEncoding),
    /// Exact decoding, malformed rows are skipped.
    Lenient(TextEncoding),
    /// UTF-8 with replacement characters, malformed rows are skipped.
    Lossy,
}

impl ReadStrategy {
    /// The complete chain, most precise first.
    ///
    /// Lenient Latin-1 accepts any input that has a header row, so the
    /// windows-1252 and lossy steps after it never produce the result.
    /// `Utf8Sig` decodes exactly when `Utf8` does and only differs in
    /// dropping the byte order mark, which header normalization strips as
    /// well. These steps stay in the order for callers that run a single
    /// strategy.
    pub fn chain() -> Vec<ReadStrategy> {
        let mut chain: Vec<ReadStrategy> = TextEncoding::FALLBACK_ORDER
            .iter()
            .flat_map(|&enc| [ReadStrategy::Strict(enc), ReadStrategy::Lenient(enc)])
            .collect();
        chain.push(ReadStrategy::Lossy);
        chain
    }

    pub fn encoding_label(self) -> &'static str {
        match self {
            ReadStrategy::Strict(enc) | ReadStrategy::Lenient(enc) => enc.label(),
            ReadStrategy::Lossy => "utf-8 (lossy)",
        }
    }

    fn is_strict(self) -> bool {
        matches!(self, ReadStrategy::Strict(_))
    }

    fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            ReadStrategy::Strict(enc) | ReadStrategy::Lenient(enc) => enc.decode_strict(bytes),
            ReadStrategy::Lossy => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                Some(encoding_rs::UTF_8.decode_without_bom_handling(body).0)
            }
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Strict(enc) => write!(f, "{} (strict)", enc),
            ReadStrategy::Lenient(enc) => write!(f, "{} (lenient)", enc),
            ReadStrategy::Lossy => f.write_str("utf-8 (lossy)"),
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq)]
enum AttemptError {
    Decode,
    NoHeaders,
    Malformed(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Decode => f.write_str("invalid byte sequence"),
            AttemptError::NoHeaders => f.write_str("no header row"),
            AttemptError::Malformed(msg) => f.write_str(msg),
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Options for the reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Field delimiter; auto-detected from the header line when `None`.
    pub delimiter: Option<char>,
}

/// Result of reading with metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Raw table, headers exactly as found in the file.
    pub table: Table,
    /// Strategy that produced the table.
    pub strategy: ReadStrategy,
    /// Delimiter used.
    pub delimiter: char,
    /// Rows discarded by a lenient parse.
    pub skipped_rows: usize,
}

impl ParseResult {
    pub fn encoding(&self) -> &'static str {
        self.strategy.encoding_label()
    }

    pub fn headers(&self) -> Vec<String> {
        self.table
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Read a delimited file into a raw table.
///
/// # Example
/// ```ignore
/// let result = read_table("data/raw/sales.csv", ReadOptions::default())?;
/// println!("{} rows via {}", result.table.height(), result.strategy);
/// ```
pub fn read_table<P: AsRef<Path>>(path: P, options: ReadOptions) -> IngestResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestionError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestionError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read input file");
    read_bytes(&bytes, options)
}

/// Read raw bytes into a raw table, walking the fallback chain.
pub fn read_bytes(bytes: &[u8], options: ReadOptions) -> IngestResult<ParseResult> {
    let mut last_error = AttemptError::Decode;

    for strategy in ReadStrategy::chain() {
        match attempt(bytes, strategy, options.delimiter) {
            Ok(result) => {
                tracing::info!(
                    strategy = %strategy,
                    rows = result.table.height(),
                    columns = result.table.width(),
                    skipped = result.skipped_rows,
                    "input parsed"
                );
                return Ok(result);
            }
            Err(err) => {
                tracing::debug!(strategy = %strategy, error = %err, "read attempt failed");
                last_error = err;
            }
        }
    }

    match last_error {
        AttemptError::NoHeaders => Err(IngestionError::NoHeaders),
        other => Err(IngestionError::Undecodable {
            last_error: other.to_string(),
        }),
    }
}

fn attempt(
    bytes: &[u8],
    strategy: ReadStrategy,
    delimiter: Option<char>,
) -> Result<ParseResult, AttemptError> {
    let content = strategy.decode(bytes).ok_or(AttemptError::Decode)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let (table, skipped_rows) = parse_text(&content, delimiter, strategy.is_strict())?;

    Ok(ParseResult {
        table,
        strategy,
        delimiter,
        skipped_rows,
    })
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Comma wins ties and is used when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse decoded text. Returns the table and the number of skipped rows.
fn parse_text(content: &str, delimiter: char, strict: bool) -> Result<(Table, usize), AttemptError> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| AttemptError::Malformed(format!("unsupported delimiter {:?}", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AttemptError::Malformed(format!("cannot read header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AttemptError::NoHeaders);
    }

    let mut rows = Vec::new();
    let mut skipped = 0;

    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) if strict => {
                return Err(AttemptError::Malformed(format!("line {}: {}", line, e)));
            }
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        if record.len() > headers.len() {
            if strict {
                return Err(AttemptError::Malformed(format!(
                    "line {}: expected {} fields, saw {}",
                    line,
                    headers.len(),
                    record.len()
                )));
            }
            skipped += 1;
            continue;
        }

        rows.push(record.iter().map(raw_cell).collect());
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped malformed rows");
    }

    Ok((Table::from_rows(headers, rows), skipped))
}

fn raw_cell(value: &str) -> Cell {
    if NA_TOKENS.contains(&value) {
        Cell::Missing
    } else {
        Cell::Text(value.to_string())
    }
}

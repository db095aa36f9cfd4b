/*!
 * In-memory CSV table.
 *
 * A `Table` is the header row plus the data rows of one CSV file. Rows keep
 * their position and the line they started on, so errors can point back to
 * the source file. Loading and writing go through the `csv` crate; writes are
 * atomic and keep the line ending of the loaded file.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{CellRef, TableError};
use crate::file_utils::FileManager;

const UTF8_BOM: char = '\u{feff}';

/// One data row, cells aligned with the table headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Cell values in header order
    cells: Vec<String>,
    /// Line in the source file where the record starts
    line: u64,
}

impl Row {
    /// Create a row with the given cells
    pub fn new(cells: Vec<String>, line: u64) -> Self {
        Self { cells, line }
    }

    /// Cell value at a column index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// All cell values in header order
    pub fn values(&self) -> &[String] {
        &self.cells
    }

    /// Source line of this record
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Record terminator of a CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Terminator of the first line of `content`
    pub fn detect(content: &str) -> Self {
        match content.find('\n') {
            Some(end) if content[..end].ends_with('\r') => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    fn terminator(&self) -> csv::Terminator {
        match self {
            LineEnding::Lf => csv::Terminator::Any(b'\n'),
            LineEnding::CrLf => csv::Terminator::CRLF,
        }
    }
}

/// Rows and named columns of a CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
    line_ending: LineEnding,
    // @field: Whether the last record is followed by a terminator
    final_newline: bool,
}

impl Table {
    /// Create an empty table with the given header.
    /// Column names must be non-empty and unique.
    pub fn new(headers: Vec<String>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::Schema("table has no columns".to_string()));
        }

        let mut seen = HashSet::new();
        for (position, name) in headers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(TableError::Schema(format!("column {} has an empty name", position + 1)));
            }
            if !seen.insert(name.as_str()) {
                return Err(TableError::Schema(format!("duplicate column name '{}'", name)));
            }
        }

        Ok(Self {
            headers,
            rows: Vec::new(),
            line_ending: LineEnding::default(),
            final_newline: true,
        })
    }

    /// Load a UTF-8 CSV file with a header row
    pub fn load<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, TableError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| TableError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let content = String::from_utf8(bytes).map_err(|e| TableError::Parse {
            path: path.to_path_buf(),
            message: format!("file is not valid UTF-8 ({})", e.utf8_error()),
        })?;

        let table = Self::parse(&content, delimiter, path)?;
        debug!("Loaded {} rows x {} columns from {:?}", table.row_count(), table.column_count(), path);
        Ok(table)
    }

    /// Parse CSV text with a header row
    pub fn from_csv_str(content: &str, delimiter: u8) -> Result<Self, TableError> {
        Self::parse(content, delimiter, Path::new("<memory>"))
    }

    fn parse(content: &str, delimiter: u8, path: &Path) -> Result<Self, TableError> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let parse_error = |message: String| TableError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| parse_error(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.is_empty() {
            return Err(parse_error("missing header row".to_string()));
        }

        let mut table = Self::new(headers)?;
        table.line_ending = LineEnding::detect(content);
        table.final_newline = content.ends_with('\n');

        for record in reader.records() {
            let record = record.map_err(|e| parse_error(e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            table.rows.push(Row::new(record.iter().map(str::to_string).collect(), line));
        }

        Ok(table)
    }

    /// Serialize to CSV text; the header is always written
    pub fn to_csv_string(&self, delimiter: u8) -> Result<String, TableError> {
        let bytes = self.to_csv_bytes(delimiter, Path::new("<memory>"))?;
        String::from_utf8(bytes).map_err(|e| TableError::Write {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })
    }

    fn to_csv_bytes(&self, delimiter: u8, path: &Path) -> Result<Vec<u8>, TableError> {
        let write_error = |message: String| TableError::Write {
            path: path.to_path_buf(),
            message,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(self.line_ending.terminator())
            .from_writer(Vec::new());

        writer.write_record(&self.headers).map_err(|e| write_error(e.to_string()))?;
        for row in &self.rows {
            writer.write_record(&row.cells).map_err(|e| write_error(e.to_string()))?;
        }

        let mut bytes = writer.into_inner().map_err(|e| write_error(e.to_string()))?;
        if !self.final_newline {
            let terminator = self.line_ending.as_str().len();
            bytes.truncate(bytes.len().saturating_sub(terminator));
        }
        Ok(bytes)
    }

    /// Line ending used when writing
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Set the line ending used when writing
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Write the table, replacing any existing file at `path`
    pub fn write<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<(), TableError> {
        let path = path.as_ref();
        let bytes = self.to_csv_bytes(delimiter, path)?;

        FileManager::write_atomic(path, &bytes).map_err(|e| TableError::Write {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        debug!("Wrote {} rows to {:?}", self.row_count(), path);
        Ok(())
    }

    /// Append a row; its length must match the header
    pub fn push_row(&mut self, cells: Vec<String>) -> Result<(), TableError> {
        if cells.len() != self.headers.len() {
            return Err(TableError::Schema(format!(
                "row has {} cells but the table has {} columns",
                cells.len(),
                self.headers.len()
            )));
        }
        // Line numbers count the header as line 1
        let line = self.rows.len() as u64 + 2;
        self.rows.push(Row::new(cells, line));
        Ok(())
    }

    /// Column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in file order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Fail with a schema error naming every missing column
    pub fn require_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<(), TableError> {
        let missing: Vec<&str> = columns.iter()
            .map(AsRef::as_ref)
            .filter(|c| !self.has_column(c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TableError::Schema(format!(
                "missing required column(s): {} (available: {})",
                missing.join(", "),
                self.headers.join(", ")
            )))
        }
    }

    /// Cell value by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Replace a cell value; out-of-range positions are ignored
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.cells.get_mut(column)) {
            *cell = value;
        }
    }

    /// Location of a cell for error messages
    pub fn cell_ref(&self, row: usize, column: usize) -> CellRef {
        CellRef {
            row,
            line: self.rows.get(row).map(Row::line).unwrap_or(row as u64 + 2),
            column: self.headers.get(column).cloned().unwrap_or_default(),
        }
    }

    /// Values of one column in row order
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row.get(column).unwrap_or(""))
    }
}

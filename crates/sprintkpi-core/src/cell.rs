//! Cell model shared by extraction and workbook updates
//!
//! Coordinates are 1-based (`row`, `col`) like the A1 notation they map to.
//! Formulas are stored without the leading `=`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single worksheet cell
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Formula expression without the leading `=`
    Formula(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn formula(expr: impl Into<String>) -> Self {
        let expr = expr.into();
        match expr.strip_prefix('=') {
            Some(stripped) => CellValue::Formula(stripped.to_string()),
            None => CellValue::Formula(expr),
        }
    }

    /// Empty, or text that is only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed, non-empty textual content.
    ///
    /// Whole numbers render without a decimal part so that a numeric
    /// sprint name such as `42` reads back as `"42"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Formula(_) => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
        }
    }

    /// Numeric content; numeric text is parsed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Date content: an Excel serial number (1900 date system) or date text.
    ///
    /// Text is tried as ISO `YYYY-MM-DD`, then day-first and month-first
    /// slash dates; a trailing time part is ignored.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Number(n) => excel_serial_to_date(*n),
            CellValue::Text(s) => parse_date_text(s),
            _ => None,
        }
    }

    /// Boolean-ish content: `TRUE`, `yes`, `y`, `x`, `1` and their negatives
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "x" | "1" => Some(true),
                "false" | "no" | "n" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Formula(expr) => write!(f, "={}", expr),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Convert an Excel serial day number to a date (epoch 1899-12-30)
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

/// Convert a date to its Excel serial day number
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days() as f64
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let date_part = text.trim().split(['T', ' ']).next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Convert a 1-based column number to its letter (1 -> A, 26 -> Z, 27 -> AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    result
}

/// 1-based cell coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Relative A1 reference (`C5`)
    pub fn a1(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }

    /// Absolute A1 reference (`$C$5`)
    pub fn absolute(&self) -> String {
        format!("${}${}", column_letter(self.col), self.row)
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.a1())
    }
}

/// Read access to a worksheet
pub trait CellSource {
    /// Sheet name
    fn sheet_name(&self) -> &str;

    /// Value at a 1-based coordinate; `CellValue::Empty` when absent
    fn cell(&self, row: u32, col: u32) -> CellValue;

    /// Highest row holding any cell
    fn max_row(&self) -> u32;

    /// Highest column holding any cell
    fn max_col(&self) -> u32;

    /// True when every cell of the row up to `max_col` is blank
    fn is_row_blank(&self, row: u32) -> bool {
        (1..=self.max_col()).all(|col| self.cell(row, col).is_blank())
    }
}

/// In-memory worksheet contents
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    pub name: String,
    cells: BTreeMap<CellRef, CellValue>,
}

impl Grid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Set a cell; setting `Empty` removes it
    pub fn set(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        let value = value.into();
        let at = CellRef::new(row, col);
        if value == CellValue::Empty {
            self.cells.remove(&at);
        } else {
            self.cells.insert(at, value);
        }
    }

    /// Builder-style `set`, handy for fixtures
    pub fn with(mut self, row: u32, col: u32, value: impl Into<CellValue>) -> Self {
        self.set(row, col, value);
        self
    }

    /// Write a row of values starting at `col`
    pub fn set_row<V: Into<CellValue>>(&mut self, row: u32, col: u32, values: impl IntoIterator<Item = V>) {
        for (offset, value) in values.into_iter().enumerate() {
            self.set(row, col + offset as u32, value);
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&CellRef::new(row, col))
    }

    pub fn clear(&mut self, row: u32, col: u32) {
        self.cells.remove(&CellRef::new(row, col));
    }

    /// Remove every cell in a column
    pub fn clear_column(&mut self, col: u32) {
        self.cells.retain(|at, _| at.col != col);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Non-empty cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (&CellRef, &CellValue)> {
        self.cells.iter()
    }
}

impl CellSource for Grid {
    fn sheet_name(&self) -> &str {
        &self.name
    }

    fn cell(&self, row: u32, col: u32) -> CellValue {
        self.get(row, col).cloned().unwrap_or_default()
    }

    fn max_row(&self) -> u32 {
        self.cells.keys().map(|at| at.row).max().unwrap_or(0)
    }

    fn max_col(&self) -> u32 {
        self.cells.keys().map(|at| at.col).max().unwrap_or(0)
    }
}

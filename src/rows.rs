use std::fs::File;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::normalize_protein_key;
use crate::error::IngestError;

/// Header text that marks a worksheet as a mutation data sheet.
pub const HEADER_MARKER: &str = "REFERENCE";
pub const ROW_WIDTH: usize = 28;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            return Cell::Blank;
        }
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Cell::Number(number),
            _ => Cell::Text(value.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Blank
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// An ordered sequence of data rows, header already consumed.
pub trait RowSource {
    fn label(&self) -> String;
    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, IngestError>;
}

/// Tab-separated export of a mutation worksheet.
#[derive(Debug, Clone)]
pub struct TsvRowSource {
    path: Utf8PathBuf,
}

impl TsvRowSource {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl RowSource for TsvRowSource {
    fn label(&self) -> String {
        self.path.to_string()
    }

    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, IngestError> {
        let source_error = |message: String| IngestError::SourceRead {
            path: self.path.to_string(),
            message,
        };
        let file = File::open(self.path.as_std_path()).map_err(|err| source_error(err.to_string()))?;
        parse_tsv(file).map_err(|err| source_error(err.to_string()))
    }
}

/// Rows supplied directly, used when the sheet was decoded elsewhere.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    label: String,
    rows: Vec<Vec<Cell>>,
}

impl MemoryRowSource {
    pub fn new(label: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            label: label.into(),
            rows,
        }
    }
}

impl RowSource for MemoryRowSource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, IngestError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| !row.first().map(Cell::is_blank).unwrap_or(true))
            .cloned()
            .collect())
    }
}

/// Reads a tab-separated worksheet export. The first record must be the
/// header, whose first cell starts with [`HEADER_MARKER`]; any other file
/// yields no rows. Quoted cells may hold tabs and line breaks.
pub fn parse_tsv<R: Read>(input: R) -> Result<Vec<Vec<Cell>>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = reader.records();

    let Some(header) = records.next().transpose()? else {
        return Ok(Vec::new());
    };
    let first = header.get(0).unwrap_or("").trim_start_matches('\u{feff}').trim();
    if !first.starts_with(HEADER_MARKER) {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for record in records {
        let row: Vec<Cell> = record?.iter().map(Cell::parse).collect();
        if !row.first().map(Cell::is_blank).unwrap_or(true) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// One normalized sheet row. Field order follows the column layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationRow {
    pub reference: String,
    pub protein: String,
    pub mutation_pos: i64,
    pub mutation_from: String,
    pub mutation_to: String,
    pub ligand_name: String,
    pub ligand_type: String,
    pub ligand_id: String,
    pub ligand_class: String,
    pub exp_type: String,
    pub exp_func: String,
    pub exp_wt_value: i64,
    pub exp_wt_unit: String,
    pub exp_mu_effect_type: String,
    pub exp_mu_effect_sign: String,
    pub exp_mu_value_raw: i64,
    pub exp_mu_effect_qual: String,
    pub exp_mu_effect_ligand_prop: String,
    pub exp_mu_ligand_ref: String,
    pub opt_type: String,
    pub opt_wt: i64,
    pub opt_mu: i64,
    pub opt_sign: String,
    pub opt_percentage: i64,
    pub opt_qual: String,
    pub opt_agonist: String,
}

impl MutationRow {
    pub fn normalize(cells: &[Cell]) -> Self {
        let blank = Cell::Blank;
        let cell = |idx: usize| cells.get(idx).unwrap_or(&blank);
        let number = |idx: usize, column: &str| int_or_zero(cell(idx), column);

        Self {
            reference: text(cell(0)),
            protein: normalize_protein_key(&text(cell(1))),
            mutation_pos: number(2, "mutation_pos"),
            mutation_from: text(cell(3)),
            mutation_to: text(cell(4)),
            ligand_name: text(cell(5)),
            ligand_type: text(cell(6)),
            ligand_id: text(cell(7)),
            ligand_class: text(cell(8)),
            exp_type: text(cell(9)),
            exp_func: text(cell(10)),
            exp_wt_value: number(11, "exp_wt_value"),
            exp_wt_unit: text(cell(12)),
            exp_mu_effect_type: text(cell(13)),
            exp_mu_effect_sign: text(cell(14)),
            exp_mu_value_raw: number(15, "exp_mu_value"),
            exp_mu_effect_qual: text(cell(16)),
            exp_mu_effect_ligand_prop: text(cell(17)),
            exp_mu_ligand_ref: text(cell(18)),
            opt_type: text(cell(21)),
            opt_wt: number(22, "opt_wt"),
            opt_mu: number(23, "opt_mu"),
            opt_sign: text(cell(24)),
            opt_percentage: number(25, "opt_percentage"),
            opt_qual: text(cell(26)),
            opt_agonist: text(cell(27)),
        }
    }
}

fn text(cell: &Cell) -> String {
    match cell {
        Cell::Text(value) => value.trim().to_string(),
        Cell::Number(value) => format_number(*value),
        Cell::Blank => String::new(),
    }
}

/// Spreadsheets store integral ids as floats; `1234.0` must come back as `1234`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn int_or_zero(cell: &Cell, column: &str) -> i64 {
    match cell {
        Cell::Blank => 0,
        Cell::Number(value) => value.trunc() as i64,
        Cell::Text(value) if value.trim().is_empty() => 0,
        Cell::Text(value) => match value.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => number.trunc() as i64,
            _ => {
                warn!(column, value = %value, "non-numeric cell coerced to zero");
                0
            }
        },
    }
}

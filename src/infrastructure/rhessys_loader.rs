// Dataset loader - reads model output files into an in-memory table
use crate::infrastructure::memory_repository::{Column, Table, TableError, VariableMetadata};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const DATE_COLUMNS: [&str; 3] = ["year", "month", "day"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no input files given")]
    NoInput,
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: line {line} has {actual} fields, header has {expected}", path.display())]
    RaggedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("missing date column {0}")]
    MissingDateColumn(&'static str),
    #[error("invalid date on row {row}: {year}-{month}-{day}")]
    InvalidDate {
        row: usize,
        year: String,
        month: String,
        day: String,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Columns separated by runs of whitespace instead of commas.
    pub whitespace_delimited: bool,
}

/// Header plus string cells of one input file.
struct RawFile {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawFile {
    fn column(&self, index: usize) -> Vec<String> {
        self.rows.iter().map(|row| row[index].clone()).collect()
    }
}

/// Load and merge model output files. Columns of later files are appended
/// only when the first files did not already provide them.
pub fn load_table(paths: &[PathBuf], options: LoadOptions) -> Result<Table, LoadError> {
    if paths.is_empty() {
        return Err(LoadError::NoInput);
    }

    let mut order: Vec<String> = Vec::new();
    let mut cells: HashMap<String, Vec<String>> = HashMap::new();
    for path in paths {
        let raw = read_raw(path, options)?;
        let names = sanitize_column_names(&raw.headers);
        for (index, name) in names.into_iter().enumerate() {
            if is_index_column(&raw.headers[index]) || cells.contains_key(&name) {
                continue;
            }
            cells.insert(name.clone(), raw.column(index));
            order.push(name);
        }
        tracing::debug!(path = %path.display(), rows = raw.rows.len(), "Read model output file");
    }

    let dates = parse_dates(&cells)?;
    let mut table = Table::new(dates);
    for name in order {
        if let Some(values) = cells.remove(&name) {
            table.insert_column(name, infer_column(values))?;
        }
    }
    tracing::info!(rows = table.len(), "Loaded model output");
    Ok(table)
}

fn read_raw(path: &Path, options: LoadOptions) -> Result<RawFile, LoadError> {
    if options.whitespace_delimited {
        read_whitespace(path)
    } else {
        read_csv(path)
    }
}

fn read_csv(path: &Path) -> Result<RawFile, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()
        .map_err(csv_error)?;
    Ok(RawFile { headers, rows })
}

fn read_whitespace(path: &Path) -> Result<RawFile, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());
    let headers: Vec<String> = match lines.next() {
        Some((_, line)) => line.split_whitespace().map(String::from).collect(),
        None => Vec::new(),
    };
    let mut rows = Vec::new();
    for (index, line) in lines {
        let row: Vec<String> = line.split_whitespace().map(String::from).collect();
        if row.len() != headers.len() {
            return Err(LoadError::RaggedRow {
                path: path.to_path_buf(),
                line: index + 1,
                expected: headers.len(),
                actual: row.len(),
            });
        }
        rows.push(row);
    }
    Ok(RawFile { headers, rows })
}

fn is_index_column(header: &str) -> bool {
    header.is_empty() || header.starts_with("Unnamed:")
}

/// Make header names safe identifiers: `.` becomes `_`, `%` becomes
/// `percentage_`, and repeated names get `_2`, `_3`, ... suffixes.
pub fn sanitize_column_names(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .map(|header| {
            let name = header.replace('.', "_").replace('%', "percentage_");
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{}_{}", name, count)
            }
        })
        .collect()
}

fn parse_dates(cells: &HashMap<String, Vec<String>>) -> Result<Vec<NaiveDate>, LoadError> {
    let [year, month, day] = DATE_COLUMNS.map(|name| cells.get(name).ok_or(LoadError::MissingDateColumn(name)));
    let (year, month, day) = (year?, month?, day?);
    year.iter()
        .zip(month)
        .zip(day)
        .enumerate()
        .map(|(row, ((y, m), d))| {
            let date = match (parse_integer(y), parse_integer(m), parse_integer(d)) {
                (Some(y), Some(m), Some(d)) => {
                    match (i32::try_from(y), u32::try_from(m), u32::try_from(d)) {
                        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
                        _ => None,
                    }
                }
                _ => None,
            };
            date.ok_or_else(|| LoadError::InvalidDate {
                row,
                year: y.clone(),
                month: m.clone(),
                day: d.clone(),
            })
        })
        .collect()
}

/// Integral cell value; model output sometimes writes `1990.0`.
fn parse_integer(cell: &str) -> Option<i64> {
    let value: f64 = cell.trim().parse().ok()?;
    (value.fract() == 0.0 && value >= 0.0).then_some(value as i64)
}

fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

/// Numeric when every cell parses (blank and NA cells read as missing).
fn infer_column(values: Vec<String>) -> Column {
    let numbers: Option<Vec<f64>> = values.iter().map(|v| parse_number(v)).collect();
    match numbers {
        Some(numbers) => Column::Number(numbers),
        None => Column::Text(values),
    }
}

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    unit: String,
}

/// Read a `name,description,unit` lookup of variable descriptions.
pub fn load_variable_metadata(path: &Path) -> Result<BTreeMap<String, VariableMetadata>, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let mut metadata = BTreeMap::new();
    for record in reader.deserialize::<MetadataRecord>() {
        let record = record.map_err(csv_error)?;
        metadata.insert(
            record.name.replace('.', "_").replace('%', "percentage_"),
            VariableMetadata {
                description: record.description,
                unit: record.unit,
            },
        );
    }
    Ok(metadata)
}

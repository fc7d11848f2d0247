//! Dataset loading.
//!
//! Reads a survey export (CSV through polars, spreadsheets through calamine)
//! into a [`ResponseTable`]: a text-only polars `DataFrame` sorted by the
//! professor column, plus the question texts captured from the metadata row.
//! Every cell is kept as text; numeric coercion happens per topic in the
//! aggregator so that a stray non-numeric answer never poisons a column.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result, ResultExt};
use crate::utils::format_number;
use calamine::{Data, Reader, open_workbook_auto};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Spreadsheet extensions handled by calamine.
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Row-major grid of cells, header row first.
type Grid = Vec<Vec<Option<String>>>;

/// The loaded survey responses, read once and treated as immutable.
#[derive(Debug, Clone)]
pub struct ResponseTable {
    df: DataFrame,
    group_by: String,
    question_texts: HashMap<String, String>,
    source: Option<PathBuf>,
}

/// The rows of a [`ResponseTable`] belonging to one professor.
#[derive(Debug, Clone)]
pub struct ProfessorSubset {
    name: String,
    df: DataFrame,
}

/// Load a survey export and make sure the scratch directory exists.
///
/// # Errors
///
/// [`ReportError::Load`] when the file cannot be read as a table, has an
/// unsupported extension, is empty, or lacks the group-by column.
pub fn load_table(path: impl AsRef<Path>, config: &ReportConfig) -> Result<ResponseTable> {
    let path = path.as_ref();
    std::fs::create_dir_all(&config.scratch_dir).context(format!(
        "Failed to create scratch directory {}",
        config.scratch_dir.display()
    ))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let grid = if extension == "csv" {
        read_csv_grid(path)?
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        read_workbook_grid(path)?
    } else {
        return Err(ReportError::Load(format!(
            "Unsupported file type '{}' for {}",
            extension,
            path.display()
        )));
    };

    let mut table = ResponseTable::from_grid(grid, config)?;
    table.source = Some(path.to_path_buf());
    info!(
        "Loaded {} responses ({} columns) from {}",
        table.height(),
        table.width(),
        path.display()
    );
    Ok(table)
}

/// Read every CSV cell as text, header row included.
fn read_csv_grid(path: &Path) -> Result<Grid> {
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_truncate_ragged_lines(true),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| ReportError::Load(format!("{}: {}", path.display(), e)))?;

    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let values: Vec<Option<String>> = column
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        columns.push(values);
    }

    let height = df.height();
    let grid = (0..height)
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect();
    Ok(grid)
}

/// Read the first worksheet of a workbook as text.
fn read_workbook_grid(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ReportError::Load(format!("{}: {}", path.display(), e)))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::Load(format!("{} has no worksheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ReportError::Load(format!("{} [{}]: {}", path.display(), sheet, e)))?;

    debug!("Reading worksheet '{}' ({:?})", sheet, range.get_size());
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Normalize one spreadsheet cell to text.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    (!text.is_empty()).then_some(text)
}

/// Give every header a unique, non-blank name without moving any column.
///
/// Blank headers become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
pub fn normalize_headers(raw: &[Option<String>]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut names = Vec::with_capacity(raw.len());

    for (index, header) in raw.iter().enumerate() {
        let base = match header.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => format!("Unnamed: {}", index),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

impl ResponseTable {
    /// Build a table from a row-major grid whose first row is the header.
    pub fn from_grid(grid: Grid, config: &ReportConfig) -> Result<Self> {
        let mut rows = grid.into_iter();
        let header_row = rows
            .next()
            .ok_or_else(|| ReportError::Load("The file contains no rows".to_string()))?;
        let mut body: Vec<Vec<Option<String>>> = rows.collect();

        let width = body
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header_row.len()))
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Err(ReportError::Load("The file contains no columns".to_string()));
        }

        let mut raw_headers = header_row;
        raw_headers.resize(width, None);
        let headers = normalize_headers(&raw_headers);

        let mut question_texts = HashMap::new();
        if config.has_metadata_row && !body.is_empty() {
            let metadata = body.remove(0);
            for (name, text) in headers.iter().zip(metadata) {
                if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                    question_texts.insert(name.clone(), text.trim().to_string());
                }
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(width);
        for (index, name) in headers.iter().enumerate() {
            let values: Vec<Option<String>> = body
                .iter()
                .map(|row| row.get(index).cloned().flatten().filter(|v| !v.is_empty()))
                .collect();
            columns.push(Column::from(Series::new(name.as_str().into(), values)));
        }
        let df = DataFrame::new(columns)?;

        Self::from_frame(df, question_texts, &config.layout.group_by_column)
    }

    /// Wrap an existing text `DataFrame`, sorting it by the group-by column.
    ///
    /// Ties keep their original order; rows without a professor sort last.
    pub fn from_frame(
        df: DataFrame,
        question_texts: HashMap<String, String>,
        group_by: &str,
    ) -> Result<Self> {
        if df.column(group_by).is_err() {
            return Err(ReportError::Load(format!(
                "Group-by column '{}' not found in dataset",
                group_by
            )));
        }

        let df = df
            .sort(
                [group_by],
                SortMultipleOptions::default()
                    .with_maintain_order(true)
                    .with_nulls_last(true),
            )
            .context("Failed to sort responses")?;

        Ok(Self {
            df,
            group_by: group_by.to_string(),
            question_texts,
            source: None,
        })
    }

    /// Number of response rows (metadata row excluded).
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.df.width()
    }

    /// Column names in positional order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn group_by_column(&self) -> &str {
        &self.group_by
    }

    /// File the table was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Full question text recorded in the metadata row for `column`.
    pub fn question_text(&self, column: &str) -> Option<&str> {
        self.question_texts.get(column).map(String::as_str)
    }

    /// Distinct professor names, ascending.
    pub fn professors(&self) -> Result<Vec<String>> {
        let values = column_text(&self.df, &self.group_by)?;
        let unique: BTreeSet<String> = values
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .collect();
        Ok(unique.into_iter().collect())
    }

    /// All values of a column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<Option<String>>> {
        column_text(&self.df, column)
    }

    /// Rows whose group-by value equals `professor`.
    pub fn subset(&self, professor: &str) -> Result<ProfessorSubset> {
        let mask = self
            .df
            .column(&self.group_by)?
            .as_materialized_series()
            .str()?
            .equal(professor);
        let df = self.df.filter(&mask)?;
        if df.height() == 0 {
            return Err(ReportError::UnknownProfessor(professor.to_string()));
        }
        debug!("Professor '{}' has {} responses", professor, df.height());
        Ok(ProfessorSubset {
            name: professor.to_string(),
            df,
        })
    }
}

impl ProfessorSubset {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row count; the "Total Students for Professor" figure.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// All values of a column for this professor, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<Option<String>>> {
        column_text(&self.df, column)
    }

    /// Values of an optional column; an absent column yields `None`.
    pub fn optional_values(&self, column: Option<&str>) -> Result<Option<Vec<Option<String>>>> {
        match column {
            Some(name) if self.df.column(name).is_ok() => Ok(Some(column_text(&self.df, name)?)),
            _ => Ok(None),
        }
    }
}

fn column_text(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .map_err(|_| ReportError::ColumnNotFound(column.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn sample_grid() -> Grid {
        vec![
            cells(&["Spec", "Level 2", "Level 3", "Q1"]),
            cells(&["", "", "", "How clear was the course?"]),
            cells(&["Finance", "POP A", "Curs-Anul 1", "9"]),
            cells(&["Marketing", "ION B", "Curs-Anul 2", "7"]),
            cells(&["Finance", "POP A", "Seminar-Anul 1", "10"]),
            cells(&["Finance", "", "Curs-Anul 1", "5"]),
        ]
    }

    #[test]
    fn test_normalize_headers() {
        let raw = cells(&["A", "", "A", "B", "A"]);
        assert_eq!(
            normalize_headers(&raw),
            vec!["A", "Unnamed: 1", "A.1", "B", "A.2"]
        );
    }

    #[test]
    fn test_from_grid_sorts_and_strips_metadata() {
        let table = ResponseTable::from_grid(sample_grid(), &ReportConfig::default()).unwrap();

        assert_eq!(table.height(), 4);
        assert_eq!(table.question_text("Q1"), Some("How clear was the course?"));
        assert_eq!(
            table.column_values("Level 2").unwrap(),
            vec![
                Some("ION B".to_string()),
                Some("POP A".to_string()),
                Some("POP A".to_string()),
                None
            ]
        );
        // Stable for ties: POP A's rows keep their original order.
        assert_eq!(
            table.column_values("Q1").unwrap(),
            cells(&["7", "9", "10", "5"])
        );
    }

    #[test]
    fn test_without_metadata_row() {
        let config = ReportConfig::builder().has_metadata_row(false).build().unwrap();
        let table = ResponseTable::from_grid(sample_grid(), &config).unwrap();
        assert_eq!(table.height(), 5);
        assert_eq!(table.question_text("Q1"), None);
    }

    #[test]
    fn test_professors_distinct_ascending() {
        let table = ResponseTable::from_grid(sample_grid(), &ReportConfig::default()).unwrap();
        assert_eq!(table.professors().unwrap(), vec!["ION B", "POP A"]);
    }

    #[test]
    fn test_subset_and_unknown_professor() {
        let table = ResponseTable::from_grid(sample_grid(), &ReportConfig::default()).unwrap();
        let subset = table.subset("POP A").unwrap();
        assert_eq!(subset.height(), 2);
        assert_eq!(subset.column_values("Spec").unwrap(), cells(&["Finance", "Finance"]));
        assert!(subset.optional_values(Some("Missing")).unwrap().is_none());

        let err = table.subset("NOBODY").unwrap_err();
        assert!(matches!(err, ReportError::UnknownProfessor(_)));
    }

    #[test]
    fn test_missing_group_by_is_load_error() {
        let grid = vec![cells(&["A", "B"]), cells(&["1", "2"])];
        let err = ResponseTable::from_grid(grid, &ReportConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::Load(_)));
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Spec,Level 2,Level 3,Q1").unwrap();
        writeln!(file, ",,,Question one").unwrap();
        writeln!(file, "Finance,ZED,Curs-Anul 1,8").unwrap();
        writeln!(file, "Finance,ALPHA,\"Curs, Seminar-Anul 2\",9").unwrap();
        drop(file);

        let config = ReportConfig::builder()
            .scratch_dir(dir.path().join("temp"))
            .build()
            .unwrap();
        let table = load_table(&path, &config).unwrap();

        assert!(dir.path().join("temp").is_dir());
        assert_eq!(table.professors().unwrap(), vec!["ALPHA", "ZED"]);
        assert_eq!(table.question_text("Q1"), Some("Question one"));
        assert_eq!(
            table.column_values("Level 3").unwrap()[0].as_deref(),
            Some("Curs, Seminar-Anul 2")
        );
        assert_eq!(table.source(), Some(path.as_path()));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");
        std::fs::write(&path, "a,b").unwrap();
        let config = ReportConfig::builder()
            .scratch_dir(dir.path().join("temp"))
            .build()
            .unwrap();
        assert!(matches!(
            load_table(&path, &config).unwrap_err(),
            ReportError::Load(_)
        ));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(7.0)), Some("7".to_string()));
        assert_eq!(cell_text(&Data::Int(3)), Some("3".to_string()));
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }
}

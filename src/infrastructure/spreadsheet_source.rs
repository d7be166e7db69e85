// Spreadsheet measurement source (xlsx, xls, ods)
use crate::application::measurement_source::{FetchError, MeasurementSource};
use crate::domain::measurement::{Label, Quantity, SourceRow};
use crate::infrastructure::config::{ColumnMapping, SpreadsheetSettings};
use async_trait::async_trait;
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
    sheet: String,
    columns: ColumnMapping,
}

impl SpreadsheetSource {
    pub fn new(settings: &SpreadsheetSettings) -> Self {
        Self {
            path: settings.path.clone(),
            sheet: settings.sheet.clone(),
            columns: settings.columns.clone(),
        }
    }

    fn read_range(&self) -> Result<Range<Data>, FetchError> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| {
            FetchError::ConnectionFailure(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        workbook.worksheet_range(&self.sheet).map_err(|e| {
            FetchError::SchemaMismatch(format!("cannot read sheet '{}': {}", self.sheet, e))
        })
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_label(cell: &Data) -> Option<Label> {
    match cell {
        Data::Empty => None,
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|naive| Label::Timestamp(naive.and_utc()))
            .or_else(|| Some(Label::Number(dt.as_f64()))),
        Data::Float(_) | Data::Int(_) => cell_number(cell).map(Label::Number),
        other => Some(Label::Text(other.to_string())),
    }
}

/// First row is the header; rows without a label are skipped.
fn rows_from_range(range: &Range<Data>, columns: &ColumnMapping) -> Result<Vec<SourceRow>, FetchError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let names: Vec<String> = header.iter().map(|cell| cell.to_string().trim().to_string()).collect();
    let missing = columns.missing(&names);
    if !missing.is_empty() {
        return Err(FetchError::missing_columns(&missing));
    }

    let position = |name: &str| names.iter().position(|n| n == name);
    let label_idx = position(&columns.label);
    let value_idx: Vec<Option<usize>> = Quantity::ALL
        .iter()
        .map(|q| position(columns.value_column(*q)))
        .collect();

    let mut result = Vec::new();
    for cells in rows {
        let Some(label) = label_idx.and_then(|i| cells.get(i)).and_then(cell_label) else {
            continue;
        };
        let mut readings = [None; 4];
        for (slot, idx) in readings.iter_mut().zip(&value_idx) {
            *slot = idx.and_then(|i| cells.get(i)).and_then(cell_number);
        }
        result.push(SourceRow::new(label, readings));
    }

    Ok(result)
}

#[async_trait]
impl MeasurementSource for SpreadsheetSource {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || {
            let range = source.read_range()?;
            rows_from_range(&range, &source.columns)
        })
        .await
        .map_err(|e| FetchError::ConnectionFailure(format!("spreadsheet reader task failed: {}", e)))?
    }
}

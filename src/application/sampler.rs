// Sampler - Turns raw source rows into four aligned chart series
use crate::application::measurement_source::{FetchError, MeasurementSource};
use crate::domain::measurement::{FourSeries, Measurement, Quantity, SourceRow};
use serde::Deserialize;
use std::sync::Arc;

/// How rows are positioned on the shared x-axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxisMode {
    /// Row number in source order
    #[default]
    Index,
    /// Numeric or timestamp label, sorted ascending
    Label,
}

#[derive(Clone)]
pub struct Sampler {
    source: Arc<dyn MeasurementSource>,
    x_axis: XAxisMode,
}

impl Sampler {
    pub fn new(source: Arc<dyn MeasurementSource>, x_axis: XAxisMode) -> Self {
        Self { source, x_axis }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn fetch(&self) -> Result<FourSeries, FetchError> {
        let rows = self.source.fetch_rows().await?;
        tracing::debug!("Fetched {} rows from {}", rows.len(), self.source.name());
        sample(rows, self.x_axis)
    }
}

pub fn sample(rows: Vec<SourceRow>, x_axis: XAxisMode) -> Result<FourSeries, FetchError> {
    if rows.is_empty() {
        return Err(FetchError::EmptyResult);
    }

    let mut positioned = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let x = match x_axis {
            XAxisMode::Index => index as f64,
            XAxisMode::Label => row.label.position().ok_or_else(|| {
                FetchError::SchemaMismatch(format!(
                    "label {:?} in row {} is neither numeric nor a timestamp",
                    row.label, index
                ))
            })?,
        };
        positioned.push((x, row));
    }

    if x_axis == XAxisMode::Label {
        positioned.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let measurements = positioned.iter().flat_map(|(x, row)| {
        Quantity::ALL.into_iter().filter_map(move |quantity| {
            row.reading(quantity)
                .filter(|value| value.is_finite())
                .map(|value| Measurement::new(*x, quantity, value))
        })
    });

    Ok(FourSeries::from_measurements(measurements))
}

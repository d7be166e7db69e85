// Measurement domain models
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// The four monitored quantities, in dashboard layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Bhz,
    Vhz,
    Ic,
    Pressure,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [Quantity::Bhz, Quantity::Vhz, Quantity::Ic, Quantity::Pressure];

    pub fn index(self) -> usize {
        match self {
            Quantity::Bhz => 0,
            Quantity::Vhz => 1,
            Quantity::Ic => 2,
            Quantity::Pressure => 3,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Bhz => "BHZ",
            Quantity::Vhz => "VHZ",
            Quantity::Ic => "IC",
            Quantity::Pressure => "PRESSURE",
        };
        f.write_str(name)
    }
}

/// Row label as read from a data source
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl Label {
    /// Numeric x-position for this label, if it has one.
    /// Timestamps map to epoch milliseconds.
    pub fn position(&self) -> Option<f64> {
        match self {
            Label::Number(n) => Some(*n),
            Label::Timestamp(ts) => Some(ts.timestamp_millis() as f64),
            Label::Text(_) => None,
        }
    }
}

/// One raw row from a data source: a label plus a reading per quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub label: Label,
    pub readings: [Option<f64>; 4],
}

impl SourceRow {
    pub fn new(label: Label, readings: [Option<f64>; 4]) -> Self {
        Self { label, readings }
    }

    pub fn reading(&self, quantity: Quantity) -> Option<f64> {
        self.readings[quantity.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub x: f64,
    pub quantity: Quantity,
    pub value: f64,
}

impl Measurement {
    pub fn new(x: f64, quantity: Quantity, value: f64) -> Self {
        Self { x, quantity, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

impl SeriesPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One ordered series per quantity, sharing an x-axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FourSeries {
    series: [Vec<SeriesPoint>; 4],
}

impl FourSeries {
    pub fn new(series: [Vec<SeriesPoint>; 4]) -> Self {
        Self { series }
    }

    /// Group measurements by quantity, keeping their relative order.
    pub fn from_measurements(measurements: impl IntoIterator<Item = Measurement>) -> Self {
        let mut four = Self::default();
        for m in measurements {
            four.series[m.quantity.index()].push(SeriesPoint::new(m.x, m.value));
        }
        four
    }

    pub fn get(&self, quantity: Quantity) -> &[SeriesPoint] {
        &self.series[quantity.index()]
    }

    pub fn into_parts(self) -> [Vec<SeriesPoint>; 4] {
        self.series
    }

    pub fn total_points(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }
}

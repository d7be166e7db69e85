// Chart domain models - axis ranges, control limits and plotted series
use super::measurement::{Quantity, SeriesPoint};
use thiserror::Error;

/// Visible x-range used for limit lines before any data has arrived
pub const DEFAULT_X_RANGE: (f64, f64) = (0.0, 9.0);

/// Smallest and largest x of `points`, or the default range when empty.
/// A single x is widened so the range is never zero-width.
pub fn visible_x_range(points: &[SeriesPoint]) -> (f64, f64) {
    let mut iter = points.iter().map(|p| p.x);
    let Some(first) = iter.next() else {
        return DEFAULT_X_RANGE;
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if min == max {
        (min, min + 1.0)
    } else {
        (min, max)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ChartSetupError {
    #[error("y-axis range is empty: min {min} must be below max {max}")]
    EmptyRange { min: f64, max: f64 },
    #[error("upper limit {upper} is below lower limit {lower}")]
    InvertedLimits { upper: f64, lower: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

impl YRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ChartSetupError> {
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(ChartSetupError::EmptyRange { min, max });
        }
        Ok(Self { min, max })
    }
}

/// Upper/lower control limits drawn as two flat reference lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitBand {
    upper: f64,
    lower: f64,
}

/// The two flat series a [`LimitBand`] renders as.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLines {
    pub upper: [SeriesPoint; 2],
    pub lower: [SeriesPoint; 2],
}

impl LimitBand {
    pub fn new(upper: f64, lower: f64) -> Result<Self, ChartSetupError> {
        if upper < lower {
            return Err(ChartSetupError::InvertedLimits { upper, lower });
        }
        Ok(Self { upper, lower })
    }

    /// A band exists only when both bounds are given.
    pub fn from_bounds(upper: Option<f64>, lower: Option<f64>) -> Result<Option<Self>, ChartSetupError> {
        match (upper, lower) {
            (Some(upper), Some(lower)) => Self::new(upper, lower).map(Some),
            _ => Ok(None),
        }
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn reference_lines(&self, x_range: (f64, f64)) -> ReferenceLines {
        let (start, end) = x_range;
        ReferenceLines {
            upper: [SeriesPoint::new(start, self.upper), SeriesPoint::new(end, self.upper)],
            lower: [SeriesPoint::new(start, self.lower), SeriesPoint::new(end, self.lower)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub quantity: Quantity,
    pub title: String,
    pub y_range: YRange,
    pub y_label: String,
    pub limits: Option<LimitBand>,
    series: Vec<SeriesPoint>,
}

impl ChartModel {
    pub fn new(
        quantity: Quantity,
        title: String,
        y_range: YRange,
        y_label: String,
        limits: Option<LimitBand>,
    ) -> Self {
        Self {
            quantity,
            title,
            y_range,
            y_label,
            limits,
            series: Vec::new(),
        }
    }

    pub fn series(&self) -> &[SeriesPoint] {
        &self.series
    }

    /// Replace the plotted series wholesale. Axis and limits are untouched.
    pub fn apply(&mut self, points: Vec<SeriesPoint>) {
        self.series = points;
    }

    pub fn x_range(&self) -> (f64, f64) {
        visible_x_range(&self.series)
    }

    pub fn reference_lines(&self) -> Option<ReferenceLines> {
        self.limits.map(|band| band.reference_lines(self.x_range()))
    }
}

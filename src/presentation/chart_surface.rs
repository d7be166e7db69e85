// Shell contract - what a rendering toolkit has to provide for the dashboard
use crate::domain::chart::{LimitBand, YRange};
use crate::domain::measurement::SeriesPoint;
use crate::domain::refresh::RefreshStatus;
use thiserror::Error;

/// Opaque handle to a chart created by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub usize);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown chart handle {0:?}")]
    UnknownChart(ChartHandle),
    #[error("render failure: {0}")]
    RenderFailure(String),
}

pub trait ChartSurface: Send {
    fn create_chart(&mut self) -> ChartHandle;

    fn set_title(&mut self, handle: ChartHandle, title: &str) -> Result<(), RenderError>;

    fn configure_axes(&mut self, handle: ChartHandle, range: YRange, label: &str) -> Result<(), RenderError>;

    fn set_series(&mut self, handle: ChartHandle, points: &[SeriesPoint]) -> Result<(), RenderError>;

    fn add_reference_band(&mut self, handle: ChartHandle, band: LimitBand) -> Result<(), RenderError>;

    fn report_status(&mut self, status: &RefreshStatus);

    /// Push pending changes to the screen (or file)
    fn redraw(&mut self) -> Result<(), RenderError>;
}

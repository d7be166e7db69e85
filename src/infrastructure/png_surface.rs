// PNG dashboard surface - Renders the 2x2 chart grid to an image file
use crate::application::sampler::XAxisMode;
use crate::domain::chart::{LimitBand, YRange, visible_x_range};
use crate::domain::measurement::SeriesPoint;
use crate::domain::refresh::RefreshStatus;
use crate::presentation::chart_surface::{ChartHandle, ChartSurface, RenderError};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::path::PathBuf;

/// Same geometry as the original desktop window
pub const DEFAULT_SIZE: (u32, u32) = (1600, 800);

const STATUS_BAR_HEIGHT: u32 = 30;

/// Timestamp labels are placed at epoch milliseconds; anything this large
/// (later than 1973) on a label axis is drawn as a time of day.
const EPOCH_MILLIS_FLOOR: f64 = 1.0e11;

fn is_time_axis(x_axis: XAxisMode, (x_min, _): (f64, f64)) -> bool {
    x_axis == XAxisMode::Label && x_min.abs() >= EPOCH_MILLIS_FLOOR
}

fn time_tick_label(x: f64) -> String {
    match chrono::DateTime::from_timestamp_millis(x.round() as i64) {
        Some(time) => time.format("%m-%d %H:%M").to_string(),
        None => format!("{}", x),
    }
}

#[derive(Debug, Clone)]
struct Panel {
    title: String,
    range: YRange,
    label: String,
    band: Option<LimitBand>,
    series: Vec<SeriesPoint>,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            title: String::new(),
            range: YRange { min: 0.0, max: 1.0 },
            label: String::new(),
            band: None,
            series: Vec::new(),
        }
    }
}

pub struct PngSurface {
    path: PathBuf,
    size: (u32, u32),
    x_axis: XAxisMode,
    panels: Vec<Panel>,
    status_line: String,
}

fn render_failure(e: impl std::fmt::Display) -> RenderError {
    RenderError::RenderFailure(e.to_string())
}

impl PngSurface {
    pub fn new(path: PathBuf, size: (u32, u32), x_axis: XAxisMode) -> Self {
        Self {
            path,
            size,
            x_axis,
            panels: Vec::new(),
            status_line: "Waiting for first refresh".to_string(),
        }
    }

    fn panel_mut(&mut self, handle: ChartHandle) -> Result<&mut Panel, RenderError> {
        self.panels.get_mut(handle.0).ok_or(RenderError::UnknownChart(handle))
    }

    fn draw_panel(
        area: &DrawingArea<BitMapBackend<'_>, Shift>,
        panel: &Panel,
        x_axis: XAxisMode,
    ) -> Result<(), RenderError> {
        let (x_min, x_max) = visible_x_range(&panel.series);
        let time_axis = is_time_axis(x_axis, (x_min, x_max));
        let format_time = |x: &f64| time_tick_label(*x);

        let mut chart = ChartBuilder::on(area)
            .caption(&panel.title, ("sans-serif", 22).into_font().style(FontStyle::Bold))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, panel.range.min..panel.range.max)
            .map_err(render_failure)?;

        let mut mesh = chart.configure_mesh();
        mesh.y_desc(&panel.label);
        match (x_axis, time_axis) {
            (_, true) => mesh.x_desc("Time").x_label_formatter(&format_time),
            (XAxisMode::Label, false) => mesh.x_desc("Label"),
            (XAxisMode::Index, false) => mesh.x_desc("Sample"),
        };
        mesh.draw().map_err(render_failure)?;

        if let Some(band) = panel.band {
            let lines = band.reference_lines((x_min, x_max));
            for line in [lines.lower, lines.upper] {
                chart
                    .draw_series(DashedLineSeries::new(
                        line.iter().map(|p| (p.x, p.y)),
                        8,
                        5,
                        RED.stroke_width(2),
                    ))
                    .map_err(render_failure)?;
            }
        }

        chart
            .draw_series(LineSeries::new(panel.series.iter().map(|p| (p.x, p.y)), BLUE.stroke_width(2)))
            .map_err(render_failure)?;

        Ok(())
    }
}

impl ChartSurface for PngSurface {
    fn create_chart(&mut self) -> ChartHandle {
        self.panels.push(Panel::default());
        ChartHandle(self.panels.len() - 1)
    }

    fn set_title(&mut self, handle: ChartHandle, title: &str) -> Result<(), RenderError> {
        self.panel_mut(handle)?.title = title.to_string();
        Ok(())
    }

    fn configure_axes(&mut self, handle: ChartHandle, range: YRange, label: &str) -> Result<(), RenderError> {
        let panel = self.panel_mut(handle)?;
        panel.range = range;
        panel.label = label.to_string();
        Ok(())
    }

    fn set_series(&mut self, handle: ChartHandle, points: &[SeriesPoint]) -> Result<(), RenderError> {
        self.panel_mut(handle)?.series = points.to_vec();
        Ok(())
    }

    fn add_reference_band(&mut self, handle: ChartHandle, band: LimitBand) -> Result<(), RenderError> {
        self.panel_mut(handle)?.band = Some(band);
        Ok(())
    }

    fn report_status(&mut self, status: &RefreshStatus) {
        self.status_line = status.summary();
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_failure)?;

        let (status_bar, grid) = root.split_vertically(STATUS_BAR_HEIGHT);
        status_bar
            .draw_text(&self.status_line, &("sans-serif", 16).into_font().color(&BLACK), (10, 8))
            .map_err(render_failure)?;

        let cols = 2;
        let rows = self.panels.len().div_ceil(cols).max(1);
        for (area, panel) in grid.split_evenly((rows, cols)).iter().zip(&self.panels) {
            Self::draw_panel(area, panel, self.x_axis)?;
        }

        root.present().map_err(render_failure)?;
        tracing::debug!("Wrote dashboard to {}", self.path.display());
        Ok(())
    }
}

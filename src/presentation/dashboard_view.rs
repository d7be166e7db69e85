// Dashboard view - Binds the dashboard's charts to a rendering surface
use crate::application::dashboard::Dashboard;
use crate::domain::refresh::RefreshStatus;
use crate::presentation::chart_surface::{ChartHandle, ChartSurface, RenderError};

pub struct DashboardView<S: ChartSurface> {
    surface: S,
    handles: [ChartHandle; 4],
}

impl<S: ChartSurface> DashboardView<S> {
    /// Create the four charts and apply their fixed configuration.
    /// Limit bands are added here once and never recomputed.
    pub fn setup(mut surface: S, dashboard: &Dashboard) -> Result<Self, RenderError> {
        let handles = [
            surface.create_chart(),
            surface.create_chart(),
            surface.create_chart(),
            surface.create_chart(),
        ];

        for (handle, chart) in handles.iter().zip(dashboard.charts()) {
            surface.set_title(*handle, &chart.title)?;
            surface.configure_axes(*handle, chart.y_range, &chart.y_label)?;
            if let Some(band) = chart.limits {
                surface.add_reference_band(*handle, band)?;
            }
        }

        Ok(Self { surface, handles })
    }

    pub fn render(&mut self, dashboard: &Dashboard) -> Result<(), RenderError> {
        for (handle, chart) in self.handles.iter().zip(dashboard.charts()) {
            self.surface.set_series(*handle, chart.series())?;
        }
        self.surface.redraw()
    }

    pub fn show_status(&mut self, status: &RefreshStatus) {
        self.surface.report_status(status);
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::domain::chart::{LimitBand, YRange};
    use crate::domain::measurement::SeriesPoint;

    #[derive(Debug, Default, Clone)]
    pub struct RecordedChart {
        pub title: String,
        pub range: Option<YRange>,
        pub label: String,
        pub bands: Vec<LimitBand>,
        pub series: Vec<SeriesPoint>,
    }

    /// In-memory surface that records every call
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub charts: Vec<RecordedChart>,
        pub statuses: Vec<RefreshStatus>,
        pub frames: Vec<Vec<Vec<SeriesPoint>>>,
    }

    impl RecordingSurface {
        fn chart_mut(&mut self, handle: ChartHandle) -> Result<&mut RecordedChart, RenderError> {
            self.charts.get_mut(handle.0).ok_or(RenderError::UnknownChart(handle))
        }
    }

    impl ChartSurface for RecordingSurface {
        fn create_chart(&mut self) -> ChartHandle {
            self.charts.push(RecordedChart::default());
            ChartHandle(self.charts.len() - 1)
        }

        fn set_title(&mut self, handle: ChartHandle, title: &str) -> Result<(), RenderError> {
            self.chart_mut(handle)?.title = title.to_string();
            Ok(())
        }

        fn configure_axes(&mut self, handle: ChartHandle, range: YRange, label: &str) -> Result<(), RenderError> {
            let chart = self.chart_mut(handle)?;
            chart.range = Some(range);
            chart.label = label.to_string();
            Ok(())
        }

        fn set_series(&mut self, handle: ChartHandle, points: &[SeriesPoint]) -> Result<(), RenderError> {
            self.chart_mut(handle)?.series = points.to_vec();
            Ok(())
        }

        fn add_reference_band(&mut self, handle: ChartHandle, band: LimitBand) -> Result<(), RenderError> {
            self.chart_mut(handle)?.bands.push(band);
            Ok(())
        }

        fn report_status(&mut self, status: &RefreshStatus) {
            self.statuses.push(status.clone());
        }

        fn redraw(&mut self) -> Result<(), RenderError> {
            let frame = self.charts.iter().map(|c| c.series.clone()).collect();
            self.frames.push(frame);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;
    use crate::domain::chart::LimitBand;
    use crate::domain::measurement::{FourSeries, Quantity, SeriesPoint};

    #[test]
    fn test_setup_configures_charts_and_bands() {
        let dashboard = Dashboard::from_config(&[]).unwrap();
        let view = DashboardView::setup(RecordingSurface::default(), &dashboard).unwrap();
        let charts = &view.surface().charts;

        assert_eq!(charts.len(), 4);
        assert_eq!(charts[1].title, "Temperature VHZ");
        assert_eq!(charts[1].label, "Temperature [°C]");
        assert_eq!(charts[1].bands, vec![LimitBand::new(620.0, 580.0).unwrap()]);
        assert!(charts[Quantity::Ic.index()].bands.is_empty());
        assert!(view.surface().frames.is_empty());
    }

    #[test]
    fn test_render_pushes_series_and_redraws() {
        let mut dashboard = Dashboard::from_config(&[]).unwrap();
        let mut view = DashboardView::setup(RecordingSurface::default(), &dashboard).unwrap();

        dashboard.apply(FourSeries::new([
            vec![SeriesPoint::new(0.0, 970.0)],
            Vec::new(),
            Vec::new(),
            vec![SeriesPoint::new(0.0, 6.0), SeriesPoint::new(1.0, 6.1)],
        ]));
        view.render(&dashboard).unwrap();

        let surface = view.surface();
        assert_eq!(surface.frames.len(), 1);
        assert_eq!(surface.charts[0].series, vec![SeriesPoint::new(0.0, 970.0)]);
        assert_eq!(surface.charts[3].series.len(), 2);
        assert_eq!(surface.charts[0].bands.len(), 1);
    }
}

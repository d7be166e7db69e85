// Dashboard - The four control charts the window shows
use crate::domain::chart::{ChartModel, ChartSetupError, LimitBand, YRange};
use crate::domain::measurement::{FourSeries, Quantity};
use crate::infrastructure::config::ChartConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    charts: [ChartModel; 4],
}

impl Dashboard {
    /// Build the charts from config. Expects exactly one entry per quantity.
    pub fn from_config(configs: &[ChartConfig]) -> Result<Self, ChartSetupError> {
        let build = |quantity: Quantity| -> Result<ChartModel, ChartSetupError> {
            let config = configs
                .iter()
                .find(|c| c.quantity == quantity)
                .cloned()
                .unwrap_or_else(|| ChartConfig::preset(quantity));

            if config.upper_limit.is_some() != config.lower_limit.is_some() {
                tracing::warn!(
                    "Chart {} has only one control limit configured, no band will be drawn",
                    quantity
                );
            }

            Ok(ChartModel::new(
                quantity,
                config.title,
                YRange::new(config.y_min, config.y_max)?,
                config.y_label,
                LimitBand::from_bounds(config.upper_limit, config.lower_limit)?,
            ))
        };

        Ok(Self {
            charts: [
                build(Quantity::Bhz)?,
                build(Quantity::Vhz)?,
                build(Quantity::Ic)?,
                build(Quantity::Pressure)?,
            ],
        })
    }

    pub fn chart(&self, quantity: Quantity) -> &ChartModel {
        &self.charts[quantity.index()]
    }

    pub fn charts(&self) -> &[ChartModel; 4] {
        &self.charts
    }

    /// Replace every chart's series with the freshly fetched ones.
    pub fn apply(&mut self, series: FourSeries) {
        for (chart, points) in self.charts.iter_mut().zip(series.into_parts()) {
            chart.apply(points);
        }
    }
}

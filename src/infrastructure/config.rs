use crate::application::sampler::XAxisMode;
use crate::domain::measurement::Quantity;
use anyhow::bail;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Refresh every hour unless configured otherwise
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 3_600_000;

const ENV_PREFIX: &str = "CONTROL_CHARTS";

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default)]
    pub x_axis: XAxisMode,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    pub source: SourceConfig,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Mysql(MysqlSettings),
    Influx(InfluxSettings),
    Spreadsheet(SpreadsheetSettings),
}

#[derive(Debug, Deserialize, Clone)]
pub struct MysqlSettings {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub query: String,
    #[serde(default)]
    pub columns: ColumnMapping,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    pub query: String,
    #[serde(default = "ColumnMapping::influx")]
    pub columns: ColumnMapping,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpreadsheetSettings {
    pub path: PathBuf,
    pub sheet: String,
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// Names of the label column and the four value columns
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ColumnMapping {
    pub label: String,
    pub bhz: String,
    pub vhz: String,
    pub ic: String,
    pub pressure: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            label: "label".to_string(),
            bhz: "bhz".to_string(),
            vhz: "vhz".to_string(),
            ic: "ic".to_string(),
            pressure: "pressure".to_string(),
        }
    }
}

impl ColumnMapping {
    fn influx() -> Self {
        Self {
            label: "time".to_string(),
            ..Self::default()
        }
    }

    pub fn value_column(&self, quantity: Quantity) -> &str {
        match quantity {
            Quantity::Bhz => &self.bhz,
            Quantity::Vhz => &self.vhz,
            Quantity::Ic => &self.ic,
            Quantity::Pressure => &self.pressure,
        }
    }

    /// Columns in `available` that this mapping needs but cannot find
    pub fn missing<'a, S: AsRef<str>>(&'a self, available: &[S]) -> Vec<&'a str> {
        std::iter::once(self.label.as_str())
            .chain(Quantity::ALL.iter().map(|q| self.value_column(*q)))
            .filter(|wanted| !available.iter().any(|a| a.as_ref() == *wanted))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChartConfig {
    pub quantity: Quantity,
    pub title: String,
    pub y_min: f64,
    pub y_max: f64,
    pub y_label: String,
    pub upper_limit: Option<f64>,
    pub lower_limit: Option<f64>,
}

impl ChartConfig {
    /// Chart setup used when the config file leaves a quantity out
    pub fn preset(quantity: Quantity) -> Self {
        let (title, y_min, y_max, y_label, limits) = match quantity {
            Quantity::Bhz => ("Temperature BHZ", 950.0, 1010.0, "Temperature [°C]", Some((995.0, 965.0))),
            Quantity::Vhz => ("Temperature VHZ", 565.0, 635.0, "Temperature [°C]", Some((620.0, 580.0))),
            Quantity::Ic => ("Average Ic", 300.0, 700.0, "Current [A]", None),
            Quantity::Pressure => ("Pressure", 5.0, 7.0, "Pressure [bar]", Some((6.5, 5.5))),
        };
        Self {
            quantity,
            title: title.to_string(),
            y_min,
            y_max,
            y_label: y_label.to_string(),
            upper_limit: limits.map(|(upper, _)| upper),
            lower_limit: limits.map(|(_, lower)| lower),
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be greater than zero");
        }

        let mut seen = HashSet::new();
        for chart in &self.charts {
            if !seen.insert(chart.quantity) {
                bail!("chart for {} is configured more than once", chart.quantity);
            }
        }

        let query = match &self.source {
            SourceConfig::Mysql(s) => Some(&s.query),
            SourceConfig::Influx(s) => Some(&s.query),
            SourceConfig::Spreadsheet(_) => None,
        };
        if query.is_some_and(|q| q.trim().is_empty()) {
            bail!("source query must not be empty");
        }

        Ok(())
    }
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_output_path() -> PathBuf {
    PathBuf::from("control-charts.png")
}

fn default_mysql_port() -> u16 {
    3306
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    load_dashboard_config_from(Path::new("config/dashboard"))
}

/// Load from a file (extension optional) with `CONTROL_CHARTS__*` overrides
pub fn load_dashboard_config_from(path: &Path) -> anyhow::Result<DashboardConfig> {
    let name = path.to_string_lossy();
    let settings = config::Config::builder()
        .add_source(config::File::with_name(&name))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let dashboard: DashboardConfig = settings.try_deserialize()?;
    dashboard.validate()?;
    Ok(dashboard)
}

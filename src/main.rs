// Main entry point - Dependency injection and refresh loop setup
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use control_charts::application::dashboard::Dashboard;
use control_charts::application::measurement_source::MeasurementSource;
use control_charts::application::refresh_scheduler::RefreshScheduler;
use control_charts::application::sampler::Sampler;
use control_charts::infrastructure::config::{SourceConfig, load_dashboard_config};
use control_charts::infrastructure::influx_source::InfluxSource;
use control_charts::infrastructure::mysql_source::MysqlSource;
use control_charts::infrastructure::png_surface::{DEFAULT_SIZE, PngSurface};
use control_charts::infrastructure::spreadsheet_source::SpreadsheetSource;
use control_charts::presentation::dashboard_view::DashboardView;

fn build_source(config: &SourceConfig) -> Arc<dyn MeasurementSource> {
    match config {
        SourceConfig::Mysql(settings) => Arc::new(MysqlSource::new(settings)),
        SourceConfig::Influx(settings) => Arc::new(InfluxSource::new(settings)),
        SourceConfig::Spreadsheet(settings) => Arc::new(SpreadsheetSource::new(settings)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("control_charts=info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create data source (infrastructure layer)
    let source = build_source(&config.source);
    tracing::info!("Using {} data source", source.name());

    // Build charts and bind them to the output surface (presentation layer)
    let mut dashboard = Dashboard::from_config(&config.charts)?;
    let surface = PngSurface::new(config.output_path.clone(), DEFAULT_SIZE, config.x_axis);
    let mut view = DashboardView::setup(surface, &dashboard)?;

    // Run the refresh loop until Ctrl-C
    let scheduler = RefreshScheduler::new(Sampler::new(source, config.x_axis), config.refresh_interval());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };
    scheduler.run(&mut dashboard, &mut view, shutdown).await;

    Ok(())
}

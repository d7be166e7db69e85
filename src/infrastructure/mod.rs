// Infrastructure layer - External data sources, config and rendering
pub mod config;
pub mod influx_source;
pub mod mysql_source;
pub mod png_surface;
pub mod spreadsheet_source;

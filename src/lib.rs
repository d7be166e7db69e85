//! Control chart dashboard: four process charts with control limits,
//! refreshed on a fixed interval from MySQL, InfluxDB or a spreadsheet.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Presentation layer - Shell contract and dashboard binding
pub mod chart_surface;
pub mod dashboard_view;

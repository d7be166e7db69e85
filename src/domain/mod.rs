// Domain layer - Control chart models and refresh state
pub mod chart;
pub mod measurement;
pub mod refresh;

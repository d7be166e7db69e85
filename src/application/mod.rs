// Application layer - Sampling, dashboard state and refresh orchestration
pub mod dashboard;
pub mod measurement_source;
pub mod refresh_scheduler;
pub mod sampler;

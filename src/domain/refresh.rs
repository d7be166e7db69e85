// Refresh cycle state and status indicator
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Fetching,
}

impl RefreshState {
    /// Timer fire or startup. Returns true when a fetch should start.
    pub fn on_trigger(&mut self) -> bool {
        match self {
            RefreshState::Idle => {
                *self = RefreshState::Fetching;
                true
            }
            RefreshState::Fetching => false,
        }
    }

    pub fn on_complete(&mut self) {
        *self = RefreshState::Idle;
    }
}

/// What the shell shows as its status indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl RefreshStatus {
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_success = Some(at);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn summary(&self) -> String {
        let updated = self
            .last_success
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        match &self.last_error {
            Some(error) => format!(
                "Last update: {} | refresh failed ({} in a row): {}",
                updated, self.consecutive_failures, error
            ),
            None => format!("Last update: {}", updated),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Per-source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Emit a warning when a registration is rejected as malformed.
    ///
    /// Defaults to on in debug builds and off in release builds. Has no
    /// effect on what gets registered.
    pub report_invalid_registrations: bool,
}

impl SourceConfig {
    /// Toggle the invalid registration warning.
    pub fn with_invalid_registration_reports(mut self, enabled: bool) -> Self {
        self.report_invalid_registrations = enabled;
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            report_invalid_registrations: cfg!(debug_assertions),
        }
    }
}

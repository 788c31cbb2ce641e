//! Host environment probe backed by configuration

use bookmart_core::EnvironmentProbe;
use bookmart_domain::EnvironmentConfig;

/// Answers environment questions from the loaded [`EnvironmentConfig`].
///
/// The debug flag is only ever set by configuration the operator controls;
/// anything unset reads as a production runtime with an unknown app id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    debug: bool,
    app_id: String,
}

impl HostEnvironment {
    pub fn new(debug: bool, app_id: impl Into<String>) -> Self {
        Self { debug, app_id: app_id.into() }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(config.debug, config.app_id.trim())
    }
}

impl EnvironmentProbe for HostEnvironment {
    fn is_debug_environment(&self) -> bool {
        self.debug
    }

    fn app_id(&self) -> String {
        self.app_id.clone()
    }
}

//! Candidate base resolution

use std::sync::Arc;

use bookmart_domain::constants::API_BASE_OVERRIDE_KEY;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use super::ports::EnvironmentProbe;
use crate::session::ports::KeyValueStore;

/// Trim surrounding whitespace and trailing slashes from a base URL.
pub fn normalize_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// Produces the ordered list of base URLs to try for one outer call.
///
/// The list is re-derived on every call so that an operator changing the
/// override takes effect immediately. The only state kept between calls is
/// the last base that answered successfully, which is promoted to the front.
pub struct EndpointResolver {
    production_base: String,
    probe: Arc<dyn EnvironmentProbe>,
    store: Arc<dyn KeyValueStore>,
    last_successful: RwLock<Option<String>>,
}

impl EndpointResolver {
    /// Create a resolver
    ///
    /// # Arguments
    /// * `production_base` - Canonical base, always present as the final
    ///   fallback
    /// * `probe` - Host environment probe deciding whether the override applies
    /// * `store` - Local configuration storage holding the override
    pub fn new(
        production_base: impl AsRef<str>,
        probe: Arc<dyn EnvironmentProbe>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            production_base: normalize_base(production_base.as_ref()),
            probe,
            store,
            last_successful: RwLock::new(None),
        }
    }

    pub fn production_base(&self) -> &str {
        &self.production_base
    }

    /// Ordered, deduplicated, non-empty list of candidate bases.
    pub async fn resolve_candidates(&self) -> Vec<String> {
        let mut raw = Vec::with_capacity(2);
        if self.probe.is_debug_environment() {
            if let Some(override_base) = self.read_override().await {
                raw.push(override_base);
            }
        }
        raw.push(self.production_base.clone());

        let mut candidates: Vec<String> = Vec::with_capacity(raw.len());
        for base in raw.iter().map(|base| normalize_base(base)) {
            if !base.is_empty() && !candidates.contains(&base) {
                candidates.push(base);
            }
        }

        if let Some(sticky) = self.last_successful.read().as_ref() {
            if let Some(position) = candidates.iter().position(|base| base == sticky) {
                let promoted = candidates.remove(position);
                candidates.insert(0, promoted);
            }
        }

        if candidates.is_empty() {
            candidates.push(self.production_base.clone());
        }

        debug!(candidates = ?candidates, "resolved API base candidates");
        candidates
    }

    /// Remember `base` as the preferred candidate for the next call.
    pub fn record_success(&self, base: &str) {
        let base = normalize_base(base);
        let mut last = self.last_successful.write();
        if last.as_deref() != Some(base.as_str()) {
            debug!(base = %base, "recording last successful API base");
            *last = Some(base);
        }
    }

    pub fn last_successful_base(&self) -> Option<String> {
        self.last_successful.read().clone()
    }

    async fn read_override(&self) -> Option<String> {
        match self.store.read(API_BASE_OVERRIDE_KEY).await {
            Ok(Some(Value::String(value))) => Some(value),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable API base override");
                None
            }
        }
    }
}

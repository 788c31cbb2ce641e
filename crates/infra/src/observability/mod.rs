//! Tracing bootstrap for applications embedding the client.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,bookmart_core=info,bookmart_infra=info";
const ENV_LOG: &str = "BOOKMART_LOG";
const ENV_LOG_FORMAT: &str = "BOOKMART_LOG_FORMAT";

/// Initialize the global tracing subscriber.
///
/// Filter precedence:
/// 1) `RUST_LOG`
/// 2) `BOOKMART_LOG`
/// 3) internal default filter
///
/// `BOOKMART_LOG_FORMAT=json` switches to JSON lines. Calling this more than
/// once is harmless; only the first subscriber is installed.
pub fn init_tracing() {
    let filter = filter_from_env();
    let builder = tracing_subscriber::fmt().with_target(true).with_env_filter(filter);

    let installed = if json_output() {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    if installed.is_ok() {
        tracing::debug!("tracing subscriber installed");
    }
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if let Some(filter) = env::var(ENV_LOG)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
    {
        return filter;
    }

    EnvFilter::new(DEFAULT_FILTER)
}

fn json_output() -> bool {
    env::var(ENV_LOG_FORMAT).is_ok_and(|format| format.trim().eq_ignore_ascii_case("json"))
}

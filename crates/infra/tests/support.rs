#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use bookmart_core::testing::CountingLoginCodes;
use bookmart_domain::ClientConfig;
use bookmart_infra::{BookMartClient, MemoryKeyValueStore};

pub const APP_ID: &str = "wx-integration";

/// Client pointed at `production_base` with an in-memory session.
pub struct TestClient {
    pub client: BookMartClient,
    pub codes: Arc<CountingLoginCodes>,
}

pub fn config_for(production_base: &str, debug: bool) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.production_base = production_base.to_string();
    config.api.timeout_secs = 2;
    config.storage.path = None;
    config.environment.debug = debug;
    config.environment.app_id = APP_ID.to_string();
    config
}

pub fn client_for(production_base: &str, debug: bool) -> TestClient {
    client_with_config(config_for(production_base, debug))
}

pub fn client_with_config(config: ClientConfig) -> TestClient {
    let codes = Arc::new(CountingLoginCodes::new());
    let client = BookMartClient::builder(config)
        .login_codes(codes.clone())
        .store(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .expect("client should build");
    TestClient { client, codes }
}

/// Base URL nothing listens on.
pub fn dead_base() -> String {
    dead_bases(1).remove(0)
}

/// Distinct base URLs nothing listens on.
pub fn dead_bases(count: usize) -> Vec<String> {
    let listeners: Vec<TcpListener> = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port"))
        .collect();
    listeners
        .iter()
        .map(|listener| format!("http://{}", listener.local_addr().expect("local addr")))
        .collect()
}

use serde::{Deserialize, Serialize};

/// Where reservation change notifications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeMode {
    /// Server-sent events from `realtime_url`.
    #[default]
    Sse,
    /// In-process feed; changes are published by the embedding app.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationPickerKind {
    #[default]
    Map,
    Static,
}

/// Configuration of the partner_core module (`modules.partner_core`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerCoreConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default)]
    pub realtime: RealtimeMode,
    /// Defaults to `{backend_url}/realtime/v1`.
    #[serde(default)]
    pub realtime_url: Option<String>,
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
    #[serde(default)]
    pub mapbox_token: String,
    #[serde(default)]
    pub location_picker: LocationPickerKind,
    #[serde(default = "default_reset_redirect")]
    pub reset_redirect: String,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Local state file, relative to `app.home_dir`.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for PartnerCoreConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            anon_key: String::new(),
            realtime: RealtimeMode::default(),
            realtime_url: None,
            geocoding_base_url: default_geocoding_base_url(),
            mapbox_token: String::new(),
            location_picker: LocationPickerKind::default(),
            reset_redirect: default_reset_redirect(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            state_file: default_state_file(),
        }
    }
}

impl PartnerCoreConfig {
    pub fn resolved_realtime_url(&self) -> String {
        self.realtime_url.clone().unwrap_or_else(|| {
            format!("{}/realtime/v1", self.backend_url.trim_end_matches('/'))
        })
    }
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_geocoding_base_url() -> String {
    crate::infra::geocoding::mapbox::DEFAULT_BASE_URL.to_string()
}

fn default_reset_redirect() -> String {
    "partnerapp://reset-password".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_state_file() -> String {
    "state.json".to_string()
}

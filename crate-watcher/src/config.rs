use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rust_log: String,
    pub token: String,
    pub branch: String,
    pub base_url: Option<String>,
    pub period_secs: Option<u64>,
    #[serde(default)]
    pub notifications: bool,
}

use crate::gemini::DEFAULT_BASE_URL;
use crate::prompt::resolve_model_name;

/// Credential lookup order; the first non-empty variable wins.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
        let model = resolve_model_name(lookup("GEMINI_MODEL").as_deref());
        let base_url = lookup("GEMINI_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080);
        Self { api_key, model, base_url, port }
    }
}

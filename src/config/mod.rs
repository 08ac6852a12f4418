pub mod settings;

pub use settings::{
    Config, GoogleConfig, ImageProxyConfig, LogRotation, LoggingConfig, NaverConfig,
    OpenAiConfig, OrchestratorConfig, PersonalAgentConfig, PreviewConfig, ServerConfig,
};

use crate::directory::Directory;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default configuration file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("krc-assistant");
    Ok(config_dir.join("config.toml"))
}

/// Load configuration: `$KRC_CONFIG` or the default path if present, then
/// environment overrides on top.
///
/// Also returns warnings about ignored values. Logging is not set up yet
/// at this point, so the caller logs them once it is.
pub fn load() -> Result<(Config, Vec<String>)> {
    let path = match std::env::var("KRC_CONFIG") {
        Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
        _ => config_path().ok().filter(|p| p.exists()),
    };

    let mut config = match path {
        Some(path) => load_file(&path)?,
        None => Config::default(),
    };

    let warnings = apply_env(&mut config, |key| std::env::var(key).ok());
    Ok((config, warnings))
}

/// Load configuration from a TOML file
pub fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Apply deployment environment variables. Empty values are ignored;
/// invalid ones are skipped and reported in the returned list.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut warnings = Vec::new();

    if let Some(v) = get("OPENAI_API_KEY") {
        config.openai.api_key = Some(v);
    }
    if let Some(v) = get("OPENAI_MODEL") {
        config.openai.model = v;
    }
    if let Some(v) = get("OPENAI_API_URL") {
        config.openai.chat_url = v;
    }
    if let Some(v) = get("OPENAI_RESPONSES_URL") {
        config.openai.responses_url = v;
    }
    if let Some(v) = get("PERSONAL_AGENT_API_KEY") {
        config.personal_agent.api_key = Some(v);
    }
    if let Some(v) = get("PERSONAL_AGENT_API_URL") {
        config.personal_agent.api_url = v;
    }
    if let Some(v) = get("GOOGLE_API_KEY") {
        config.google.api_key = Some(v);
    }
    if let Some(v) = get("GOOGLE_SEARCH_ENGINE_ID") {
        config.google.search_engine_id = Some(v);
    }
    if let Some(v) = get("NAVER_CLIENT_ID") {
        config.naver.client_id = Some(v);
    }
    if let Some(v) = get("NAVER_CLIENT_SECRET") {
        config.naver.client_secret = Some(v);
    }
    if let Some(v) = get("HOST") {
        config.server.host = v;
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse() {
            Ok(p) => config.server.port = p,
            Err(_) => warnings.push(format!("ignoring invalid PORT value {port:?}")),
        }
    }
    if let Some(v) = get("KRC_DIRECTORY") {
        config.directory_path = Some(v);
    }
    warnings
}

/// Directory data named by the config, or the built-in copy
pub fn load_directory(config: &Config) -> Result<Directory> {
    match config.directory_path.as_deref() {
        Some(path) => Directory::load(Path::new(path)),
        None => Directory::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        let warnings = apply_env(
            &mut config,
            lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4o-mini"),
                ("PORT", "8081"),
                ("NAVER_CLIENT_ID", "id"),
            ]),
        );

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.naver.client_id.as_deref(), Some("id"));
        assert!(config.naver.client_secret.is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn empty_and_invalid_env_values_are_ignored() {
        let mut config = Config::default();
        let warnings = apply_env(
            &mut config,
            lookup(&[("OPENAI_API_KEY", "  "), ("PORT", "not-a-port")]),
        );

        assert!(config.openai.api_key.is_none());
        assert_eq!(config.server.port, 3000);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("not-a-port"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [openai]
            model = "gpt-4o"

            [preview]
            retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.history_window, 10);
        assert_eq!(config.preview.retries, 3);
        assert_eq!(config.preview.max_concurrent, 2);
        assert_eq!(config.logging.rotation, LogRotation::Daily);
    }
}

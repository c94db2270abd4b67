use anyhow::Context;
use directories::BaseDirs;
use pink_core::ApiToken;
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HfFileConfig {
    pub api_token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub stream: Option<bool>,
    pub stream_idle_timeout_ms: Option<u64>,
    pub default_category: Option<String>,
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HfConfig {
    pub api_token: Option<ApiToken>,
    pub base_url: String,
    pub timeout: Duration,
    pub stream: bool,
    pub stream_idle_timeout: Duration,
    pub proxy: Option<String>,
    pub default_category: Option<String>,
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
}

impl HfConfig {
    /// `.env`, then the process environment, then `config.toml`. Environment
    /// values take precedence for the token and base URL.
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let file = match Self::config_path() {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => HfFileConfig::default(),
        };
        Self::resolve(file, |k| env::var(k).ok())
    }

    pub fn resolve<F>(file: HfFileConfig, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = env("HUGGINGFACE_API_TOKEN")
            .or_else(|| env("HF_TOKEN"))
            .or(file.api_token)
            .and_then(ApiToken::new);

        let base_url = env("HF_INFERENCE_BASE_URL")
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let parsed =
            Url::parse(&base_url).with_context(|| format!("invalid base url: {}", base_url))?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "base url must be http(s): {}",
            base_url
        );

        let proxy = env("HTTPS_PROXY").or_else(|| env("HTTP_PROXY"));

        Ok(HfConfig {
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(file.timeout_ms.unwrap_or(60_000)),
            stream: file.stream.unwrap_or(true),
            stream_idle_timeout: Duration::from_millis(
                file.stream_idle_timeout_ms.unwrap_or(120_000),
            ),
            proxy,
            default_category: file.default_category,
            default_model: file.default_model,
            system_prompt: file.system_prompt,
        })
    }

    fn read_file(path: &Path) -> anyhow::Result<HfFileConfig> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config file: {}", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".pinkai").join("config.toml")
        } else {
            base.config_dir().join("pinkai").join("config.toml")
        };
        Some(p)
    }
}

//! Runtime configuration loaded from environment variables.

use anyhow::{bail, Context, Result};
use std::{env, str::FromStr, time::Duration};

use crate::{generator::FailurePolicy, llm::DEMO_KEY};

#[derive(Debug, Clone)]
pub struct Config {
    /// Completion provider key; `DEMO_KEY` serves canned copy offline.
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub provider_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub post_delay: Duration,
    pub upload_base_url: String,
    pub max_upload_bytes: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            api_key: string("OPENROUTER_API_KEY", DEMO_KEY),
            api_base: string("OPENROUTER_API_BASE", "https://openrouter.ai/api/v1"),
            model: string("REMIXAI_MODEL", "google/gemini-2.0-flash-001"),
            provider_timeout: Duration::from_secs(parse(&lookup, "REMIXAI_PROVIDER_TIMEOUT_SECS", 30)?),
            failure_policy: parse_policy(&string("REMIXAI_FAILURE_POLICY", "lenient"))?,
            post_delay: Duration::from_millis(parse(&lookup, "REMIXAI_POST_DELAY_MS", 1000)?),
            upload_base_url: string("REMIXAI_UPLOAD_BASE_URL", "https://demo.remixai.com/images"),
            max_upload_bytes: parse(&lookup, "REMIXAI_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse(&lookup, "PORT", 8080)?,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_policy(raw: &str) -> Result<FailurePolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "lenient" => Ok(FailurePolicy::Lenient),
        "strict" => Ok(FailurePolicy::Strict),
        other => bail!("invalid value for REMIXAI_FAILURE_POLICY: {other:?} (expected lenient or strict)"),
    }
}

use std::time::Duration;

use anyhow::{bail, Context};
use buzke_booking::api::DEFAULT_TIMEOUT_SECS;
use buzke_booking::ApiConfig;
use chrono::FixedOffset;

const DEFAULT_BUSINESS: &str = "mdbeautystudio";
const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub api: ApiConfig,
    /// Profile whose services the bot books.
    pub business_username: String,
    /// Receives ERROR logs when set.
    pub admin_tg_id: Option<i64>,
    pub utc_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = var("BOT_TOKEN").context("BOT_TOKEN must be set")?;
        let api_url = var("API_URL").context("API_URL must be set")?;

        let timeout_secs = match var("API_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("API_TIMEOUT_SECS must be a number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let api = ApiConfig::new(api_url.trim(), Duration::from_secs(timeout_secs))
            .with_context(|| format!("API_URL is not a valid base URL: {api_url}"))?;

        let admin_tg_id = var("ADMIN_TG_ID")
            .map(|raw| raw.trim().parse::<i64>())
            .transpose()
            .context("ADMIN_TG_ID must be a number")?;

        let offset_hours = match var("BUSINESS_UTC_OFFSET_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .context("BUSINESS_UTC_OFFSET_HOURS must be a whole number of hours")?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let Some(utc_offset) = FixedOffset::east_opt(offset_hours * 3600) else {
            bail!("BUSINESS_UTC_OFFSET_HOURS out of range: {offset_hours}");
        };

        Ok(Self {
            bot_token,
            api,
            business_username: var("BUSINESS_USERNAME")
                .map(|u| u.trim().to_string())
                .unwrap_or_else(|| DEFAULT_BUSINESS.to_string()),
            admin_tg_id,
            utc_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BOT_TOKEN", "123:abc"), ("API_URL", "https://api.buzke.com.br")]).unwrap();
        assert_eq!(config.business_username, "mdbeautystudio");
        assert_eq!(config.admin_tg_id, None);
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        assert_eq!(config.utc_offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BOT_TOKEN", "123:abc"),
            ("API_URL", "https://api.buzke.com.br/v2"),
            ("BUSINESS_USERNAME", "petcenter"),
            ("ADMIN_TG_ID", "4242"),
            ("API_TIMEOUT_SECS", "30"),
            ("BUSINESS_UTC_OFFSET_HOURS", "-4"),
        ])
        .unwrap();
        assert_eq!(config.business_username, "petcenter");
        assert_eq!(config.admin_tg_id, Some(4242));
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.utc_offset.local_minus_utc(), -4 * 3600);
        assert_eq!(config.api.base_url.path(), "/v2");
    }

    #[test]
    fn test_missing_token_fails() {
        let err = load(&[("API_URL", "https://api.buzke.com.br")]).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(load(&[("BOT_TOKEN", "t"), ("API_URL", "nope")]).is_err());
        assert!(load(&[
            ("BOT_TOKEN", "t"),
            ("API_URL", "https://x.y"),
            ("ADMIN_TG_ID", "admin")
        ])
        .is_err());
        assert!(load(&[
            ("BOT_TOKEN", "t"),
            ("API_URL", "https://x.y"),
            ("BUSINESS_UTC_OFFSET_HOURS", "30")
        ])
        .is_err());
    }
}

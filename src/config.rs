use clap::Args;

use crate::{
    errors::ConfigError,
    journal::{DEFAULT_BASE_URL, JournalConfig},
};

/// Journal credentials. Each flag falls back to its environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct NotionArgs {
    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    /// Target database id
    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub notion_database_id: Option<String>,

    /// API host, overridable for testing
    #[arg(long, env = "NOTION_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub notion_base_url: String,
}

fn required(value: Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

impl NotionArgs {
    /// Checks that both credentials are present before anything is sent.
    pub fn validate(self) -> Result<JournalConfig, ConfigError> {
        let api_key = required(self.notion_api_key, "NOTION_API_KEY")?;
        let database_id = required(self.notion_database_id, "NOTION_DATABASE_ID")?;
        let base_url = self.notion_base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::BadBaseUrl(base_url));
        }
        Ok(JournalConfig {
            api_key,
            database_id,
            base_url,
        })
    }
}

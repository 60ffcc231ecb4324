use std::collections::HashMap;
use std::env;
use std::fs;

use crate::error::{Error, Result};

// KEY=VALUE file pointed at by the CONFIG_FILE env var. Values here back
// fill CLI flags (CALDAV_URL, CALDAV_USERNAME, CALDAV_PASSWORD, ...), so
// credentials can stay out of shell history.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn load() -> Self {
        match env::var("CONFIG_FILE") {
            Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
            Err(_) => AppConfig::default(),
        }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidArgument(format!("cannot read config file {}: {}", path, e))
        })?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(Error::InvalidArgument(format!(
                    "invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            // A lone quote is not a quoted pair, keep it as-is.
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    // Config file wins over process env so one file can fully describe a
    // calendar without clearing the shell environment first.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

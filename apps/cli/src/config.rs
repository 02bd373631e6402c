use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub database_url: String,
    pub token: String,
    pub user_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3000".into(),
            database_url: "sqlite://./data/client.db".into(),
            token: String::new(),
            user_id: String::new(),
        }
    }
}

/// Defaults, overridden by `ferrochat.toml`, overridden by `FERROCHAT__*`
/// environment variables. Command-line flags win over all of these.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("ferrochat.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("token") {
                settings.token = v.clone();
            }
            if let Some(v) = file_cfg.get("user_id") {
                settings.user_id = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("FERROCHAT__SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("FERROCHAT__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("FERROCHAT__TOKEN") {
        settings.token = v;
    }
    if let Ok(v) = std::env::var("FERROCHAT__USER_ID") {
        settings.user_id = v;
    }

    settings
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
    }

    #[test]
    fn leaves_memory_and_full_urls_untouched() {
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_database_url("sqlite:///tmp/a.db"),
            "sqlite:///tmp/a.db"
        );
    }

    #[test]
    fn empty_url_falls_back_to_default() {
        assert_eq!(
            normalize_database_url("  "),
            Settings::default().database_url
        );
    }
}

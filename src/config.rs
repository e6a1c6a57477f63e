//! Storefront configuration.
//!
//! Each field resolves from its environment variable first, then from the
//! `storefront` category of `local_settings`, then from a built-in default.
//! The data directory is resolved before the database exists, so it only
//! honours the environment.

use reqwest::Url;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::db::{self, DbState};
use crate::menu::MenuSource;

pub(crate) const SETTINGS_CATEGORY: &str = "storefront";

const ENV_DATA_DIR: &str = "BAKERY_DATA_DIR";
const ENV_FORM_ENDPOINT: &str = "BAKERY_FORM_ENDPOINT";
const ENV_MENU_SOURCE: &str = "BAKERY_MENU_SOURCE";
const ENV_CURRENCY: &str = "BAKERY_CURRENCY";

const KEY_FORM_ENDPOINT: &str = "form_endpoint";
const KEY_MENU_SOURCE: &str = "menu_source";
const KEY_CURRENCY: &str = "currency";

const DEFAULT_FORM_ENDPOINT: &str = "https://formspree.io/f/bakery-orders";
const DEFAULT_CURRENCY: &str = "$";
const APP_DIR_NAME: &str = "bakery-storefront";

#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    pub data_dir: PathBuf,
    pub form_endpoint: String,
    pub menu_source: MenuSource,
    pub currency: String,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Base directory for app data (database, logs).
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = env_value(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join(APP_DIR_NAME)
}

/// Accept only http(s) endpoints without embedded credentials.
pub fn validate_form_endpoint(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Form endpoint cannot be empty".into());
    }
    let parsed = Url::parse(trimmed).map_err(|e| format!("Invalid form endpoint: {e}"))?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "https" && scheme != "http" {
        return Err("Only http/https form endpoints are allowed".into());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("Credentialed form endpoints are not allowed".into());
    }
    if parsed.host_str().is_none() {
        return Err("Form endpoint is missing a host".into());
    }
    Ok(trimmed.to_string())
}

impl StorefrontConfig {
    /// Resolve the configuration against an opened database.
    pub fn load(data_dir: PathBuf, db: &DbState) -> Self {
        let stored = |key: &str| -> Option<String> {
            let conn = db.conn.lock().ok()?;
            db::get_setting(&conn, SETTINGS_CATEGORY, key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let form_endpoint = env_value(ENV_FORM_ENDPOINT)
            .or_else(|| stored(KEY_FORM_ENDPOINT))
            .and_then(|raw| match validate_form_endpoint(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "ignoring configured form endpoint");
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_FORM_ENDPOINT.to_string());

        let menu_source = MenuSource::from_value(
            env_value(ENV_MENU_SOURCE)
                .or_else(|| stored(KEY_MENU_SOURCE))
                .as_deref(),
        );

        let currency = env_value(ENV_CURRENCY)
            .or_else(|| stored(KEY_CURRENCY))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let config = Self {
            data_dir,
            form_endpoint,
            menu_source,
            currency,
        };
        info!(
            data_dir = %config.data_dir.display(),
            form_endpoint = %config.form_endpoint,
            menu_source = %config.menu_source.describe(),
            currency = %config.currency,
            "storefront configuration resolved"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [ENV_DATA_DIR, ENV_FORM_ENDPOINT, ENV_MENU_SOURCE, ENV_CURRENCY] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn endpoint_validation() {
        assert!(validate_form_endpoint("https://formspree.io/f/abc").is_ok());
        assert!(validate_form_endpoint("http://localhost:8080/orders").is_ok());
        assert!(validate_form_endpoint("").is_err());
        assert!(validate_form_endpoint("ftp://example.com/x").is_err());
        assert!(validate_form_endpoint("https://user:pw@example.com/x").is_err());
        assert!(validate_form_endpoint("not a url").is_err());
    }

    #[test]
    #[serial]
    fn defaults_when_nothing_configured() {
        clear_env();
        let db = db::init_in_memory();
        let cfg = StorefrontConfig::load(PathBuf::from("/tmp/x"), &db);
        assert_eq!(cfg.form_endpoint, DEFAULT_FORM_ENDPOINT);
        assert_eq!(cfg.menu_source, MenuSource::Inline);
        assert_eq!(cfg.currency, DEFAULT_CURRENCY);
    }

    #[test]
    #[serial]
    fn stored_settings_apply_and_env_wins() {
        clear_env();
        let db = db::init_in_memory();
        {
            let conn = db.conn.lock().unwrap();
            db::set_setting(&conn, SETTINGS_CATEGORY, KEY_FORM_ENDPOINT, "https://forms.example/f/1")
                .unwrap();
            db::set_setting(&conn, SETTINGS_CATEGORY, KEY_CURRENCY, "\u{20ac}").unwrap();
        }
        let cfg = StorefrontConfig::load(PathBuf::from("/tmp/x"), &db);
        assert_eq!(cfg.form_endpoint, "https://forms.example/f/1");
        assert_eq!(cfg.currency, "\u{20ac}");

        std::env::set_var(ENV_FORM_ENDPOINT, "https://forms.example/f/env");
        std::env::set_var(ENV_MENU_SOURCE, "https://bakery.example/menu.json");
        let cfg = StorefrontConfig::load(PathBuf::from("/tmp/x"), &db);
        assert_eq!(cfg.form_endpoint, "https://forms.example/f/env");
        assert_eq!(
            cfg.menu_source,
            MenuSource::Url("https://bakery.example/menu.json".to_string())
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_endpoint_falls_back_to_default() {
        clear_env();
        std::env::set_var(ENV_FORM_ENDPOINT, "javascript:alert(1)");
        let db = db::init_in_memory();
        let cfg = StorefrontConfig::load(PathBuf::from("/tmp/x"), &db);
        assert_eq!(cfg.form_endpoint, DEFAULT_FORM_ENDPOINT);
        clear_env();
    }

    #[test]
    #[serial]
    fn data_dir_env_override() {
        clear_env();
        std::env::set_var(ENV_DATA_DIR, "/srv/bakery");
        assert_eq!(default_data_dir(), PathBuf::from("/srv/bakery"));
        clear_env();
        assert!(default_data_dir().ends_with(APP_DIR_NAME));
    }
}

//! Loading and validating `guard.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use authgate_api::{GuardConfig, GuardError, GuardMode, Redirects};
use serde::Deserialize;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "guard.toml";

pub const ENV_API_BASE_URL: &str = "AUTHGATE_API_BASE_URL";
pub const ENV_MODE: &str = "AUTHGATE_MODE";
/// Set but blank selects the fallback view instead of a redirect.
pub const ENV_REDIRECT_ON_FAIL: &str = "AUTHGATE_REDIRECT_ON_FAIL";
pub const ENV_REDIRECT_ON_SUCCESS: &str = "AUTHGATE_REDIRECT_ON_SUCCESS";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    api_base_url: String,
    #[serde(default)]
    mode: GuardMode,
    #[serde(default)]
    redirects: Redirects,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawHttp {
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    extra_headers: BTreeMap<String, String>,
}

impl Default for RawHttp {
    fn default() -> Self {
        let defaults = GuardConfig::default();
        Self {
            connect_timeout_ms: defaults.connect_timeout_ms,
            request_timeout_ms: defaults.request_timeout_ms,
            extra_headers: defaults.extra_headers,
        }
    }
}

impl From<RawConfig> for GuardConfig {
    fn from(raw: RawConfig) -> Self {
        GuardConfig {
            api_base_url: raw.api_base_url,
            mode: raw.mode,
            redirects: raw.redirects,
            connect_timeout_ms: raw.http.connect_timeout_ms,
            request_timeout_ms: raw.http.request_timeout_ms,
            extra_headers: raw.http.extra_headers,
        }
    }
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("authgate")
    } else {
        PathBuf::from(".authgate")
    }
}

pub fn parse_config(content: &str) -> Result<GuardConfig, GuardError> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| GuardError::Config(format!("invalid TOML: {e}")))?;
    let config = GuardConfig::from(raw);
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_dir(dir: &Path) -> Result<GuardConfig, GuardError> {
    load_config_from_file(&dir.join(CONFIG_FILE_NAME))
}

pub fn load_config_from_file(path: &Path) -> Result<GuardConfig, GuardError> {
    let content = fs::read_to_string(path)
        .map_err(|e| GuardError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_config(&content)
        .map_err(|e| GuardError::Config(format!("{}: {e}", path.display())))
}

/// Overlay `AUTHGATE_*` values from `lookup` onto `config`.
pub fn apply_overrides<F>(mut config: GuardConfig, lookup: F) -> Result<GuardConfig, GuardError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_API_BASE_URL) {
        config.api_base_url = url;
    }
    if let Some(mode) = get(ENV_MODE) {
        config.mode = mode.parse()?;
    }
    if let Some(target) = lookup(ENV_REDIRECT_ON_FAIL) {
        config.redirects.on_fail = target.trim().to_string();
    }
    if let Some(target) = get(ENV_REDIRECT_ON_SUCCESS) {
        config.redirects.on_success = target;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Overlay the process environment onto `config`.
pub fn apply_env(config: GuardConfig) -> Result<GuardConfig, GuardError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

pub fn validate_config(config: &GuardConfig) -> Result<(), GuardError> {
    let base = config.api_base_url.trim();
    if !base.is_empty() && !base.starts_with('/') {
        let url = Url::parse(base)
            .map_err(|e| GuardError::Config(format!("api_base_url {base:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GuardError::Config(format!(
                "api_base_url must use http or https, got {}",
                url.scheme()
            )));
        }
    }

    for (name, target) in [
        ("redirects.on_fail", &config.redirects.on_fail),
        ("redirects.on_success", &config.redirects.on_success),
    ] {
        if !is_redirect_target(target) {
            return Err(GuardError::Config(format!(
                "{name} must be empty, a path starting with '/', or an http(s) URL: {target:?}"
            )));
        }
    }

    if config.connect_timeout_ms == 0 || config.request_timeout_ms == 0 {
        return Err(GuardError::Config(
            "http timeouts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn is_redirect_target(target: &str) -> bool {
    if target.is_empty() || target.starts_with('/') {
        return true;
    }
    Url::parse(target).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

pub fn write_default_config_file(dir: &Path) -> Result<PathBuf, GuardError> {
    fs::create_dir_all(dir)
        .map_err(|e| GuardError::Config(format!("failed to create {}: {e}", dir.display())))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        fs::write(
            &path,
            include_str!("../../../docs/authgate/guard.toml.example"),
        )
        .map_err(|e| GuardError::Config(format!("failed to write {}: {e}", path.display())))?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let cfg = parse_config(
            r#"
            api_base_url = "https://app.example.com"
            mode = "mpa"

            [redirects]
            on_fail = "/signin"

            [http]
            request_timeout_ms = 500

            [http.extra_headers]
            X-Client = "cli"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.mode, GuardMode::Mpa);
        assert_eq!(cfg.redirects.on_fail, "/signin");
        assert_eq!(cfg.redirects.on_success, "/");
        assert_eq!(cfg.request_timeout_ms, 500);
        assert_eq!(cfg.connect_timeout_ms, 2_000);
        assert_eq!(cfg.extra_headers.get("X-Client").map(String::as_str), Some("cli"));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), GuardConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_config("mode = \"desktop\"").is_err());
        assert!(parse_config("api_base_url = \"ftp://files\"").is_err());
        assert!(parse_config("[redirects]\non_fail = \"login\"").is_err());
        assert!(parse_config("[http]\nconnect_timeout_ms = 0").is_err());
        assert!(parse_config("unknown = 1").is_err());
    }

    #[test]
    fn relative_base_url_is_accepted() {
        let cfg = GuardConfig::with_base_url("/api");
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn overrides_apply_over_file_values() {
        let cfg = apply_overrides(GuardConfig::default(), |key| match key {
            ENV_API_BASE_URL => Some("http://localhost:8000".to_string()),
            ENV_MODE => Some("MPA".to_string()),
            ENV_REDIRECT_ON_SUCCESS => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.api_base_url, "http://localhost:8000");
        assert_eq!(cfg.mode, GuardMode::Mpa);
        assert_eq!(cfg.redirects.on_fail, "/login");
        // blank values are ignored
        assert_eq!(cfg.redirects.on_success, "/");
    }

    #[test]
    fn blank_fail_redirect_selects_fallback() {
        let cfg = apply_overrides(GuardConfig::default(), |key| {
            (key == ENV_REDIRECT_ON_FAIL).then(|| " ".to_string())
        })
        .unwrap();
        assert_eq!(cfg.redirects.on_fail, "");

        let outcome = crate::gate::resolve(
            crate::gate::Access::Denied(crate::gate::BlockReason::Unauthenticated),
            None,
            &cfg.redirects,
            cfg.mode,
        );
        assert!(matches!(outcome, crate::gate::GateOutcome::Fallback { .. }));
    }

    #[test]
    fn writes_and_reloads_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_default_config_file(dir.path()).unwrap();
        assert!(path.ends_with(CONFIG_FILE_NAME));

        let cfg = load_config_from_dir(dir.path()).unwrap();
        assert_eq!(cfg.api_base_url, "http://localhost:8000");
        assert_eq!(cfg.mode, GuardMode::Spa);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}

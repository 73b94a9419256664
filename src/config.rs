use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    pub insecure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlmUiConfig {
    pub login_path: String,
    pub landing_path: String,
}

impl Default for MlmUiConfig {
    fn default() -> Self {
        Self {
            login_path: "/people/login".to_string(),
            landing_path: "/mypage".to_string(),
        }
    }
}

/// Credentials never come from the config file, only from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub site: SiteConfig,
    pub api: ApiConfig,
    pub mlm: MlmUiConfig,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialConfig {
    site: Option<SiteConfig>,
    api: Option<ApiConfig>,
    mlm: Option<MlmUiConfig>,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn validate(cfg: &Config) -> Result<()> {
    let url = cfg.site.url.trim();
    if url.is_empty() {
        return Err(anyhow!(
            "no site configured: set LISTOPS_SITE or [site].url in the config file"
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(anyhow!("invalid site url '{url}': must be http(s)"));
    }
    if cfg.api.page_size == 0 {
        return Err(anyhow!("invalid api page size: must be >= 1"));
    }
    if !cfg.mlm.login_path.starts_with('/') {
        return Err(anyhow!("invalid mlm login path: must start with '/'"));
    }
    if !cfg.mlm.landing_path.starts_with('/') {
        return Err(anyhow!("invalid mlm landing path: must start with '/'"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_non_empty("LISTOPS_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let home = dirs::home_dir()?;
    Some(home.join(".listops").join("config.toml"))
}

fn merge_file_config(base: &mut Config, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(site) = parsed.site {
        base.site = site;
    }
    if let Some(api) = parsed.api {
        base.api = api;
    }
    if let Some(mlm) = parsed.mlm {
        base.mlm = mlm;
    }
    Ok(())
}

pub fn load_config() -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(path) = resolve_config_path() {
        merge_file_config(&mut cfg, &path)?;
    }

    if let Some(url) = env_non_empty("LISTOPS_SITE") {
        cfg.site.url = url;
    }
    cfg.site.insecure = env_or_bool("LISTOPS_INSECURE", cfg.site.insecure);
    cfg.api.page_size = env_or_u32("LISTOPS_PAGE_SIZE", cfg.api.page_size);
    if let Some(path) = env_non_empty("LISTOPS_MLM_LOGIN_PATH") {
        cfg.mlm.login_path = path;
    }
    if let Some(path) = env_non_empty("LISTOPS_MLM_LANDING_PATH") {
        cfg.mlm.landing_path = path;
    }
    cfg.credentials.user = env_non_empty("LISTOPS_USER");
    cfg.credentials.password = env_non_empty("LISTOPS_PASSWORD");

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::{Config, merge_file_config, validate};
    use std::fs;

    fn valid_config() -> Config {
        let mut cfg = Config::default();
        cfg.site.url = "https://forge.example.com".to_string();
        cfg
    }

    #[test]
    fn validate_accepts_a_plain_https_site() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn validate_rejects_missing_site() {
        let cfg = Config::default();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("no site configured"));
    }

    #[test]
    fn validate_rejects_non_http_site() {
        let mut cfg = valid_config();
        cfg.site.url = "ftp://forge.example.com".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut cfg = valid_config();
        cfg.api.page_size = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn file_config_replaces_whole_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[site]\nurl = \"https://forge.example.com\"\ninsecure = true\n\n[api]\npage_size = 5\n",
        )
        .expect("write config");

        let mut cfg = Config::default();
        merge_file_config(&mut cfg, &path).expect("merge");

        assert_eq!(cfg.site.url, "https://forge.example.com");
        assert!(cfg.site.insecure);
        assert_eq!(cfg.api.page_size, 5);
        assert_eq!(cfg.mlm.login_path, "/people/login");
    }

    #[test]
    fn missing_file_leaves_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::default();
        merge_file_config(&mut cfg, &dir.path().join("absent.toml")).expect("merge");
        assert_eq!(cfg.api.page_size, 20);
    }
}

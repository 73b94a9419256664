//! One authenticated browser-like session against the MLM web UI. Login
//! happens lazily on the first fetch and is never repeated; the cookie jar
//! carries the session for the rest of the run.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::ListopsError;
use crate::mlm::{FetchOutcome, PageFetcher};

const REQUEST_TIMEOUT_SECS: u64 = 45;

pub struct MlmSession {
    site: String,
    login_path: String,
    landing_path: String,
    user: String,
    password: String,
    client: Client,
    logged_in: bool,
}

impl MlmSession {
    pub fn new(cfg: &Config) -> Result<Self> {
        let user = cfg
            .credentials
            .user
            .clone()
            .context("LISTOPS_USER is required for the list-service web UI")?;
        let password = cfg
            .credentials
            .password
            .clone()
            .context("LISTOPS_PASSWORD is required for the list-service web UI")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .danger_accept_invalid_certs(cfg.site.insecure)
            .build()?;
        Ok(Self {
            site: cfg.site.url.trim_end_matches('/').to_string(),
            login_path: cfg.mlm.login_path.clone(),
            landing_path: cfg.mlm.landing_path.clone(),
            user,
            password,
            client,
            logged_in: false,
        })
    }

    fn ensure_login(&mut self) -> Result<()> {
        if self.logged_in {
            return Ok(());
        }

        let login_url = format!("{}{}", self.site, self.login_path);
        // Prime the session cookie before posting credentials.
        self.client
            .get(&login_url)
            .send()
            .with_context(|| format!("GET {login_url} failed"))?;

        let form = [
            ("authenticator[username]", self.user.as_str()),
            ("authenticator[password]", self.password.as_str()),
        ];
        let resp = self
            .client
            .post(&login_url)
            .form(&form)
            .send()
            .with_context(|| format!("POST {login_url} failed"))?;

        if !resp.url().path().ends_with(&self.landing_path) {
            return Err(ListopsError::AuthenticationFailed {
                site: self.site.clone(),
                user: self.user.clone(),
            }
            .into());
        }
        self.logged_in = true;
        Ok(())
    }
}

impl PageFetcher for MlmSession {
    fn fetch(&mut self, url: &str) -> Result<FetchOutcome> {
        self.ensure_login()?;

        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            bail!(ListopsError::MlmHttp {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(FetchOutcome::Page(resp.text()?))
    }
}

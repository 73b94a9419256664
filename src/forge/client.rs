//! Thin client for the project-metadata REST API. Every call carries the
//! credentials; there is no session object on this side. Paginated listings
//! follow the envelope's `next` link until it runs out.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::forge::{Feature, Project};

const REQUEST_TIMEOUT_SECS: u64 = 45;

pub struct ForgeClient {
    base: String,
    user: Option<String>,
    password: Option<String>,
    client: Client,
}

/// Split one listing envelope into its items and the follow-up link.
fn page_items(envelope: &Value, item_key: &str) -> (Vec<Value>, Option<String>) {
    let items = envelope
        .get(item_key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let next = envelope
        .get("next")
        .and_then(Value::as_str)
        .map(str::to_string);
    (items, next)
}

impl ForgeClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(cfg.site.insecure)
            .build()?;
        Ok(Self {
            base: cfg.site.url.trim_end_matches('/').to_string(),
            user: cfg.credentials.user.clone(),
            password: cfg.credentials.password.clone(),
            client,
        })
    }

    fn api_url(&self, fragment: &str) -> String {
        if fragment.starts_with("http://") || fragment.starts_with("https://") {
            return fragment.to_string();
        }
        format!("{}/api/{}", self.base, fragment.trim_start_matches('/'))
    }

    fn get(&self, fragment: &str) -> Result<Response> {
        let url = self.api_url(fragment);
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(user) = &self.user {
            req = req.basic_auth(user, self.password.as_deref());
        }
        req.send().with_context(|| format!("GET {url} failed"))
    }

    /// GET a JSON resource; a 404 reads as absence, not an error.
    fn get_json(&self, fragment: &str) -> Result<Option<Value>> {
        let resp = self.get(fragment)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("GET {} failed with status {}", self.api_url(fragment), resp.status());
        }
        Ok(Some(resp.json()?))
    }

    fn fetch_all(&self, initial: &str, item_key: &str) -> Result<Option<Vec<Value>>> {
        let mut next = initial.to_string();
        let mut first_page = true;
        let mut out = Vec::new();
        loop {
            let resp = self.get(&next)?;
            if first_page && resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                bail!("GET {} failed with status {}", self.api_url(&next), resp.status());
            }
            first_page = false;
            let envelope: Value = resp.json()?;
            let (items, follow) = page_items(&envelope, item_key);
            out.extend(items);
            match follow {
                Some(link) => next = link,
                None => break,
            }
        }
        Ok(Some(out))
    }

    pub fn ping(&self) -> Result<()> {
        let resp = self.get("")?;
        if !resp.status().is_success() {
            bail!("API root answered with status {}", resp.status());
        }
        Ok(())
    }

    /// One page of the domain-admin project catalog, features included.
    pub fn projects_page(&self, page: u32, size: Option<u32>) -> Result<Vec<Project>> {
        let mut fragment = format!("projects?filter=domain_admin&full=true&page={page}");
        if let Some(size) = size {
            fragment.push_str(&format!("&size={size}"));
        }
        let Some(envelope) = self.get_json(&fragment)? else {
            bail!("project listing endpoint is missing");
        };
        let (items, _) = page_items(&envelope, "projects");
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).context("unreadable project record"))
            .collect()
    }

    pub fn project_features(&self, project: &str) -> Result<Option<Vec<Feature>>> {
        let Some(items) = self.fetch_all(&format!("projects/{project}/features"), "features")?
        else {
            return Ok(None);
        };
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).context("unreadable feature record"))
            .collect::<Result<Vec<Feature>>>()
            .map(Some)
    }

    pub fn project_feature(&self, project: &str, feature: &str) -> Result<Option<Feature>> {
        let Some(value) = self.get_json(&format!("projects/{project}/features/{feature}"))? else {
            return Ok(None);
        };
        // Some deployments wrap the record, some return it bare.
        let record = value.get("feature").cloned().unwrap_or(value);
        serde_json::from_value(record)
            .context("unreadable feature record")
            .map(Some)
    }

    /// POST a feature descriptor; the interesting outcome is the status code.
    pub fn create_feature(&self, project: &str, descriptor: &Value) -> Result<u16> {
        let url = self.api_url(&format!("projects/{project}/features"));
        let mut req = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(descriptor);
        if let Some(user) = &self.user {
            req = req.basic_auth(user, self.password.as_deref());
        }
        let resp = req.send().with_context(|| format!("POST {url} failed"))?;
        Ok(resp.status().as_u16())
    }

    pub fn delete_feature(&self, project: &str, feature: &str) -> Result<()> {
        let url = self.api_url(&format!("projects/{project}/features/{feature}"));
        let mut req = self.client.delete(&url);
        if let Some(user) = &self.user {
            req = req.basic_auth(user, self.password.as_deref());
        }
        let resp = req.send().with_context(|| format!("DELETE {url} failed"))?;
        if !resp.status().is_success() {
            bail!("DELETE {url} failed with status {}", resp.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::page_items;
    use serde_json::json;

    #[test]
    fn page_items_reads_items_and_next_link() {
        let envelope = json!({
            "projects": [{"name": "a"}, {"name": "b"}],
            "next": "https://forge.example.com/api/projects?page=2"
        });
        let (items, next) = page_items(&envelope, "projects");
        assert_eq!(items.len(), 2);
        assert_eq!(
            next.as_deref(),
            Some("https://forge.example.com/api/projects?page=2")
        );
    }

    #[test]
    fn page_items_handles_final_page() {
        let envelope = json!({"features": []});
        let (items, next) = page_items(&envelope, "features");
        assert!(items.is_empty());
        assert!(next.is_none());
    }
}

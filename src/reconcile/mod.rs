pub mod classify;
pub mod discover;
pub mod engine;
pub mod filter;

use anyhow::Result;
use serde_json::Value;

use crate::doc::ArchiveStatus;
use crate::forge::client::ForgeClient;
use crate::forge::{Feature, Project};

/// Project catalog pages, as the discovery pipeline walks them.
pub trait ProjectSource {
    fn projects_page(&self, page: u32, size: Option<u32>) -> Result<Vec<Project>>;
}

/// The metadata-API operations the reconciliation engine mutates through.
/// `None` from the lookups means the project/feature is absent (the API's
/// 404 convention), which callers recover from locally.
pub trait FeatureStore {
    fn project_features(&self, project: &str) -> Result<Option<Vec<Feature>>>;
    fn project_feature(&self, project: &str, name: &str) -> Result<Option<Feature>>;
    fn create_feature(&self, project: &str, descriptor: &Value) -> Result<u16>;
    fn delete_feature(&self, project: &str, name: &str) -> Result<()>;
}

/// Archive-state oracle for one list feature. Purely observational.
pub trait ArchiveProbe {
    fn classify(&mut self, list_name: &str, web_url: &str) -> Result<ArchiveStatus>;
}

impl ProjectSource for ForgeClient {
    fn projects_page(&self, page: u32, size: Option<u32>) -> Result<Vec<Project>> {
        ForgeClient::projects_page(self, page, size)
    }
}

impl FeatureStore for ForgeClient {
    fn project_features(&self, project: &str) -> Result<Option<Vec<Feature>>> {
        ForgeClient::project_features(self, project)
    }

    fn project_feature(&self, project: &str, name: &str) -> Result<Option<Feature>> {
        ForgeClient::project_feature(self, project, name)
    }

    fn create_feature(&self, project: &str, descriptor: &Value) -> Result<u16> {
        ForgeClient::create_feature(self, project, descriptor)
    }

    fn delete_feature(&self, project: &str, name: &str) -> Result<()> {
        ForgeClient::delete_feature(self, project, name)
    }
}

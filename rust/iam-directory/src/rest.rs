//! REST implementation of [ResourceDirectory] over the Cloud Resource Manager API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    DirectoryError, Folder, Operation, Organization, Page, Policy, Project, ResourceDirectory,
    ResourceName,
};

/// Default public endpoint of the Cloud Resource Manager API
pub const DEFAULT_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com";

/// How [RestDirectory] identifies the caller
#[derive(Clone, Debug)]
pub enum AuthMethod {
    /// Send requests unauthenticated; the API will answer 401/403
    None,

    /// An OAuth access token sent as `Authorization: Bearer {token}`
    Bearer(String),
}

/// Where and how [RestDirectory] reaches the Resource Manager API
#[derive(Clone, Debug)]
pub struct RestDirectoryConfig {
    /// Base URL without a trailing `/` or version segment
    pub endpoint: String,

    pub auth_method: AuthMethod,

    /// Whole-request timeout in seconds; `None` waits indefinitely
    pub timeout_seconds: Option<u64>,

    /// `pageSize` sent with listings; the API picks one when absent
    pub page_size: Option<u32>,
}

impl Default for RestDirectoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl RestDirectoryConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_method: AuthMethod::None,
            timeout_seconds: Some(30),
            page_size: None,
        }
    }

    pub fn with_auth(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectsPage {
    #[serde(default)]
    projects: Vec<Project>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoldersPage {
    #[serde(default)]
    folders: Vec<Folder>,
    next_page_token: Option<String>,
}

/// [ResourceDirectory] backed by the Cloud Resource Manager REST API.
///
/// Organizations and projects are read from the v1 surface, folders from v2:
/// - GET `/v1/organizations/{id}`
/// - GET `/v1/projects`
/// - GET `/v2/folders?parent={name}`
/// - POST `/{v1|v2}/{name}:getIamPolicy`
///
/// Calls are never retried.
#[derive(Clone)]
pub struct RestDirectory {
    config: RestDirectoryConfig,
    client: Client,
}

impl RestDirectory {
    pub fn new(config: RestDirectoryConfig) -> Self {
        let timeout = config.timeout_seconds.map(Duration::from_secs);
        let client = match timeout {
            Some(timeout) => Client::builder().timeout(timeout).build(),
            None => Client::builder().build(),
        }
        .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    fn url_for_organization(&self, id: &str) -> String {
        format!("{}/v1/organizations/{}", self.config.endpoint, id)
    }

    fn url_for_projects(&self) -> String {
        format!("{}/v1/projects", self.config.endpoint)
    }

    fn url_for_folders(&self) -> String {
        format!("{}/v2/folders", self.config.endpoint)
    }

    fn url_for_policy(&self, resource: &ResourceName) -> String {
        let version = match resource {
            ResourceName::Folder(_) => "v2",
            ResourceName::Organization(_) | ResourceName::Project(_) => "v1",
        };
        format!(
            "{}/{}/{}:getIamPolicy",
            self.config.endpoint, version, resource
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_method {
            AuthMethod::None => request,
            AuthMethod::Bearer(token) => request.bearer_auth(token),
        }
    }

    fn pagination(&self, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(page_size) = self.config.page_size {
            query.push(("pageSize", page_size.to_string()));
        }
        query
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
        resource: &str,
    ) -> Result<T, DirectoryError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DirectoryError::RequestFailed {
                operation,
                resource: resource.to_string(),
                reason: format!("HTTP request failed: {}", e),
            })?;

        let response = Self::check_status(response, operation, resource).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::DecodeFailed {
                operation,
                resource: resource.to_string(),
                reason: e.to_string(),
            })
    }

    async fn check_status(
        response: Response,
        operation: Operation,
        resource: &str,
    ) -> Result<Response, DirectoryError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let reason = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("Unknown").to_string()
        } else {
            body.trim().to_string()
        };

        Err(match status {
            StatusCode::NOT_FOUND => DirectoryError::NotFound {
                operation,
                resource: resource.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::Unauthorized {
                operation,
                resource: resource.to_string(),
                reason,
            },
            _ => DirectoryError::UnexpectedStatus {
                operation,
                resource: resource.to_string(),
                status: status.as_u16(),
                reason,
            },
        })
    }
}

#[async_trait]
impl ResourceDirectory for RestDirectory {
    async fn get_organization(&self, id: &str) -> Result<Organization, DirectoryError> {
        let resource = ResourceName::organization(id).to_string();
        let request = self.client.get(self.url_for_organization(id));

        self.execute(request, Operation::GetOrganization, &resource)
            .await
    }

    async fn list_projects(&self, page_token: Option<&str>) -> Result<Page<Project>, DirectoryError> {
        let request = self
            .client
            .get(self.url_for_projects())
            .query(&self.pagination(page_token));

        let page: ProjectsPage = self
            .execute(request, Operation::ListProjects, "projects")
            .await?;

        Ok(Page {
            items: page.projects,
            next_page_token: page.next_page_token,
        })
    }

    async fn list_folders(
        &self,
        parent: &ResourceName,
        page_token: Option<&str>,
    ) -> Result<Page<Folder>, DirectoryError> {
        let resource = parent.to_string();
        let request = self
            .client
            .get(self.url_for_folders())
            .query(&[("parent", resource.as_str())])
            .query(&self.pagination(page_token));

        let page: FoldersPage = self
            .execute(request, Operation::ListFolders, &resource)
            .await?;

        Ok(Page {
            items: page.folders,
            next_page_token: page.next_page_token,
        })
    }

    async fn get_iam_policy(&self, resource: &ResourceName) -> Result<Policy, DirectoryError> {
        let request = self
            .client
            .post(self.url_for_policy(resource))
            .json(&serde_json::json!({}));

        self.execute(request, Operation::GetIamPolicy, &resource.to_string())
            .await
    }
}

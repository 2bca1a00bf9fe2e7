//! The capability the audit consumes, and page-draining listings over it

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::Stream;

use crate::{DirectoryError, Folder, Organization, Policy, Project, ResourceName};

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the following page; `None` (or empty) on the last page
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    fn next_token(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// A [ResourceDirectory] answers questions about a resource hierarchy. Each
/// method is exactly one remote call; listings are returned a page at a time
/// (see [projects] and [child_folders] to drain them).
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Validate and fetch an organization record
    async fn get_organization(&self, id: &str) -> Result<Organization, DirectoryError>;

    /// Fetch one page of every project visible to the caller
    async fn list_projects(&self, page_token: Option<&str>) -> Result<Page<Project>, DirectoryError>;

    /// Fetch one page of the immediate child folders of `parent`
    async fn list_folders(
        &self,
        parent: &ResourceName,
        page_token: Option<&str>,
    ) -> Result<Page<Folder>, DirectoryError>;

    /// Fetch the access-control policy attached to `resource`
    async fn get_iam_policy(&self, resource: &ResourceName) -> Result<Policy, DirectoryError>;
}

/// Every project visible to the caller, following page tokens until the
/// listing is exhausted. A failed page ends the stream with its error.
pub fn projects<D>(directory: &D) -> impl Stream<Item = Result<Project, DirectoryError>> + '_
where
    D: ResourceDirectory + ?Sized,
{
    try_stream! {
        let mut page_token: Option<String> = None;

        loop {
            tracing::info!("Getting projects...");
            let page = directory.list_projects(page_token.as_deref()).await?;
            let next = page.next_token().map(str::to_string);

            for project in page.items {
                yield project;
            }

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
    }
}

/// The immediate child folders of `parent`, following page tokens until the
/// listing is exhausted. A failed page ends the stream with its error.
pub fn child_folders<'a, D>(
    directory: &'a D,
    parent: &'a ResourceName,
) -> impl Stream<Item = Result<Folder, DirectoryError>> + 'a
where
    D: ResourceDirectory + ?Sized,
{
    try_stream! {
        let mut page_token: Option<String> = None;

        loop {
            tracing::info!(%parent, "Getting folders...");
            let page = directory.list_folders(parent, page_token.as_deref()).await?;
            let next = page.next_token().map(str::to_string);

            for folder in page.items {
                yield folder;
            }

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
    }
}

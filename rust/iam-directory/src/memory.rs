//! In-memory resource directory for testing

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    DirectoryError, Folder, Operation, Organization, Page, Policy, Project, ResourceDirectory,
    ResourceName,
};

/// A call made against a [MemoryDirectory]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    /// Canonical name of the resource the call concerned (`projects` for the
    /// project listing)
    pub resource: String,
}

#[derive(Default)]
struct Failures {
    children: HashSet<ResourceName>,
    folder_pages: HashSet<(ResourceName, usize)>,
    project_pages: HashSet<usize>,
    policies: HashSet<ResourceName>,
}

/// Builder for a [MemoryDirectory]
#[derive(Default)]
pub struct MemoryDirectoryBuilder {
    page_size: Option<usize>,
    organizations: Vec<Organization>,
    folders: Vec<Folder>,
    projects: Vec<Project>,
    policies: HashMap<ResourceName, Policy>,
    failures: Failures,
}

impl MemoryDirectoryBuilder {
    /// Split listings into pages of at most `page_size` items
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Add an organization
    pub fn organization(mut self, id: impl Into<String>) -> Self {
        self.organizations.push(Organization::new(id));
        self
    }

    /// Add a folder
    pub fn folder(mut self, folder: Folder) -> Self {
        self.folders.push(folder);
        self
    }

    /// Add a project
    pub fn project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    /// Attach a policy to a node
    pub fn policy(mut self, resource: ResourceName, policy: Policy) -> Self {
        self.policies.insert(resource, policy);
        self
    }

    /// Make every child listing of `parent` fail
    pub fn fail_children(mut self, parent: ResourceName) -> Self {
        self.failures.children.insert(parent);
        self
    }

    /// Make the zero-based `page` of the child listing of `parent` fail
    pub fn fail_folder_page(mut self, parent: ResourceName, page: usize) -> Self {
        self.failures.folder_pages.insert((parent, page));
        self
    }

    /// Make the zero-based `page` of the project listing fail
    pub fn fail_project_page(mut self, page: usize) -> Self {
        self.failures.project_pages.insert(page);
        self
    }

    /// Make the policy fetch of `resource` fail
    pub fn fail_policy(mut self, resource: ResourceName) -> Self {
        self.failures.policies.insert(resource);
        self
    }

    pub fn build(self) -> MemoryDirectory {
        MemoryDirectory {
            state: Arc::new(State {
                page_size: self.page_size,
                organizations: self.organizations,
                folders: self.folders,
                projects: self.projects,
                policies: self.policies,
                failures: self.failures,
            }),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct State {
    page_size: Option<usize>,
    organizations: Vec<Organization>,
    folders: Vec<Folder>,
    projects: Vec<Project>,
    policies: HashMap<ResourceName, Policy>,
    failures: Failures,
}

impl State {
    fn knows(&self, resource: &ResourceName) -> bool {
        match resource {
            ResourceName::Organization(_) => {
                self.organizations.iter().any(|org| &org.name == resource)
            }
            ResourceName::Folder(_) => self.folders.iter().any(|folder| &folder.name == resource),
            ResourceName::Project(id) => self.projects.iter().any(|p| &p.project_id == id),
        }
    }

    fn paginate<T: Clone>(&self, items: &[T], page_token: Option<&str>) -> (usize, Page<T>) {
        let offset = page_token
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let page_size = self.page_size.unwrap_or(usize::MAX);
        let end = offset.saturating_add(page_size).min(items.len());
        let start = offset.min(end);

        let next_page_token = (end < items.len()).then(|| end.to_string());
        let index = if page_size == usize::MAX {
            0
        } else {
            offset / page_size
        };

        (
            index,
            Page {
                items: items[start..end].to_vec(),
                next_page_token,
            },
        )
    }
}

/// A resource hierarchy held entirely in memory.
///
/// Every call is recorded and can be inspected with [MemoryDirectory::requests].
/// Individual calls can be configured to fail through the builder, in which
/// case they return [DirectoryError::RequestFailed].
///
/// ```
/// use iam_directory::{Folder, MemoryDirectory, ResourceName};
///
/// let directory = MemoryDirectory::builder()
///     .organization("123")
///     .folder(Folder::new("7", ResourceName::organization("123")))
///     .fail_children(ResourceName::folder("7"))
///     .build();
/// # let _ = directory;
/// ```
#[derive(Clone)]
pub struct MemoryDirectory {
    state: Arc<State>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MemoryDirectory {
    pub fn builder() -> MemoryDirectoryBuilder {
        MemoryDirectoryBuilder::default()
    }

    /// Every call made so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of calls made for the given operation
    pub fn requests_for(&self, operation: Operation) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.operation == operation)
            .count()
    }

    fn record(&self, operation: Operation, resource: impl Into<String>) {
        self.requests.lock().push(Request {
            operation,
            resource: resource.into(),
        });
    }

    fn injected(operation: Operation, resource: impl Into<String>) -> DirectoryError {
        DirectoryError::RequestFailed {
            operation,
            resource: resource.into(),
            reason: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl ResourceDirectory for MemoryDirectory {
    async fn get_organization(&self, id: &str) -> Result<Organization, DirectoryError> {
        let name = ResourceName::organization(id);
        self.record(Operation::GetOrganization, name.to_string());

        self.state
            .organizations
            .iter()
            .find(|org| org.name == name)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound {
                operation: Operation::GetOrganization,
                resource: name.to_string(),
            })
    }

    async fn list_projects(&self, page_token: Option<&str>) -> Result<Page<Project>, DirectoryError> {
        self.record(Operation::ListProjects, "projects");

        let (index, page) = self.state.paginate(&self.state.projects, page_token);

        if self.state.failures.project_pages.contains(&index) {
            return Err(Self::injected(Operation::ListProjects, "projects"));
        }

        Ok(page)
    }

    async fn list_folders(
        &self,
        parent: &ResourceName,
        page_token: Option<&str>,
    ) -> Result<Page<Folder>, DirectoryError> {
        self.record(Operation::ListFolders, parent.to_string());

        if self.state.failures.children.contains(parent) {
            return Err(Self::injected(Operation::ListFolders, parent.to_string()));
        }

        let children: Vec<Folder> = self
            .state
            .folders
            .iter()
            .filter(|folder| &folder.parent == parent)
            .cloned()
            .collect();

        let (index, page) = self.state.paginate(&children, page_token);

        if self
            .state
            .failures
            .folder_pages
            .contains(&(parent.clone(), index))
        {
            return Err(Self::injected(Operation::ListFolders, parent.to_string()));
        }

        Ok(page)
    }

    async fn get_iam_policy(&self, resource: &ResourceName) -> Result<Policy, DirectoryError> {
        self.record(Operation::GetIamPolicy, resource.to_string());

        if self.state.failures.policies.contains(resource) {
            return Err(Self::injected(Operation::GetIamPolicy, resource.to_string()));
        }

        if !self.state.knows(resource) {
            return Err(DirectoryError::NotFound {
                operation: Operation::GetIamPolicy,
                resource: resource.to_string(),
            });
        }

        Ok(self
            .state
            .policies
            .get(resource)
            .cloned()
            .unwrap_or_default())
    }
}

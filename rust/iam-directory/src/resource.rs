//! Nodes of the resource hierarchy and their canonical names

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DirectoryError;

/// The canonical name of a node in the resource hierarchy, e.g.
/// `organizations/123`, `folders/456` or `projects/my-project`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceName {
    /// `organizations/{id}`
    Organization(String),
    /// `folders/{id}`
    Folder(String),
    /// `projects/{id}`
    Project(String),
}

impl ResourceName {
    /// Name of the organization with the given id
    pub fn organization(id: impl Into<String>) -> Self {
        Self::Organization(id.into())
    }

    /// Name of the folder with the given id
    pub fn folder(id: impl Into<String>) -> Self {
        Self::Folder(id.into())
    }

    /// Name of the project with the given id
    pub fn project(id: impl Into<String>) -> Self {
        Self::Project(id.into())
    }

    /// The bare identifier, without the collection prefix
    pub fn id(&self) -> &str {
        match self {
            Self::Organization(id) | Self::Folder(id) | Self::Project(id) => id,
        }
    }

    /// The collection segment of the name
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Organization(_) => "organizations",
            Self::Folder(_) => "folders",
            Self::Project(_) => "projects",
        }
    }
}

impl Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection(), self.id())
    }
}

impl FromStr for ResourceName {
    type Err = DirectoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || DirectoryError::InvalidResourceName(name.to_string());

        let (collection, id) = name.split_once('/').ok_or_else(invalid)?;

        if id.is_empty() || id.contains('/') {
            return Err(invalid());
        }

        match collection {
            "organizations" => Ok(Self::organization(id)),
            "folders" => Ok(Self::folder(id)),
            "projects" => Ok(Self::project(id)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for ResourceName {
    type Error = DirectoryError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.to_string()
    }
}

/// The root of a resource hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Canonical name (`organizations/{id}`)
    pub name: ResourceName,
    /// Human readable name, if the directory reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Organization {
    /// Create an organization record for the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            name: ResourceName::organization(id),
            display_name: None,
        }
    }

    /// The numeric organization id
    pub fn id(&self) -> &str {
        self.name.id()
    }
}

/// A grouping node beneath an organization or another folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Canonical name (`folders/{id}`)
    pub name: ResourceName,
    /// Canonical name of the parent node
    pub parent: ResourceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Folder {
    /// Create a folder record parented by `parent`
    pub fn new(id: impl Into<String>, parent: ResourceName) -> Self {
        Self {
            name: ResourceName::folder(id),
            parent,
            display_name: None,
        }
    }

    /// The folder id
    pub fn id(&self) -> &str {
        self.name.id()
    }
}

/// Lifecycle of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    DeleteRequested,
    DeleteInProgress,
    #[default]
    #[serde(other)]
    LifecycleStateUnspecified,
}

/// Kind of node a project is directly parented by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentKind {
    Organization,
    Folder,
    #[serde(other)]
    Other,
}

/// A type-tagged reference to the direct parent of a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(rename = "type")]
    pub kind: ParentKind,
    pub id: String,
}

impl ParentRef {
    /// Parent reference to an organization
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::Organization,
            id: id.into(),
        }
    }

    /// Parent reference to a folder
    pub fn folder(id: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::Folder,
            id: id.into(),
        }
    }
}

/// A leaf resource container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    /// Unspecified when the record omits it, which keeps the project out of
    /// the report
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl Project {
    /// Create an active project with the given parent
    pub fn active(project_id: impl Into<String>, parent: ParentRef) -> Self {
        Self {
            project_id: project_id.into(),
            lifecycle_state: LifecycleState::Active,
            parent: Some(parent),
        }
    }

    /// Override the lifecycle state
    pub fn with_state(mut self, lifecycle_state: LifecycleState) -> Self {
        self.lifecycle_state = lifecycle_state;
        self
    }

    /// `true` if the project is in the `ACTIVE` state
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == LifecycleState::Active
    }

    /// Canonical name (`projects/{id}`)
    pub fn name(&self) -> ResourceName {
        ResourceName::project(&self.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_canonical_names() {
        assert_eq!(
            "organizations/123".parse::<ResourceName>().unwrap(),
            ResourceName::organization("123")
        );
        assert_eq!(
            "folders/456".parse::<ResourceName>().unwrap(),
            ResourceName::folder("456")
        );
        assert_eq!(
            "projects/my-project".parse::<ResourceName>().unwrap(),
            ResourceName::project("my-project")
        );
    }

    #[test]
    fn it_rejects_malformed_names() {
        for name in ["", "organizations", "organizations/", "buckets/1", "folders/1/2"] {
            assert!(
                matches!(
                    name.parse::<ResourceName>(),
                    Err(DirectoryError::InvalidResourceName(_))
                ),
                "{name:?} should not parse"
            );
        }
    }

    #[test]
    fn it_renders_names_back_to_strings() {
        assert_eq!(ResourceName::folder("42").to_string(), "folders/42");
        assert_eq!(ResourceName::organization("42").id(), "42");
    }

    #[test]
    fn it_decodes_projects_from_the_wire_format() {
        let project: Project = serde_json::from_str(
            r#"{
                "projectNumber": "1234",
                "projectId": "p1",
                "lifecycleState": "DELETE_REQUESTED",
                "parent": { "type": "folder", "id": "999" }
            }"#,
        )
        .unwrap();

        assert_eq!(project.project_id, "p1");
        assert_eq!(project.lifecycle_state, LifecycleState::DeleteRequested);
        assert_eq!(project.parent, Some(ParentRef::folder("999")));
        assert!(!project.is_active());
    }

    #[test]
    fn it_tolerates_unknown_states_and_missing_parents() {
        let project: Project =
            serde_json::from_str(r#"{ "projectId": "orphan", "lifecycleState": "PURGING" }"#)
                .unwrap();

        assert_eq!(
            project.lifecycle_state,
            LifecycleState::LifecycleStateUnspecified
        );
        assert_eq!(project.parent, None);
    }

    #[test]
    fn it_decodes_projects_without_a_lifecycle_state() {
        let projects: Vec<Project> = serde_json::from_str(
            r#"[
                { "projectId": "bare", "parent": { "type": "organization", "id": "1" } },
                { "projectId": "p1", "lifecycleState": "ACTIVE" }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            projects[0].lifecycle_state,
            LifecycleState::LifecycleStateUnspecified
        );
        assert!(!projects[0].is_active());
        assert!(projects[1].is_active());
    }

    #[test]
    fn it_decodes_folders_from_the_wire_format() {
        let folder: Folder = serde_json::from_str(
            r#"{
                "name": "folders/77",
                "parent": "organizations/123",
                "displayName": "Engineering",
                "lifecycleState": "ACTIVE"
            }"#,
        )
        .unwrap();

        assert_eq!(folder.id(), "77");
        assert_eq!(folder.parent, ResourceName::organization("123"));
        assert_eq!(folder.display_name.as_deref(), Some("Engineering"));
    }
}

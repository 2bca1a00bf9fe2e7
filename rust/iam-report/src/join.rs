use std::collections::HashSet;

use iam_directory::{ParentKind, Project, ResourceDirectory};

use crate::AuditContext;

/// Select the projects whose policies belong in the report.
///
/// A project is eligible when it is active and either sits directly under a
/// visited folder, or sits directly under the organization `org_id` while the
/// run is not restricted to a folder.
pub fn eligible_projects<'p>(
    projects: &'p [Project],
    visited_folders: &HashSet<String>,
    org_id: &str,
    folder_restricted: bool,
) -> impl Iterator<Item = &'p Project> {
    projects.iter().filter(move |project| {
        if !project.is_active() {
            return false;
        }

        match &project.parent {
            Some(parent) => match parent.kind {
                ParentKind::Organization => !folder_restricted && parent.id == org_id,
                ParentKind::Folder => visited_folders.contains(&parent.id),
                ParentKind::Other => false,
            },
            None => false,
        }
    })
}

/// Flatten the policy of every eligible project into `context`, skipping (and
/// recording) projects whose policy cannot be fetched.
pub async fn collect_project_policies<D>(
    directory: &D,
    projects: &[Project],
    org_id: &str,
    folder_restricted: bool,
    context: &mut AuditContext,
) where
    D: ResourceDirectory + ?Sized,
{
    let selected: Vec<&Project> = eligible_projects(
        projects,
        context.visited_folders(),
        org_id,
        folder_restricted,
    )
    .collect();

    tracing::debug!(
        eligible = selected.len(),
        listed = projects.len(),
        "Selected projects"
    );

    for project in selected {
        context.collect_policy(directory, &project.name()).await;
    }
}

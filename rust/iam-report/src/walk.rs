use futures_util::StreamExt;
use iam_directory::{ResourceDirectory, ResourceName, child_folders};

use crate::AuditContext;

/// Walk the folder subtree below `start`, depth first.
///
/// Every folder reached by repeated child expansion has its policy flattened
/// into `context` and its id added to the visited set. When `start` is itself
/// a folder it counts as visited and its own policy is included; the policy
/// of an organization start is left to the caller.
///
/// Failed listings and policy fetches are recorded on `context` and the walk
/// carries on with whatever remains on the stack. Children yielded before a
/// listing failed are still explored.
pub async fn walk_folders<D>(directory: &D, start: ResourceName, context: &mut AuditContext)
where
    D: ResourceDirectory + ?Sized,
{
    if let ResourceName::Folder(id) = &start {
        context.visit_folder(id.clone());
        context.collect_policy(directory, &start).await;
    }

    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        let children = child_folders(directory, &current);
        tokio::pin!(children);

        while let Some(child) = children.next().await {
            let folder = match child {
                Ok(folder) => folder,
                Err(error) => {
                    context.record_failure(error);
                    break;
                }
            };

            if !context.visit_folder(folder.id()) {
                tracing::warn!(folder = %folder.name, "Folder was listed more than once");
                continue;
            }

            context.collect_policy(directory, &folder.name).await;
            stack.push(folder.name);
        }
    }
}

//! Project store: canonical main branches, forks, and the pull request
//! lifecycle.
//!
//! Projects live in `projects.json` keyed by a generated id, with forks
//! nested inside each project. Merging overwrites the main branch with the
//! fork's code and deletes the fork outright; there is no three-way merge
//! and no rebase, so a second pending fork's diff goes stale against the
//! new main branch.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::changes::ChangeTracker;
use crate::errors::{AuthError, CoreError, StoreError};
use crate::models::{Fork, ForkOverview, Project};
use crate::persist::JsonStore;

/// Store of projects and their forks.
pub struct ProjectStore {
    store: JsonStore<HashMap<String, Project>>,
}

impl ProjectStore {
    /// Create a handle backed by `projects.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            store: JsonStore::new(data_dir.as_ref().join("projects.json")),
        }
    }

    /// Create a project with an empty main branch and no forks. The name is
    /// not validated for uniqueness or emptiness.
    pub fn create(&self, name: &str, owner: &str) -> Result<Project, CoreError> {
        self.store.update(|projects| {
            let project = Project {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                main_branch: String::new(),
                owner: owner.to_string(),
                forks: HashMap::new(),
            };
            projects.insert(project.id.clone(), project.clone());
            info!(project = %project.id, name, owner, "created project");
            Ok(project)
        })
    }

    /// Look up a project by id.
    pub fn get(&self, project_id: &str) -> Result<Project, CoreError> {
        let projects = self.store.read()?;
        projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("project", project_id).into())
    }

    /// All projects, in no particular order.
    pub fn list(&self) -> Result<Vec<Project>, CoreError> {
        let projects = self.store.read()?;
        Ok(projects.into_values().collect())
    }

    /// Fork a project: copy its current main branch into a fresh fork owned
    /// by `user`.
    ///
    /// Every fork action gets its own id, so a user may hold several
    /// parallel forks of the same project.
    pub fn fork(&self, project_id: &str, user: &str) -> Result<(String, Fork), CoreError> {
        self.store.update(|projects| {
            let project = projects
                .get_mut(project_id)
                .ok_or_else(|| StoreError::not_found("project", project_id))?;
            let fork = Fork {
                user: user.to_string(),
                code: project.main_branch.clone(),
                pull_request: false,
                changes: Vec::new(),
            };
            let fork_id = Uuid::new_v4().to_string();
            project.forks.insert(fork_id.clone(), fork.clone());
            info!(project = project_id, fork = %fork_id, user, "forked project");
            Ok((fork_id, fork))
        })
    }

    /// Replace a fork's code with `new_code` and recompute its change list
    /// as the diff from the previously stored code.
    ///
    /// The change list is fully replaced, not appended: only the most
    /// recent edit's diff survives. Returns the fresh diff.
    pub fn save_fork_edit(
        &self,
        project_id: &str,
        fork_id: &str,
        new_code: &str,
    ) -> Result<Vec<String>, CoreError> {
        self.store.update(|projects| {
            let project = projects
                .get_mut(project_id)
                .ok_or_else(|| StoreError::not_found("project", project_id))?;
            let fork = project
                .forks
                .get_mut(fork_id)
                .ok_or_else(|| StoreError::not_found("fork", fork_id))?;

            let changes = ChangeTracker::diff(&fork.code, new_code);
            fork.code = new_code.to_string();
            fork.changes = changes.clone();
            debug!(
                project = project_id,
                fork = fork_id,
                changed_lines = changes.len(),
                "saved fork edit"
            );
            Ok(changes)
        })
    }

    /// Flag a fork as ready for the owner to merge. Re-submitting is a
    /// no-op.
    pub fn submit_pull_request(&self, project_id: &str, fork_id: &str) -> Result<(), CoreError> {
        self.store.update(|projects| {
            let project = projects
                .get_mut(project_id)
                .ok_or_else(|| StoreError::not_found("project", project_id))?;
            let fork = project
                .forks
                .get_mut(fork_id)
                .ok_or_else(|| StoreError::not_found("fork", fork_id))?;
            fork.pull_request = true;
            info!(project = project_id, fork = fork_id, "submitted pull request");
            Ok(())
        })
    }

    /// Merge a fork into its project's main branch.
    ///
    /// Only the project owner may merge. The main branch is overwritten
    /// with the fork's code and the fork entry is removed, discarding its
    /// change history. Returns the updated project.
    pub fn merge(
        &self,
        project_id: &str,
        fork_id: &str,
        acting_user: &str,
    ) -> Result<Project, CoreError> {
        self.store.update(|projects| {
            let project = projects
                .get_mut(project_id)
                .ok_or_else(|| StoreError::not_found("project", project_id))?;
            if project.owner != acting_user {
                return Err(AuthError::Forbidden {
                    user: acting_user.to_string(),
                    action: format!("merge fork {fork_id} into project {project_id}"),
                }
                .into());
            }
            let fork = project
                .forks
                .remove(fork_id)
                .ok_or_else(|| StoreError::not_found("fork", fork_id))?;
            project.main_branch = fork.code;
            info!(project = project_id, fork = fork_id, "merged fork");
            Ok(project.clone())
        })
    }

    /// All forks created by `user`, across every project.
    pub fn forks_of(&self, user: &str) -> Result<Vec<ForkOverview>, CoreError> {
        let projects = self.store.read()?;
        Ok(collect_forks(&projects, |_, fork| fork.user == user))
    }

    /// All forks with a pending pull request on projects owned by `owner`.
    pub fn open_pull_requests(&self, owner: &str) -> Result<Vec<ForkOverview>, CoreError> {
        let projects = self.store.read()?;
        Ok(collect_forks(&projects, |project, fork| {
            project.owner == owner && fork.pull_request
        }))
    }
}

fn collect_forks<F>(projects: &HashMap<String, Project>, keep: F) -> Vec<ForkOverview>
where
    F: Fn(&Project, &Fork) -> bool,
{
    let mut rows = Vec::new();
    for project in projects.values() {
        for (fork_id, fork) in &project.forks {
            if keep(project, fork) {
                rows.push(ForkOverview {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    fork_id: fork_id.clone(),
                    fork: fork.clone(),
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_store() -> (tempfile::TempDir, ProjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        (dir, store)
    }

    /// Seed a project's main branch through the only path that can write
    /// it: the owner forks, edits, and merges their own fork.
    fn seed_main_branch(store: &ProjectStore, project_id: &str, owner: &str, code: &str) {
        let (fork_id, _) = store.fork(project_id, owner).unwrap();
        store.save_fork_edit(project_id, &fork_id, code).unwrap();
        store.submit_pull_request(project_id, &fork_id).unwrap();
        store.merge(project_id, &fork_id, owner).unwrap();
    }

    #[test]
    fn test_create_project() {
        let (_dir, store) = project_store();

        let p1 = store.create("Demo", "bob").unwrap();
        let p2 = store.create("Demo", "bob").unwrap();

        assert_ne!(p1.id, p2.id);
        assert!(p1.main_branch.is_empty());
        assert!(p1.forks.is_empty());
        assert_eq!(p1.owner, "bob");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_fork_copies_main_branch() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();
        seed_main_branch(&store, &project.id, "bob", "print(1)");

        let (_, fork) = store.fork(&project.id, "alice").unwrap();
        assert_eq!(fork.code, "print(1)");
        assert!(fork.changes.is_empty());
        assert!(!fork.pull_request);
    }

    #[test]
    fn test_fork_unknown_project() {
        let (_dir, store) = project_store();
        let result = store.fork("ghost", "alice");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_repeated_forks_are_independent() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();

        let (f1, _) = store.fork(&project.id, "alice").unwrap();
        let (f2, _) = store.fork(&project.id, "alice").unwrap();
        assert_ne!(f1, f2);

        store.save_fork_edit(&project.id, &f1, "print('a')").unwrap();
        let current = store.get(&project.id).unwrap();
        assert_eq!(current.forks[&f1].code, "print('a')");
        assert_eq!(current.forks[&f2].code, "");
    }

    #[test]
    fn test_save_fork_edit_same_code_yields_no_changes() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();
        seed_main_branch(&store, &project.id, "bob", "print(1)");

        let (fork_id, fork) = store.fork(&project.id, "alice").unwrap();
        let changes = store
            .save_fork_edit(&project.id, &fork_id, &fork.code)
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_save_fork_edit_replaces_change_list() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();

        let (fork_id, _) = store.fork(&project.id, "alice").unwrap();
        store.save_fork_edit(&project.id, &fork_id, "a").unwrap();
        let changes = store.save_fork_edit(&project.id, &fork_id, "b").unwrap();

        // Only the latest edit's diff survives.
        assert_eq!(changes, vec!["- a", "+ b"]);
        let current = store.get(&project.id).unwrap();
        assert_eq!(current.forks[&fork_id].changes, changes);
    }

    #[test]
    fn test_merge_by_non_owner_forbidden() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();
        let (fork_id, _) = store.fork(&project.id, "alice").unwrap();
        store.save_fork_edit(&project.id, &fork_id, "print(2)").unwrap();

        let result = store.merge(&project.id, &fork_id, "alice");
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::Forbidden { .. }))
        ));

        // Nothing was mutated.
        let current = store.get(&project.id).unwrap();
        assert!(current.main_branch.is_empty());
        assert!(current.forks.contains_key(&fork_id));
    }

    #[test]
    fn test_merge_unknown_fork() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();

        let result = store.merge(&project.id, "ghost", "bob");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_fork_edit_pull_request_merge_flow() {
        let (_dir, store) = project_store();
        let project = store.create("Demo", "bob").unwrap();
        seed_main_branch(&store, &project.id, "bob", "print(1)");

        let (fork_id, fork) = store.fork(&project.id, "alice").unwrap();
        assert_eq!(fork.code, "print(1)");

        let changes = store
            .save_fork_edit(&project.id, &fork_id, "print(2)")
            .unwrap();
        assert_eq!(changes, vec!["- print(1)", "+ print(2)"]);

        store.submit_pull_request(&project.id, &fork_id).unwrap();
        // Re-submitting is a no-op.
        store.submit_pull_request(&project.id, &fork_id).unwrap();

        let open = store.open_pull_requests("bob").unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].fork_id, fork_id);
        assert_eq!(open[0].fork.user, "alice");

        let merged = store.merge(&project.id, &fork_id, "bob").unwrap();
        assert_eq!(merged.main_branch, "print(2)");
        assert!(!merged.forks.contains_key(&fork_id));
        assert!(store.open_pull_requests("bob").unwrap().is_empty());
    }

    #[test]
    fn test_forks_of_spans_projects() {
        let (_dir, store) = project_store();
        let p1 = store.create("One", "bob").unwrap();
        let p2 = store.create("Two", "carol").unwrap();

        store.fork(&p1.id, "alice").unwrap();
        store.fork(&p2.id, "alice").unwrap();
        store.fork(&p2.id, "bob").unwrap();

        let mine = store.forks_of("alice").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|f| f.fork.user == "alice"));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_adapters::FakeGit;
use kiln_core::SequentialIdGen;

fn repo_config(n: usize) -> RepoConfig {
    RepoConfig {
        root_dir: PathBuf::from("/tmp/repo-root"),
        branch_prefix: "batch".to_string(),
        initial_revision: "deadbeef".to_string(),
        working_subdir: PathBuf::from("."),
        worktree_envs: (0..n).map(|i| HashMap::from([("SLOT".to_string(), i.to_string())])).collect(),
    }
}

#[tokio::test]
async fn provisions_one_worktree_per_env_entry() {
    let git: Arc<dyn Git> = Arc::new(FakeGit::new());
    let id_gen: Arc<dyn IdGen> = Arc::new(SequentialIdGen::new("ws"));
    let repo = repo_config(3);

    let workspaces = provision_workspaces(&repo, &git, &id_gen).await.unwrap();

    assert_eq!(workspaces.len(), 3);
    assert_eq!(workspaces[1].dir, PathBuf::from("/tmp/repo-root/batch-1"));
    assert_eq!(workspaces[1].env.get("SLOT"), Some(&"1".to_string()));
}

#[tokio::test]
async fn provisioning_is_idempotent_against_an_already_provisioned_root() {
    let fake = Arc::new(FakeGit::new());
    let git: Arc<dyn Git> = fake.clone();
    let id_gen: Arc<dyn IdGen> = Arc::new(SequentialIdGen::new("ws"));
    let repo = repo_config(2);

    provision_workspaces(&repo, &git, &id_gen).await.unwrap();
    provision_workspaces(&repo, &git, &id_gen).await.unwrap();

    assert_eq!(fake.worktree_count(), 2);
}

//! The legacy client forwards to whatever backend its handle holds.

mod common;

use std::sync::Arc;

use classforge::backend::{Backend, BackendHandle, Credentials, ErrorKind, RepositoryOptions};
use classforge::capability::{Capabilities, Capability, ChangeRequestModel, GroupModel};
use classforge::compat::LegacyGitClient;
use classforge::model::Visibility;
use classforge::settings::{BackendDefaults, ConfigFormat};
use common::{InMemoryBackend, env_from, factory_with_memory};

async fn memory_backend(visibility: Visibility) -> Arc<InMemoryBackend> {
    let backend = InMemoryBackend::new(BackendDefaults { visibility });
    backend
        .authenticate(&Credentials::new("token"))
        .await
        .expect("auth");
    Arc::new(backend)
}

#[tokio::test]
async fn test_create_project_matches_create_repository() {
    let backend = memory_backend(Visibility::Private).await;
    let client = LegacyGitClient::from_backend(backend.clone());

    let project = client
        .create_project("homework-1", Some("cs101"))
        .await
        .expect("legacy create");
    let direct = backend
        .create_repository(
            "homework-2",
            Visibility::Private,
            &RepositoryOptions {
                namespace: Some("cs101".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("direct create");

    let fetched = backend
        .get_repository(&backend.adopt_id(&project.id))
        .await
        .expect("get");
    assert_eq!(project.id, fetched.id.value);
    assert_eq!(project.name, fetched.name);
    assert_eq!(project.http_url_to_repo, fetched.clone_url);
    assert_eq!(project.web_url, fetched.web_url);
    assert_eq!(project.namespace.full_path, direct.owner.login);
}

#[tokio::test]
async fn test_legacy_surface_round_trip() {
    let backend = memory_backend(Visibility::Internal).await;
    let client = LegacyGitClient::from_backend(backend);

    let project = client
        .create_project("homework-1", Some("cs101"))
        .await
        .expect("create");
    assert_eq!(project.visibility, Visibility::Internal);

    let listed = client
        .list_projects(Some("cs101"), None)
        .await
        .expect("list");
    assert_eq!(listed, vec![project.clone()]);

    let file = client
        .create_file(&project.id, "README.md", "# Homework 1\n", "Add README")
        .await
        .expect("file");
    assert_eq!(file.branch, "main");
    assert!(file.commit_id.is_some());

    let mr = client
        .create_merge_request(&project.id, "solution", "main", "Submit")
        .await
        .expect("mr");
    assert_eq!(mr.state, "opened");
    assert_eq!(mr.project_id, project.id);

    let user = client
        .create_user("alice", "alice@example.edu", "Alice", None)
        .await
        .expect("user");
    let group = client
        .create_group("CS101", None, None)
        .await
        .expect("group");
    client
        .add_user_to_group(&group.id, &user.id, 30)
        .await
        .expect("member");
    assert_eq!(client.get_user(&user.id).await.expect("get user"), user);

    let fork = client
        .fork_project(&project.id, Some("students"))
        .await
        .expect("fork");
    assert_eq!(fork.path_with_namespace, "students/homework-1");

    client.delete_project(&fork.id).await.expect("delete");
    let err = client.get_project(&fork.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.status, 404);
}

#[tokio::test]
async fn test_internal_default_downgrades_without_capability() {
    let backend = InMemoryBackend::new(BackendDefaults {
        visibility: Visibility::Internal,
    })
    .with_capabilities(
        Capabilities::none(GroupModel::Native, ChangeRequestModel::MergeRequest)
            .with(Capability::Groups, true),
    );
    backend
        .authenticate(&Credentials::new("token"))
        .await
        .expect("auth");
    let client = LegacyGitClient::from_backend(Arc::new(backend));

    let project = client
        .create_project("homework-1", Some("cs101"))
        .await
        .expect("create");
    assert_eq!(project.visibility, Visibility::Private);
}

#[tokio::test]
async fn test_swapping_backend_is_visible_to_existing_client() {
    let first = memory_backend(Visibility::Private).await;
    let second = memory_backend(Visibility::Private).await;
    let handle = BackendHandle::new(first.clone());
    let client = LegacyGitClient::new(handle.clone());

    client
        .create_project("before", None)
        .await
        .expect("create on first");
    handle.replace(second.clone());
    client
        .create_project("after", None)
        .await
        .expect("create on second");

    let active = client.handle().current();
    assert_eq!(active.instance_id(), second.instance_id());
    assert_eq!(
        first
            .get_repository(&first.adopt_id("1"))
            .await
            .expect("first kept its repo")
            .name,
        "before"
    );
    assert_eq!(
        second
            .get_repository(&second.adopt_id("1"))
            .await
            .expect("second got the new repo")
            .name,
        "after"
    );
}

#[tokio::test]
async fn test_errors_are_reshaped_not_swallowed() {
    let client = LegacyGitClient::from_backend(memory_backend(Visibility::Private).await);

    let err = client.create_project("", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.status, 400);

    let err = client.add_user_to_group("1", "2", 45).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_from_config() {
    let factory = factory_with_memory(env_from(&[("MEMORY_TOKEN", "secret")]));
    let document = factory
        .load_config_str(
            "backend:\n  type: memory\n  settings:\n    token: ${MEMORY_TOKEN}\n",
            ConfigFormat::Yaml,
        )
        .expect("parse");

    let client = LegacyGitClient::from_config(&factory, &document)
        .await
        .expect("client");
    let project = client
        .create_project("homework-1", None)
        .await
        .expect("create");
    assert_eq!(project.namespace.full_path, "instructor");

    let err = LegacyGitClient::from_config(
        &factory_with_memory(env_from(&[])),
        &document,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

//! Dependency guard integration tests
//!
//! Every write goes through `AppState::guard`, the same path the HTTP
//! handlers use.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use collabris::backend::auth::principal::Role;
use collabris::backend::tasks::{CycleError, EdgeChange};
use collabris::backend::BackendError;
use common::{create_test_project, create_test_task, create_test_user, TestApp};

#[tokio::test]
async fn test_chain_rejects_closing_edge() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "olga", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;

    let t1 = create_test_task(app.pool(), project, &owner, "Design").await;
    let t2 = create_test_task(app.pool(), project, &owner, "Build").await;
    let t3 = create_test_task(app.pool(), project, &owner, "Ship").await;

    assert_eq!(
        app.state.guard.add_dependency(t2.id, t1.id).await.unwrap(),
        EdgeChange::Created
    );
    assert_eq!(
        app.state.guard.add_dependency(t3.id, t2.id).await.unwrap(),
        EdgeChange::Created
    );

    let err = app.state.guard.add_dependency(t1.id, t3.id).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_matches!(
        err,
        BackendError::CycleConflict(CycleError::WouldCloseCycle { dependent, prerequisite, ref cycle })
            if dependent == t1.id && prerequisite == t3.id && cycle == &vec![t3.id, t2.id, t1.id]
    );

    let prerequisites = app.state.guard.prerequisites(t1.id).await.unwrap();
    assert!(prerequisites.is_empty());
}

#[tokio::test]
async fn test_reverse_edge_and_self_loop_conflict() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "pia", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;

    app.state.guard.add_dependency(a.id, b.id).await.unwrap();

    assert_matches!(
        app.state.guard.add_dependency(b.id, a.id).await,
        Err(BackendError::CycleConflict(CycleError::WouldCloseCycle { .. }))
    );
    assert_matches!(
        app.state.guard.add_dependency(a.id, a.id).await,
        Err(BackendError::CycleConflict(CycleError::SelfLoop { task })) if task == a.id
    );
}

#[tokio::test]
async fn test_concurrent_opposite_edges_only_one_wins() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "quinn", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;
    let (a, b) = (a.id, b.id);

    for _ in 0..10 {
        let forward = {
            let guard = app.state.guard.clone();
            tokio::spawn(async move { guard.add_dependency(a, b).await })
        };
        let backward = {
            let guard = app.state.guard.clone();
            tokio::spawn(async move { guard.add_dependency(b, a).await })
        };

        let (forward, backward) = tokio::join!(forward, backward);
        let results = [forward.unwrap(), backward.unwrap()];
        let created = results
            .iter()
            .filter(|r| matches!(r, Ok(EdgeChange::Created)))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(BackendError::CycleConflict(_))))
            .count();
        assert_eq!((created, conflicts), (1, 1));

        let removed_forward = app.state.guard.remove_dependency(a, b).await.unwrap();
        let removed_backward = app.state.guard.remove_dependency(b, a).await.unwrap();
        assert!(removed_forward ^ removed_backward);
    }
}

#[tokio::test]
async fn test_cross_project_edge_is_rejected() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "rhea", &[Role::Manager]).await;
    let first = create_test_project(app.pool(), &owner, &[]).await;
    let second = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), first, &owner, "A").await;
    let b = create_test_task(app.pool(), second, &owner, "B").await;

    let err = app.state.guard.add_dependency(a.id, b.id).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_edge_is_idempotent() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "sam", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;

    assert_eq!(
        app.state.guard.add_dependency(a.id, b.id).await.unwrap(),
        EdgeChange::Created
    );
    assert_eq!(
        app.state.guard.add_dependency(a.id, b.id).await.unwrap(),
        EdgeChange::AlreadyPresent
    );

    let prerequisites = app.state.guard.prerequisites(a.id).await.unwrap();
    assert_eq!(prerequisites.len(), 1);
    assert_eq!(prerequisites[0].id, b.id);
}

#[tokio::test]
async fn test_removed_edge_allows_reverse() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "tom", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;

    app.state.guard.add_dependency(a.id, b.id).await.unwrap();
    assert!(app.state.guard.remove_dependency(a.id, b.id).await.unwrap());
    assert!(!app.state.guard.remove_dependency(a.id, b.id).await.unwrap());

    assert_eq!(
        app.state.guard.add_dependency(b.id, a.id).await.unwrap(),
        EdgeChange::Created
    );
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "uma", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;

    let err = app.state.guard.add_dependency(a.id, 9_999).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let err = app.state.guard.prerequisites(9_999).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lock_table_empties_after_writes() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "vera", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;
    let (a, b) = (a.id, b.id);

    app.state.guard.add_dependency(a, b).await.unwrap();
    assert_eq!(app.state.guard.lock_count(), 0);

    assert!(app.state.guard.add_dependency(b, a).await.is_err());
    assert_eq!(app.state.guard.lock_count(), 0);

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let guard = app.state.guard.clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    guard.add_dependency(a, b).await
                } else {
                    guard.add_dependency(b, a).await
                }
            })
        })
        .collect();
    for writer in writers {
        let _ = writer.await.unwrap();
    }
    assert_eq!(app.state.guard.lock_count(), 0);
}

#[tokio::test]
async fn test_deleting_task_drops_its_edges() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.state, "wes", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    let a = create_test_task(app.pool(), project, &owner, "A").await;
    let b = create_test_task(app.pool(), project, &owner, "B").await;
    let c = create_test_task(app.pool(), project, &owner, "C").await;

    app.state.guard.add_dependency(a.id, b.id).await.unwrap();
    app.state.guard.add_dependency(b.id, c.id).await.unwrap();

    assert!(app.state.guard.delete_task(&b).await.unwrap());
    assert!(!app.state.guard.delete_task(&b).await.unwrap());
    assert_eq!(app.state.guard.lock_count(), 0);

    assert!(app.state.guard.prerequisites(a.id).await.unwrap().is_empty());
    assert_matches!(
        app.state.guard.prerequisites(b.id).await,
        Err(BackendError::NotFound { .. })
    );
    assert_eq!(
        app.state.guard.add_dependency(c.id, a.id).await.unwrap(),
        EdgeChange::Created
    );
}

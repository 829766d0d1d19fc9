//! Authentication test helpers
//!
//! Provides utilities for creating test users, generating tokens and
//! setting up projects with members.

use std::collections::BTreeSet;

use collabris::backend::auth::principal::{Principal, Role};
use collabris::backend::auth::users::{create_user, hash_password, load_principal, set_enabled};
use collabris::backend::projects::db::{add_member, create_project};
use collabris::backend::tasks::db::{create_task, Task};
use collabris::backend::server::AppState;
use collabris::shared::ProjectId;
use sqlx::SqlitePool;

/// Password every seeded user gets
pub const TEST_PASSWORD: &str = "password123";

/// Test user credentials
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub principal: Principal,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Create an enabled user with the given roles and a valid token
pub async fn create_test_user(state: &AppState, username: &str, roles: &[Role]) -> TestUser {
    let email = format!("{}@example.com", username);
    let hash = hash_password(TEST_PASSWORD, 4).expect("hash");
    let roles: BTreeSet<Role> = roles.iter().copied().collect();

    let user = create_user(&state.pool, username, &email, &hash, &roles)
        .await
        .expect("create user");
    set_enabled(&state.pool, user.id, true).await.expect("enable user");

    let principal = load_principal(&state.pool, &user).await.expect("principal");
    let token = state.tokens.issue(&principal).expect("token");

    TestUser {
        id: user.id,
        username: user.username,
        email,
        principal,
        token,
    }
}

/// Create a project owned by `owner` with the extra members
pub async fn create_test_project(pool: &SqlitePool, owner: &TestUser, members: &[&TestUser]) -> ProjectId {
    let project = create_project(pool, "Apollo", Some("test project"), owner.id)
        .await
        .expect("create project");
    for member in members {
        add_member(pool, project.id, member.id).await.expect("add member");
    }
    project.id
}

/// Create a task in a project
pub async fn create_test_task(pool: &SqlitePool, project_id: ProjectId, owner: &TestUser, title: &str) -> Task {
    create_task(pool, project_id, title, None, None, owner.id)
        .await
        .expect("create task")
}

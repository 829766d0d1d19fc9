/**
 * API Route Handlers
 *
 * This module defines route handlers for API endpoints, including:
 * - Public authentication endpoints
 * - Authenticated endpoints (projects, tasks, chat, notifications, dashboard)
 *
 * # Routes
 *
 * ## Public
 * - `POST /api/auth/signup` - User registration
 * - `POST /api/auth/signin` - Sign in
 * - `POST /api/auth/verify-email` - Verify e-mail with a code
 * - `POST /api/auth/resend-verification` - Mail a fresh verification code
 * - `POST /api/auth/forgot-password` - Mail a password reset code
 * - `POST /api/auth/reset-password` - Reset password with a code
 *
 * ## Authenticated
 * - `GET /api/auth/me` - Current user
 * - `GET|POST /api/projects` - List / create projects
 * - `POST /api/projects/{id}/members` - Add a member
 * - `DELETE /api/projects/{id}/members/{userId}` - Remove a member
 * - `GET|POST /api/projects/{id}/tasks` - List / create tasks
 * - `PUT|DELETE /api/tasks/{taskId}` - Edit / delete a task
 * - `GET /api/tasks/{taskId}/dependencies` - Prerequisites of a task
 * - `POST|DELETE /api/tasks/{taskId}/dependencies/{dependencyId}` - Edit edges
 * - `GET|POST /api/chat/rooms/{id}/messages` - Room history / send
 * - `GET /api/chat/rooms/{id}/messages/count` - Room message count
 * - `DELETE /api/chat/messages/{messageId}` - Delete a message
 * - `GET /api/notifications` - Notifications of the caller
 * - `PUT|PATCH /api/notifications/{id}/read` - Mark read
 * - `GET /api/dashboard/stats` - Dashboard statistics
 */

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::backend::auth::handlers::{
    forgot_password, get_me, resend_verification, reset_password, signin, signup, verify_email,
};
use crate::backend::chat::handlers::{
    delete_message_handler, get_message_count, get_messages, post_message,
};
use crate::backend::dashboard::handlers::get_stats;
use crate::backend::notifications::handlers::{list_notifications, mark_notification_read};
use crate::backend::projects::handlers::{
    add_member_handler, create_project_handler, create_task_handler, list_projects,
    list_tasks_handler, remove_member_handler,
};
use crate::backend::server::state::AppState;
use crate::backend::tasks::handlers::{
    add_dependency, delete_task_handler, list_dependencies, remove_dependency, update_task_handler,
};

/// Configure the routes that need no credential
pub fn configure_public_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/verify-email", post(verify_email))
        .route("/api/auth/resend-verification", post(resend_verification))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
}

/// Configure the routes that require a bearer token
///
/// The caller wraps the result in `auth_middleware`.
pub fn configure_protected_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/auth/me", get(get_me))
        // Projects and tasks
        .route("/api/projects", get(list_projects).post(create_project_handler))
        .route("/api/projects/{id}/members", post(add_member_handler))
        .route(
            "/api/projects/{id}/members/{user_id}",
            delete(remove_member_handler),
        )
        .route(
            "/api/projects/{id}/tasks",
            get(list_tasks_handler).post(create_task_handler),
        )
        .route(
            "/api/tasks/{task_id}",
            put(update_task_handler).delete(delete_task_handler),
        )
        // Dependency graph
        .route("/api/tasks/{task_id}/dependencies", get(list_dependencies))
        .route(
            "/api/tasks/{task_id}/dependencies/{dependency_id}",
            post(add_dependency).delete(remove_dependency),
        )
        // Chat
        .route(
            "/api/chat/rooms/{id}/messages",
            get(get_messages).post(post_message),
        )
        .route("/api/chat/rooms/{id}/messages/count", get(get_message_count))
        .route(
            "/api/chat/messages/{message_id}",
            delete(delete_message_handler),
        )
        // Notifications
        .route("/api/notifications", get(list_notifications))
        .route(
            "/api/notifications/{id}/read",
            put(mark_notification_read).patch(mark_notification_read),
        )
        // Dashboard
        .route("/api/dashboard/stats", get(get_stats))
}

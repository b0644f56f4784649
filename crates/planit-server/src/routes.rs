use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, enterprise_middleware};
use crate::handlers::{
    admin_requests as request_handlers, admin_users as user_handlers, auth as auth_handlers,
    dashboard as dashboard_handlers, documents as document_handlers,
    enterprise as enterprise_handlers, notifications as notification_handlers,
    projects as project_handlers, tasks as task_handlers, workspaces as workspace_handlers,
};
use crate::notify::Notifier;
use crate::{Config, DbPool};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub notifier: Notifier,
}

pub fn create_router(db: DbPool, config: Config) -> Router {
    let state = AppState {
        db,
        config,
        notifier: Notifier::new(),
    };

    // Public routes (no middleware)
    let public_routes = Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/signup-admin", post(auth_handlers::signup_admin))
        .route("/enterprise-login", post(enterprise_handlers::enterprise_login))
        .route("/enterprise-logout", post(enterprise_handlers::enterprise_logout));

    // Enterprise console, cookie session only
    let enterprise_routes = Router::new()
        .route("/session", get(enterprise_handlers::enterprise_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enterprise_middleware,
        ));

    let admin_request_routes = Router::new()
        .route("/", post(request_handlers::create_request))
        .route("/mine", get(request_handlers::my_requests))
        .route("/:id/accept", post(request_handlers::accept_request))
        .route("/:id/reject", post(request_handlers::reject_request));

    let admin_routes = Router::new()
        .route("/approvals", get(request_handlers::list_approvals))
        .route("/approvals/:id", post(request_handlers::decide_approval))
        .route("/users", get(user_handlers::list_users))
        .route("/users/:id/role", patch(user_handlers::update_user_role))
        .route("/users/:id/active", patch(user_handlers::set_user_active));

    let workspace_routes = Router::new()
        .route(
            "/",
            get(workspace_handlers::list_workspaces).post(workspace_handlers::create_workspace),
        )
        .route(
            "/:id",
            get(workspace_handlers::get_workspace)
                .patch(workspace_handlers::update_workspace)
                .delete(workspace_handlers::delete_workspace),
        )
        .route(
            "/:id/members",
            get(workspace_handlers::list_members).post(workspace_handlers::add_member),
        )
        .route(
            "/:id/members/:user_id",
            axum::routing::delete(workspace_handlers::remove_member),
        );

    let project_routes = Router::new()
        .route(
            "/",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route(
            "/:id",
            get(project_handlers::get_project)
                .patch(project_handlers::update_project)
                .delete(project_handlers::delete_project),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(task_handlers::list_tasks).post(task_handlers::create_task),
        )
        .route(
            "/:id",
            get(task_handlers::get_task)
                .patch(task_handlers::update_task)
                .delete(task_handlers::delete_task),
        );

    let document_routes = Router::new()
        .route(
            "/",
            get(document_handlers::list_documents).post(document_handlers::create_document),
        )
        .route(
            "/:id",
            get(document_handlers::get_document)
                .patch(document_handlers::update_document)
                .delete(document_handlers::delete_document),
        )
        .route("/:id/star", post(document_handlers::toggle_star));

    // Protected routes with auth middleware
    let protected_routes = Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .nest("/admin-requests", admin_request_routes)
        .nest("/admin", admin_routes)
        .nest("/workspaces", workspace_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/documents", document_routes)
        .route("/dashboard", get(dashboard_handlers::get_dashboard))
        .route(
            "/notifications/stream",
            get(notification_handlers::stream_notifications),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine all routes
    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            public_routes
                .nest("/enterprise", enterprise_routes)
                .merge(protected_routes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me))
        .route("/update-password", post(routes::auth::update_password))
        .route("/profile", put(routes::auth::update_profile));

    let company_routes = Router::new()
        .route("/", get(routes::company::get))
        .route("/create", post(routes::company::create))
        .route("/join", post(routes::company::join))
        .route("/company-invite", get(routes::company::invite_link))
        .route("/member/remove", post(routes::company::remove_member));

    let project_routes = Router::new()
        .route("/create", post(routes::project::create))
        .route("/all", get(routes::project::list_active))
        .route("/archived", get(routes::project::list_archived))
        .route("/archive", post(routes::project::archive))
        .route("/member/add", post(routes::project::add_member))
        .route("/member/remove", delete(routes::project::remove_member))
        .route("/employees", post(routes::project::employees))
        .route("/manager/reassign", post(routes::project::reassign_manager))
        .route("/invite", post(routes::project::invite))
        .route("/invite/respond", post(routes::project::respond_invite))
        .route("/invite/pending", get(routes::project::pending_invites))
        .route("/my/employee", get(routes::project::my_employee_projects))
        .route("/my/manager", get(routes::project::my_manager_projects));

    let task_routes = Router::new()
        .route("/assign", post(routes::task::assign))
        .route("/edit/{task_id}", put(routes::task::edit))
        .route("/delete/{task_id}", delete(routes::task::delete))
        .route(
            "/project/{project_id}/manager-tasks",
            get(routes::task::manager_tasks),
        )
        .route("/project/{project_id}/my-tasks", get(routes::task::my_tasks))
        .route("/respond/{task_id}", post(routes::task::respond))
        .route("/{task_id}", get(routes::task::get));

    // Flat so that both `/chat` and `/chat/` list rooms.
    let chat_routes = Router::new()
        .route("/chat", get(routes::chat::my_rooms))
        .route("/chat/", get(routes::chat::my_rooms))
        .route(
            "/chat/message/{message_id}",
            delete(routes::chat::delete_message),
        )
        .route("/chat/{room_id}", get(routes::chat::history));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/company", company_routes)
        .nest("/project", project_routes)
        .nest("/tasks", task_routes)
        .merge(chat_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

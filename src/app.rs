use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, put},
};
use log::{error, info};
use serde_json::json;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::login::{
    current_user, handle_login, handle_logout, handle_register, require_auth,
};
use crate::records::RecordFields;
use crate::session::SessionStore;
use crate::store::DataStore;

/// Shared application state: the persistent store and the session map
pub struct AppState {
    pub store: DataStore,
    pub sessions: SessionStore,
}

/// Build an error response in the `{"detail": ...}` shape the client expects
pub(crate) fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"detail": message}))).into_response()
}

/// Build the application router over a prepared state
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/data", get(list_records).post(create_record))
        .route("/data/:id", put(update_record).delete(delete_record))
        .route("/user/me", get(current_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(serve_grid_page))
        .route("/login", get(serve_login_page).post(handle_login))
        .route("/register", axum::routing::post(handle_register))
        .route("/logout", axum::routing::post(handle_logout))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server on the given port over the database at `db_path`
pub async fn run(port: u16, db_path: &FsPath) -> Result<(), Box<dyn std::error::Error>> {
    let store = DataStore::open(db_path)?;
    let state = Arc::new(AppState {
        store,
        sessions: SessionStore::new(),
    });

    let app = router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_grid_page() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

/// `GET /data` - every record, ordered by id
async fn list_records(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.list_records())
}

/// `POST /data` - insert a row; the store always assigns a fresh id
async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<RecordFields>,
) -> Response {
    if fields.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Cannot add completely empty record",
        );
    }

    match state.store.create_record(&fields) {
        Ok(id) => Json(json!({"message": "Record added", "id": id})).into_response(),
        Err(e) => {
            error!("Error in /data POST endpoint: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// `PUT /data/{id}` - overwrite the tracked fields of a row
async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(fields): Json<RecordFields>,
) -> Response {
    match state.store.update_record(id, &fields) {
        Ok(true) => Json(json!({"message": "Updated successfully"})).into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, "Record not found"),
        Err(e) => {
            error!("Error in /data PUT endpoint: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// `DELETE /data/{id}` - remove a row
async fn delete_record(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.delete_record(id) {
        Ok(true) => Json(json!({"message": "Deleted successfully"})).into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, "Record not found"),
        Err(e) => {
            error!("Error in /data DELETE endpoint: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

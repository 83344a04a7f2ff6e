use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::BearerToken, repo_types::User},
    error::AuthError,
    extension::SimpleJwtExtension,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

pub fn build_app(state: AppState) -> Router {
    let extension = SimpleJwtExtension::new(state.jwt.clone());
    let routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/me", get(me));

    extension
        .mount(routes, &state.config.mount_path)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

#[instrument(skip(state, token))]
async fn me(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MeResponse>, AuthError> {
    let user_id = Uuid::parse_str(&token.sub).map_err(|_| AuthError::invalid_token())?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            error!(user_id = %user_id, "user not found");
            AuthError::NotAuthorized("User not found.".into())
        })?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        username: user.username,
    }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

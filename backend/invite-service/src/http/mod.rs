/// HTTP API
///
/// - `POST /invite`: invite a member into a group (session required)
/// - `GET /whoami`: Hasura session variables for the caller (session required)
/// - `POST /auth/signin`, `POST /auth/user/password/reset`: password routes (public)
/// - `PUT /auth/user/password`: change the session user's password (session required)
/// - `GET /health`: liveness probe
///
/// Sessions are SuperTokens access tokens, read from the `sAccessToken` cookie
/// or an `Authorization: Bearer` header, and verified against the core.
mod auth;
mod invite;
mod whoami;

pub use auth::{reset_password, sign_in, update_password, SignedInUser, StatusResponse};
pub use invite::invite;
pub use whoami::{whoami, WhoAmIResponse};

use crate::clients::{Backend, SessionStore};
use crate::models::Inviter;
use crate::services::{CredentialGuard, InvitationWorkflow};
use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::CookieJar;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

const ACCESS_TOKEN_COOKIE: &str = "sAccessToken";
/// Routes served without a session
const PUBLIC_PATHS: [&str; 3] = ["/health", "/auth/signin", "/auth/user/password/reset"];
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared HTTP server state
#[derive(Clone)]
pub struct HttpServerState {
    pub workflow: Arc<InvitationWorkflow>,
    pub backend: Arc<dyn Backend>,
    pub credentials: Arc<CredentialGuard>,
    pub sessions: Arc<dyn SessionStore>,
    /// Domain attribute of the session cookie set on sign-in
    pub cookie_domain: String,
    /// Budget for one whole invitation chain
    pub invite_deadline: Duration,
}

/// Build the HTTP router with all endpoints
pub fn build_router(state: HttpServerState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health_check))
        .route("/invite", post(invite))
        .route("/whoami", get(whoami))
        .route("/auth/signin", post(sign_in))
        .route("/auth/user/password/reset", post(reset_password))
        .route("/auth/user/password", put(update_password))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ))
        .with_state(state)
}

/// CORS for the web frontend and the Hasura endpoint, with credentials
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("rid"),
            HeaderName::from_static("fdi-version"),
            HeaderName::from_static("anti-csrf"),
            HeaderName::from_static("st-auth-mode"),
            header::AUTHORIZATION,
        ]))
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Session middleware - resolves the caller and stores it as `Inviter`
async fn session_middleware(
    State(state): State<Arc<HttpServerState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = access_token(&request) else {
        return (StatusCode::UNAUTHORIZED, "no session found").into_response();
    };

    match state.sessions.verify(&token).await {
        Ok(Some(user_id)) => {
            request.extensions_mut().insert(Inviter::new(user_id));
            next.run(request).await
        }
        Ok(None) => {
            warn!(path = %request.uri().path(), "Rejected request with invalid session");
            (StatusCode::UNAUTHORIZED, "invalid session").into_response()
        }
        Err(e) => {
            error!(path = %request.uri().path(), error = %e, "Session verification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "session verification failed").into_response()
        }
    }
}

fn access_token(request: &Request) -> Option<String> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(request.headers())
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Start the HTTP server and drain it on Ctrl+C / SIGTERM
pub async fn start_http_server(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Starting HTTP server on {}", addr);

    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();

    let grace_expired = async {
        if draining_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    tokio::select! {
        result = serve => {
            result.context("HTTP server error")?;
            info!("shutdown ok");
        }
        _ = grace_expired => {
            warn!("Open connections did not drain within {:?}; forcing shutdown", SHUTDOWN_GRACE);
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header_name: header::HeaderName, value: &str) -> Request {
        axum::http::Request::builder()
            .uri("/whoami")
            .header(header_name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_access_token_from_bearer() {
        let request = request_with(header::AUTHORIZATION, "Bearer tok-1");
        assert_eq!(access_token(&request).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_access_token_from_cookie() {
        let request = request_with(header::COOKIE, "theme=dark; sAccessToken=tok-2");
        assert_eq!(access_token(&request).as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_missing_access_token() {
        let request = request_with(header::COOKIE, "theme=dark");
        assert_eq!(access_token(&request), None);
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let origins = vec![
            "https://app.example.com".to_string(),
            "https://hasura.example.com".to_string(),
        ];
        assert!(cors_layer(&origins).is_ok());
    }
}

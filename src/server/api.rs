use crate::agent::RelayAgent;
use crate::cli::Args;
use crate::config::DegradedPolicy;
use crate::error::RelayError;
use crate::models::chat::{ ChatReply, ChatRequest, ErrorBody, StatusBody };
use super::cors::{ cors_gate, CorsPolicy };
use std::any::Any;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::DefaultBodyLimit,
    routing::get,
    Router,
    extract::State,
    middleware,
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use uuid::Uuid;
use log::{ info, warn, error };

pub const STATUS_MESSAGE: &str = "Chat relay is running! Use POST /api/chat to chat.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable. Please try again.";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<RelayAgent>,
}

pub fn router(state: AppState, cors: CorsPolicy) -> Router {
    Router::new()
        .route("/", get(status_handler).post(chat_handler))
        .route("/api/chat", get(status_handler).post(chat_handler))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(Arc::new(cors), cors_gate))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(DefaultBodyLimit::disable())
        )
        .with_state(state)
}

pub async fn start_http_server(
    args: &Args,
    state: AppState
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args
        .server_addr()
        .parse::<SocketAddr>()
        .map_err(|e| format!("Invalid listen address '{}': {}", args.server_addr(), e))?;
    let app = router(state, CorsPolicy::new(&args.allowed_origins));

    if args.enable_tls {
        match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                let tls_config = axum_server::tls_rustls::RustlsConfig
                    ::from_pem_file(cert_path, key_path).await
                    .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

                info!("Starting HTTPS server on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        }
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
        info!("Starting HTTP server on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;
    }

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

async fn status_handler() -> Json<StatusBody> {
    Json(StatusBody { message: STATUS_MESSAGE.to_string() })
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found"))).into_response()
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();

    let request = match ChatRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("[{}] Rejected chat request: {}", request_id, e);
            return e.into_response();
        }
    };
    info!(
        "[{}] Chat request with {} messages (model override: {})",
        request_id,
        request.messages.len(),
        request.model.as_deref().unwrap_or("none")
    );

    match state.agent.chat(&request).await {
        Ok(reply) => {
            info!("[{}] Reply ready ({} chars)", request_id, reply.chars().count());
            Json(ChatReply { reply }).into_response()
        }
        Err(err) if err.is_degradable() => {
            warn!("[{}] Serving degraded response: {}", request_id, err);
            degraded_response(&state.agent, &err)
        }
        Err(err) => {
            error!("[{}] Chat request failed: {}", request_id, err);
            err.into_response()
        }
    }
}

fn degraded_response(agent: &RelayAgent, err: &RelayError) -> Response {
    match agent.config().degraded_policy {
        DegradedPolicy::Lenient => {
            let prompts = agent.prompts();
            let reply = match err {
                RelayError::NoWorkingModel { .. } => prompts.unavailable_reply.clone(),
                _ => prompts.fallback_reply.clone(),
            };
            Json(ChatReply { reply }).into_response()
        }
        DegradedPolicy::Strict => {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(SERVICE_UNAVAILABLE_MESSAGE)),
            ).into_response()
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("Handler panicked: {}", detail);

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(INTERNAL_ERROR_MESSAGE))).into_response()
}

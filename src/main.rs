use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use mail_groups::{
    config,
    handlers::rest::{self, AppState},
    mail,
    repository::SupabaseStore,
    service::{GroupService, SendService},
};

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load configuration: {e}");
        panic!("failed to load configuration: {e}");
    });
    tracing::info!("Successfully loaded mail groups config");

    // Store creation
    let store = SupabaseStore::new(&cfg.supabase).unwrap_or_else(|e| {
        tracing::error!("Failed to set up database client: {e}");
        panic!("failed to set up database client: {e}");
    });

    // Transport selection, once for the whole process
    let transport = mail::build_transport(&cfg.mail);
    if let Err(e) = &transport {
        tracing::warn!("Sending is disabled: {e}");
    }

    // Service creation
    let groups = GroupService::new(Arc::new(store));
    let sender = SendService::new(groups.clone(), transport, cfg.mail.sender());
    let state = AppState {
        groups: Arc::new(groups),
        sender: Arc::new(sender),
    };

    let router = Router::new()
        .route("/", get(root))
        .nest("/rest", rest::router(state, cfg.max_upload_bytes))
        .merge(SwaggerUi::new("/swagger-ui").url("/rest/api-doc/openapi.json", rest::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("listener has a local address");

    tracing::info!("Mail groups server starting, listening on {}", addr);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}

async fn root() -> Response {
    (StatusCode::OK, "Hello from mail groups!").into_response()
}

//! HTTP front end: one GraphQL endpoint with the GraphiQL IDE on GET,
//! plus a health check. All routes allow cross origin callers so the
//! server can back a locally served front end during development.

use std::net::{IpAddr, SocketAddr};

use async_graphql::dynamic::Schema;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{Router, extract::State, response::Html, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::ServerError;

/// Path serving both the GraphQL endpoint and the GraphiQL IDE.
pub const GRAPHQL_PATH: &str = "/graphql";

/// Serves the schema until the process is interrupted.
pub async fn serve(schema: Schema, address: IpAddr, port: u16) -> Result<(), ServerError> {
    let listen_address = SocketAddr::new(address, port);
    let listener =
        tokio::net::TcpListener::bind(listen_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: listen_address.to_string(),
                source,
            })?;

    info!("GraphQL server running at http://{listen_address}{GRAPHQL_PATH}");

    axum::serve(listener, app(schema))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

fn app(schema: Schema) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .with_state(schema)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Spans carry method + path only, never query contents
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

async fn health() -> &'static str {
    "ok"
}

#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

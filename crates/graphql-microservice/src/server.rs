//! The HTTP server a microservice runs on.

use std::{fmt, io, net::SocketAddr, sync::Arc};

use async_graphql::{dynamic::Schema, http::GraphiQLSource};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
    task::JoinHandle,
};
use tower_http::cors::CorsLayer;

use crate::{
    config::{EffectiveConfig, HealthCheck, ServerConfig},
    context::{ContextSpec, IntegrationContext},
    schema::RequestContext,
    Error,
};

/// Path of the Apollo health check endpoint.
pub const HEALTH_CHECK_PATH: &str = "/.well-known/apollo/server-health";

/// Where a started server can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenResult {
    /// The GraphQL endpoint
    pub url: String,
    pub health_check_url: String,
    /// The address actually bound
    pub address: SocketAddr,
}

/// A server that can be started and stopped.
#[async_trait::async_trait]
pub trait Server: Send + Sync {
    /// Starts listening on `port`, or the configured port if `None`.
    async fn listen(&self, port: Option<u16>) -> crate::Result<ListenResult>;

    async fn stop(&self) -> crate::Result<()>;
}

/// Constructs the server out of the effective configuration.
pub trait ServerFactory: Send + Sync {
    type Server: Server;

    fn create(&self, config: EffectiveConfig) -> crate::Result<Self::Server>;
}

/// Serves the federated schema with axum.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphQlServerFactory;

impl ServerFactory for GraphQlServerFactory {
    type Server = GraphQlServer;

    fn create(&self, config: EffectiveConfig) -> crate::Result<GraphQlServer> {
        let schema = config.schema.finish(&config.server)?;

        Ok(GraphQlServer {
            schema,
            config: Arc::new(config.server),
            context: config.context,
            running: Mutex::new(None),
        })
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

pub struct GraphQlServer {
    schema: Schema,
    config: Arc<ServerConfig>,
    context: Option<ContextSpec>,
    running: Mutex<Option<Running>>,
}

impl fmt::Debug for GraphQlServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQlServer")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Drop for GraphQlServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.send(()).ok();
        }
    }
}

impl GraphQlServer {
    /// The executable schema, usable without going through HTTP.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The context resolvers receive, if any.
    pub fn context(&self) -> Option<&ContextSpec> {
        self.context.as_ref()
    }

    /// Executes a request the way the HTTP endpoint does.
    pub async fn execute(
        &self,
        integration: &IntegrationContext,
        request: impl Into<async_graphql::Request>,
    ) -> async_graphql::Response {
        execute(&self.schema, self.context.as_ref(), integration, request.into()).await
    }

    fn router(&self) -> Router {
        let state = AppState {
            schema: self.schema.clone(),
            context: self.context.clone(),
            on_health_check: self.config.on_health_check.clone(),
            path: Arc::from(self.config.path.as_str()),
        };

        let mut graphql = post(graphql_handler);

        if self.config.playground {
            graphql = graphql.get(graphiql_handler);
        }

        let router = Router::new()
            .route(&self.config.path, graphql)
            .route(HEALTH_CHECK_PATH, get(health_handler))
            .with_state(state);

        if self.config.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }
}

#[async_trait::async_trait]
impl Server for GraphQlServer {
    async fn listen(&self, port: Option<u16>) -> crate::Result<ListenResult> {
        let mut running = self.running.lock().await;

        if running.is_some() {
            return Err(Error::ListenFailure(io::Error::new(
                io::ErrorKind::AddrInUse,
                "the server is already listening",
            )));
        }

        let port = port.or(self.config.port).unwrap_or(0);
        let listener = TcpListener::bind(SocketAddr::new(self.config.host, port))
            .await
            .map_err(Error::ListenFailure)?;
        let address = listener.local_addr().map_err(Error::ListenFailure)?;

        let (shutdown, shutdown_receiver) = oneshot::channel::<()>();
        let app = self.router();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_receiver.await.ok();
                })
                .await
        });

        let origin = self.config.origin(address.port());
        let url = format!("{origin}{}", self.config.path);

        tracing::debug!("GraphQL endpoint exposed at {url}");

        *running = Some(Running { shutdown, task });

        Ok(ListenResult {
            url,
            health_check_url: format!("{origin}{HEALTH_CHECK_PATH}"),
            address,
        })
    }

    async fn stop(&self) -> crate::Result<()> {
        let Some(Running { shutdown, task }) = self.running.lock().await.take() else {
            return Ok(());
        };

        shutdown.send(()).ok();

        match task.await {
            Ok(result) => result.map_err(|err| Error::StopFailure(err.to_string())),
            Err(err) => Err(Error::StopFailure(err.to_string())),
        }
    }
}

#[derive(Clone)]
struct AppState {
    schema: Schema,
    context: Option<ContextSpec>,
    on_health_check: Option<HealthCheck>,
    path: Arc<str>,
}

async fn execute(
    schema: &Schema,
    context: Option<&ContextSpec>,
    integration: &IntegrationContext,
    request: async_graphql::Request,
) -> async_graphql::Response {
    let context = context
        .map(|context| context.evaluate(integration))
        .unwrap_or_default();

    schema
        .execute(request.data(RequestContext(Arc::new(context))))
        .await
}

async fn graphql_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let integration = IntegrationContext { method, uri, headers };

    execute(&state.schema, state.context.as_ref(), &integration, req.into_inner())
        .await
        .into()
}

async fn graphiql_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(&state.path).finish())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = match &state.on_health_check {
        Some(check) => match check().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("health check failed: {err:#}");
                false
            }
        },
        None => true,
    };

    if healthy {
        (StatusCode::OK, Json(serde_json::json!({ "status": "pass" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "status": "fail" })))
    }
}

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr},
    path::Path,
    sync::Arc,
};

use futures_util::future::BoxFuture;

use crate::{context::ContextSpec, directives::DirectiveMap, schema::FederatedSchema};

/// Called on every health check request. An error reports the service as
/// failing.
pub type HealthCheck = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Settings of the GraphQL server, passed through to it untouched apart from
/// the schema and the context.
pub struct ServerConfig {
    /// Address to bind to
    pub host: IpAddr,
    /// Port to listen on when `start` is called without one. Ephemeral if unset.
    pub port: Option<u16>,
    /// Path of the GraphQL endpoint
    pub path: String,
    /// Whether the schema can be introspected
    pub introspection: bool,
    /// Serve GraphiQL on `GET {path}`
    pub playground: bool,
    /// Allow requests from any origin
    pub cors: bool,
    /// Graph operation limit settings
    pub operation_limits: OperationLimitsConfig,
    /// Context handed to resolvers, overridden by the composed context.
    #[serde(skip)]
    pub context: Option<ContextSpec>,
    /// Never reaches the server: directives are applied by the factory.
    #[serde(skip)]
    pub schema_directives: Option<DirectiveMap>,
    #[serde(skip)]
    pub on_health_check: Option<HealthCheck>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: None,
            path: "/".to_string(),
            introspection: true,
            playground: true,
            cors: true,
            operation_limits: Default::default(),
            context: None,
            schema_directives: None,
            on_health_check: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("introspection", &self.introspection)
            .field("playground", &self.playground)
            .field("cors", &self.cors)
            .field("operation_limits", &self.operation_limits)
            .field("context", &self.context)
            .field("schema_directives", &self.schema_directives)
            .field("on_health_check", &self.on_health_check.is_some())
            .finish()
    }
}

impl ServerConfig {
    pub fn from_toml(input: &str) -> crate::Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();

        let input = std::fs::read_to_string(path)
            .map_err(|err| crate::Error::Config(format!("reading {}: {err}", path.display())))?;

        Self::from_toml(&input)
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<ContextSpec>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_schema_directives(mut self, directives: DirectiveMap) -> Self {
        self.schema_directives = Some(directives);
        self
    }

    #[must_use]
    pub fn with_health_check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_health_check = Some(Arc::new(move || Box::pin(check())));
        self
    }

    /// `http://{host}:{port}`, unspecified addresses shown as `localhost`.
    pub(crate) fn origin(&self, port: u16) -> String {
        match self.host {
            host if host.is_unspecified() || host.is_loopback() => format!("http://localhost:{port}"),
            IpAddr::V6(host) => format!("http://[{host}]:{port}"),
            IpAddr::V4(host) => format!("http://{host}:{port}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationLimitsConfig {
    /// Limits the deepest nesting of selection sets in an operation,
    /// including fields in fragments.
    pub depth: Option<usize>,
    /// Every scalar field adds 1 point, nested fields add the points of their
    /// selection.
    pub complexity: Option<usize>,
}

/// What the server is constructed from.
#[derive(Debug)]
pub struct EffectiveConfig {
    pub server: ServerConfig,
    pub schema: FederatedSchema,
    pub context: Option<ContextSpec>,
}

impl EffectiveConfig {
    /// Overlays, in order: the server config, the schema, and the context
    /// when one was composed. `schema_directives` never gets through.
    pub fn merge(mut server: ServerConfig, schema: FederatedSchema, context: Option<ContextSpec>) -> Self {
        server.schema_directives = None;

        let context = match context {
            Some(context) => {
                server.context = None;
                Some(context)
            }
            None => server.context.take(),
        };

        Self {
            server,
            schema,
            context,
        }
    }
}

//! Federated GraphQL subservices without the boilerplate.
//!
//! [`microservice`] takes the SDL of a subgraph, its resolvers, its
//! datasources and a few options, and returns a [`Microservice`] that can be
//! started and stopped:
//!
//! ```no_run
//! use graphql_microservice::{microservice, DataSources, LoggerCandidate, Options, ResolverMap};
//! use serde_json::json;
//!
//! # async fn run() -> graphql_microservice::Result<()> {
//! let service = microservice(
//!     r#"type Query { me: User } type User @key(fields: "id") { id: ID! name: String }"#,
//!     ResolverMap::new().resolver("Query", "me", json!({ "id": "1", "name": "Ada" })),
//!     DataSources::none(),
//!     Options::new().with_logger(LoggerCandidate::tracing()),
//! )?;
//!
//! service.start(Some(4001)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Every input is validated before anything is built. When a complete logger
//! is given, it is injected into the resolver context under `logger`.

mod config;
mod context;
mod datasources;
mod directives;
mod error;
mod factory;
mod logger;
mod resolver;
mod schema;
mod server;
mod type_defs;
mod validation;

pub mod telemetry;

pub use config::{EffectiveConfig, HealthCheck, OperationLimitsConfig, ServerConfig};
pub use context::{
    compose_context, ContextFactory, ContextMap, ContextSpec, ContextValue, IntegrationContext, LOGGER_KEY,
};
pub use datasources::{
    DataSource, DataSourceAccessor, DataSourceFactory, DataSourceMap, DataSources, ResolvedDataSources,
};
pub use directives::{visit_schema_directives, DirectiveMap, FieldVisit, ObjectVisit, SchemaDirective};
pub use error::Error;
pub use factory::{Factory, Microservice, Options};
pub use logger::{is_logger, ContextLogger, LogFn, Logger, LoggerCandidate, TracingLogger};
pub use resolver::{FieldError, ResolveInfo, Resolver, ResolverMap, ResolverResult, RESOLVE_REFERENCE};
pub use schema::{FederatedSchema, FederatedSchemaBuilder, SchemaBuilder, SchemaModule};
pub use server::{GraphQlServer, GraphQlServerFactory, ListenResult, Server, ServerFactory, HEALTH_CHECK_PATH};
pub use type_defs::{gql, TypeDefs};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Creates a microservice served by the default GraphQL server.
pub fn microservice(
    type_defs: impl Into<TypeDefs>,
    resolvers: ResolverMap,
    datasources: impl Into<DataSources>,
    options: Options,
) -> Result<Microservice<GraphQlServer>> {
    Factory::new().create(type_defs, resolvers, datasources, options)
}

/// [`microservice`] with the schema directives as a parameter of their own.
/// They must not be given in `options` as well.
pub fn microservice_with_directives(
    type_defs: impl Into<TypeDefs>,
    resolvers: ResolverMap,
    datasources: impl Into<DataSources>,
    schema_directives: DirectiveMap,
    options: Options,
) -> Result<Microservice<GraphQlServer>> {
    Factory::new().create_with_directives(type_defs, resolvers, datasources, schema_directives, options)
}

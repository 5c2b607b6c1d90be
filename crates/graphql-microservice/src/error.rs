/// The error type of the microservice factory and its server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The type definitions are neither a non-empty SDL string nor a parsed document.
    #[error("typeDefs must be either a string, or a document created with gql: {0}")]
    InvalidTypeDefs(String),
    /// The resolver map contains a key that cannot name a GraphQL type or field.
    #[error("resolvers must be a plain map of types to fields: {0}")]
    InvalidResolvers(String),
    /// The datasources cannot be exposed to resolvers.
    #[error("datasources must be a constructible type, a map, or a factory: {0}")]
    InvalidDataSources(String),
    /// The directive map is malformed or was supplied twice.
    #[error("schemaDirectives must be a plain map of directives: {0}")]
    InvalidDirectives(String),
    /// The SDL could not be parsed.
    #[error("error parsing type definitions: {0}")]
    TypeDefsSyntax(String),
    /// The federated schema could not be assembled.
    #[error("error building the federated schema: {0}")]
    SchemaBuild(String),
    /// The server configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),
    /// The logging subscriber could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
    /// Cannot start the HTTP server
    #[error("starting server: {0}")]
    ListenFailure(#[source] std::io::Error),
    /// The HTTP server failed while shutting down
    #[error("stopping server: {0}")]
    StopFailure(String),
}

impl From<async_graphql::dynamic::SchemaError> for Error {
    fn from(value: async_graphql::dynamic::SchemaError) -> Self {
        Self::SchemaBuild(value.to_string())
    }
}

impl From<async_graphql::parser::Error> for Error {
    fn from(value: async_graphql::parser::Error) -> Self {
        Self::TypeDefsSyntax(value.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

use crate::{
    config::{EffectiveConfig, ServerConfig},
    context::{compose_context, ContextSpec},
    datasources::{DataSourceAccessor, DataSources},
    directives::{visit_schema_directives, DirectiveMap},
    logger::LoggerCandidate,
    resolver::ResolverMap,
    schema::{FederatedSchemaBuilder, SchemaBuilder, SchemaModule},
    server::{GraphQlServerFactory, ListenResult, Server, ServerFactory},
    type_defs::TypeDefs,
    validation, Error,
};

/// Optional inputs of a microservice.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Context handed to every resolver.
    pub context: Option<ContextSpec>,
    /// Injected into the context under `logger` when it has all four log
    /// functions.
    pub logger: Option<LoggerCandidate>,
    pub schema_directives: Option<DirectiveMap>,
    /// Passed to the server. Its `schema_directives` are ignored.
    pub config: ServerConfig,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<ContextSpec>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl Into<LoggerCandidate>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    #[must_use]
    pub fn with_schema_directives(mut self, directives: DirectiveMap) -> Self {
        self.schema_directives = Some(directives);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Creates microservices with the given schema builder and server factory.
#[derive(Clone, Debug, Default)]
pub struct Factory<B = FederatedSchemaBuilder, S = GraphQlServerFactory> {
    schema_builder: B,
    server_factory: S,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B, S> Factory<B, S>
where
    B: SchemaBuilder,
    S: ServerFactory,
{
    pub fn with_collaborators(schema_builder: B, server_factory: S) -> Self {
        Self {
            schema_builder,
            server_factory,
        }
    }

    /// Validates the inputs and assembles the service. Nothing is built if
    /// any input is invalid.
    pub fn create(
        &self,
        type_defs: impl Into<TypeDefs>,
        resolvers: ResolverMap,
        datasources: impl Into<DataSources>,
        options: Options,
    ) -> crate::Result<Microservice<S::Server>> {
        self.assemble(type_defs.into(), resolvers, datasources.into(), None, options)
    }

    /// Like [`Factory::create`], with the directives as a parameter of their
    /// own. They must not be given in `options` as well.
    pub fn create_with_directives(
        &self,
        type_defs: impl Into<TypeDefs>,
        resolvers: ResolverMap,
        datasources: impl Into<DataSources>,
        schema_directives: DirectiveMap,
        options: Options,
    ) -> crate::Result<Microservice<S::Server>> {
        self.assemble(
            type_defs.into(),
            resolvers,
            datasources.into(),
            Some(schema_directives),
            options,
        )
    }

    fn assemble(
        &self,
        type_defs: TypeDefs,
        resolvers: ResolverMap,
        datasources: DataSources,
        schema_directives: Option<DirectiveMap>,
        options: Options,
    ) -> crate::Result<Microservice<S::Server>> {
        let Options {
            context,
            logger,
            schema_directives: optional_directives,
            config,
        } = options;

        validation::type_defs(&type_defs)?;
        validation::resolvers(&resolvers)?;
        validation::datasources(&datasources)?;

        let schema_directives = match (schema_directives, optional_directives) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidDirectives(
                    "directives were given both as a parameter and in the options".into(),
                ))
            }
            (Some(directives), None) | (None, Some(directives)) => directives,
            (None, None) => DirectiveMap::new(),
        };

        validation::directives(&schema_directives)?;

        let type_defs = type_defs.into_document()?;
        let datasources = DataSourceAccessor::from(datasources.resolve());
        let context = compose_context(context, logger.as_ref());

        let mut schema = self.schema_builder.build(vec![SchemaModule {
            type_defs,
            resolvers,
            datasources,
        }])?;

        visit_schema_directives(&mut schema, &schema_directives);

        let server = self
            .server_factory
            .create(EffectiveConfig::merge(config, schema, context))?;

        Ok(Microservice { server })
    }
}

/// A configured service, ready to be started.
#[derive(Debug)]
pub struct Microservice<S> {
    server: S,
}

impl<S: Server> Microservice<S> {
    /// Starts listening on `port`, the configured port, or an ephemeral one.
    pub async fn start(&self, port: Option<u16>) -> crate::Result<ListenResult> {
        let result = self.server.listen(port).await?;

        tracing::info!("Server ready at {}", result.url);
        tracing::info!("Try your health check at: {}", result.health_check_url);

        Ok(result)
    }

    pub async fn stop(&self) -> crate::Result<()> {
        self.server.stop().await
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn into_server(self) -> S {
        self.server
    }
}

//! Datasources exposed to resolvers.

use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

pub type DataSource = Arc<dyn Any + Send + Sync>;

pub type DataSourceFactory = Arc<dyn Fn() -> DataSource + Send + Sync>;

/// Named datasources.
#[derive(Clone, Default)]
pub struct DataSourceMap {
    sources: BTreeMap<String, DataSource>,
}

impl DataSourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, source: T) -> Self {
        self.sources.insert(name.into(), Arc::new(source));
        self
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.sources.get(name)?.clone().downcast().ok()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sources.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for DataSourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.sources.keys()).finish()
    }
}

/// How the caller provides datasources.
#[derive(Clone)]
pub enum DataSources {
    /// Instantiated once, with no arguments, when the service is built.
    Constructible(fn() -> DataSource),
    /// Handed to resolvers as is.
    Factory(DataSourceFactory),
    /// Handed to resolvers as is.
    Map(DataSourceMap),
}

fn construct<T: Default + Any + Send + Sync>() -> DataSource {
    Arc::new(T::default())
}

impl DataSources {
    pub fn constructible<T: Default + Any + Send + Sync>() -> Self {
        Self::Constructible(construct::<T>)
    }

    pub fn factory<T: Any + Send + Sync>(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::Factory(Arc::new(move || Arc::new(f()) as DataSource))
    }

    pub fn map(map: DataSourceMap) -> Self {
        Self::Map(map)
    }

    /// No datasources at all.
    pub fn none() -> Self {
        Self::Map(DataSourceMap::new())
    }

    pub fn resolve(self) -> ResolvedDataSources {
        match self {
            Self::Constructible(construct) => ResolvedDataSources::Instance(construct()),
            Self::Factory(factory) => ResolvedDataSources::Factory(factory),
            Self::Map(map) => ResolvedDataSources::Map(map),
        }
    }
}

impl Default for DataSources {
    fn default() -> Self {
        Self::none()
    }
}

impl From<DataSourceMap> for DataSources {
    fn from(map: DataSourceMap) -> Self {
        Self::Map(map)
    }
}

impl fmt::Debug for DataSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructible(_) => f.write_str("Constructible"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
        }
    }
}

/// Datasources after construction. Shared by every request of a service.
#[derive(Clone)]
pub enum ResolvedDataSources {
    Instance(DataSource),
    Factory(DataSourceFactory),
    Map(DataSourceMap),
}

impl ResolvedDataSources {
    /// The single datasource instance. For a factory, the factory is called.
    pub fn instance<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Instance(instance) => instance.clone().downcast().ok(),
            Self::Factory(factory) => factory().downcast().ok(),
            Self::Map(_) => None,
        }
    }

    /// A named datasource of a map.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self {
            Self::Map(map) => map.get(name),
            _ => None,
        }
    }

    pub fn factory(&self) -> Option<&DataSourceFactory> {
        match self {
            Self::Factory(factory) => Some(factory),
            _ => None,
        }
    }
}

impl Default for ResolvedDataSources {
    fn default() -> Self {
        Self::Map(DataSourceMap::new())
    }
}

impl fmt::Debug for ResolvedDataSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
        }
    }
}

/// Zero-argument access to the resolved datasources, called by the schema
/// builder.
#[derive(Clone)]
pub struct DataSourceAccessor(Arc<dyn Fn() -> Arc<ResolvedDataSources> + Send + Sync>);

impl DataSourceAccessor {
    pub fn new(f: impl Fn() -> Arc<ResolvedDataSources> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn get(&self) -> Arc<ResolvedDataSources> {
        (self.0)()
    }
}

impl From<ResolvedDataSources> for DataSourceAccessor {
    fn from(resolved: ResolvedDataSources) -> Self {
        let resolved = Arc::new(resolved);
        Self::new(move || resolved.clone())
    }
}

impl fmt::Debug for DataSourceAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DataSourceAccessor").finish_non_exhaustive()
    }
}

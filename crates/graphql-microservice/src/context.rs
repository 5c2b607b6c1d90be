//! Resolver context and the logger injection policy.

use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

use http::{HeaderMap, Method, Uri};

use crate::logger::{is_logger, ContextLogger, LoggerCandidate};

/// The context key the logger is injected under.
pub const LOGGER_KEY: &str = "logger";

/// One entry of a [`ContextMap`].
#[derive(Clone)]
pub enum ContextValue {
    Json(serde_json::Value),
    Logger(LoggerCandidate),
    Data(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    pub fn data<T: Any + Send + Sync>(value: T) -> Self {
        Self::Data(Arc::new(value))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_logger(&self) -> Option<&LoggerCandidate> {
        match self {
            Self::Logger(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Data(data) => data.clone().downcast().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Logger(candidate) => f.debug_tuple("Logger").field(candidate).finish(),
            Self::Data(_) => f.debug_tuple("Data").finish_non_exhaustive(),
        }
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<LoggerCandidate> for ContextValue {
    fn from(candidate: LoggerCandidate) -> Self {
        Self::Logger(candidate)
    }
}

/// A plain map of context values handed to every resolver.
#[derive(Clone, Debug, Default)]
pub struct ContextMap {
    values: BTreeMap<String, ContextValue>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Option<ContextValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn get_json(&self, key: &str) -> Option<&serde_json::Value> {
        self.get(key).and_then(ContextValue::as_json)
    }

    pub fn get_data<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).and_then(ContextValue::downcast)
    }

    /// The injected logger, if the `logger` entry is a valid one.
    pub fn logger(&self) -> Option<ContextLogger<'_>> {
        self.get(LOGGER_KEY)
            .and_then(ContextValue::as_logger)
            .and_then(LoggerCandidate::as_logger)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Extend<(String, ContextValue)> for ContextMap {
    fn extend<T: IntoIterator<Item = (String, ContextValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}

impl IntoIterator for ContextMap {
    type Item = (String, ContextValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// The HTTP request a context factory is evaluated for.
#[derive(Clone, Debug, Default)]
pub struct IntegrationContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

pub type ContextFactory = Arc<dyn Fn(&IntegrationContext) -> ContextMap + Send + Sync>;

/// Either a static context or a factory evaluated on every request.
#[derive(Clone)]
pub enum ContextSpec {
    Static(ContextMap),
    Factory(ContextFactory),
}

impl ContextSpec {
    pub fn factory(f: impl Fn(&IntegrationContext) -> ContextMap + Send + Sync + 'static) -> Self {
        Self::Factory(Arc::new(f))
    }

    /// The context a single request sees.
    pub fn evaluate(&self, integration: &IntegrationContext) -> ContextMap {
        match self {
            Self::Static(map) => map.clone(),
            Self::Factory(factory) => factory(integration),
        }
    }
}

impl fmt::Debug for ContextSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").finish_non_exhaustive(),
        }
    }
}

impl From<ContextMap> for ContextSpec {
    fn from(map: ContextMap) -> Self {
        Self::Static(map)
    }
}

/// A JSON object becomes a static context; any other JSON value collapses to
/// an empty one.
impl From<serde_json::Value> for ContextSpec {
    fn from(value: serde_json::Value) -> Self {
        let mut map = ContextMap::new();

        if let serde_json::Value::Object(object) = value {
            map.extend(object.into_iter().map(|(key, value)| (key, ContextValue::Json(value))));
        }

        Self::Static(map)
    }
}

/// Merges the logger into the caller's context.
///
/// Returns `None` when the result would be an empty static map: the server
/// then receives no context at all.
pub fn compose_context(context: Option<ContextSpec>, logger: Option<&LoggerCandidate>) -> Option<ContextSpec> {
    let context = context.unwrap_or_else(|| ContextSpec::Static(ContextMap::new()));

    let context = match (context, logger.filter(|logger| is_logger(Some(*logger)))) {
        (ContextSpec::Factory(original), Some(logger)) => {
            let logger = logger.clone();

            // The original factory's own `logger` key wins over the injected one.
            ContextSpec::factory(move |integration| {
                let mut map = ContextMap::new().with(LOGGER_KEY, logger.clone());
                map.extend(original(integration));
                map
            })
        }
        (ContextSpec::Static(mut map), Some(logger)) => {
            let existing = map.get(LOGGER_KEY).and_then(ContextValue::as_logger);

            if !is_logger(existing) {
                map.insert(LOGGER_KEY, logger.clone());
            }

            ContextSpec::Static(map)
        }
        (context, None) => context,
    };

    match context {
        ContextSpec::Static(map) if map.is_empty() => None,
        context => Some(context),
    }
}

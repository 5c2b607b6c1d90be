use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use futures_util::{future::BoxFuture, FutureExt as _};
use serde_json::{Map, Value};

use crate::{
    context::ContextMap,
    datasources::ResolvedDataSources,
    logger::ContextLogger,
};

/// The error a resolver fails with. Anything implementing `Display` converts
/// into it with `?`.
pub type FieldError = async_graphql::Error;

pub type ResolverResult = Result<Value, FieldError>;

/// The field name registering a federation reference resolver on an entity.
pub const RESOLVE_REFERENCE: &str = "__resolveReference";

/// Everything a resolver gets to see for one field.
#[derive(Clone, Debug)]
pub struct ResolveInfo {
    pub(crate) type_name: Arc<str>,
    pub(crate) field_name: Arc<str>,
    pub(crate) parent: Value,
    pub(crate) arguments: Map<String, Value>,
    pub(crate) context: Arc<ContextMap>,
    pub(crate) datasources: Arc<ResolvedDataSources>,
}

impl ResolveInfo {
    pub fn new(type_name: &str, field_name: &str) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            parent: Value::Null,
            arguments: Map::new(),
            context: Default::default(),
            datasources: Default::default(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Value) -> Self {
        self.parent = parent;
        self
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Arc<ContextMap>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_datasources(mut self, datasources: Arc<ResolvedDataSources>) -> Self {
        self.datasources = datasources;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The value the parent field resolved to, `null` on root types.
    pub fn parent(&self) -> &Value {
        &self.parent
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub fn logger(&self) -> Option<ContextLogger<'_>> {
        self.context.logger()
    }

    pub fn datasources(&self) -> &ResolvedDataSources {
        &self.datasources
    }
}

/// Computes the value of one field.
#[derive(Clone)]
pub struct Resolver(Arc<dyn Fn(ResolveInfo) -> BoxFuture<'static, ResolverResult> + Send + Sync>);

impl Resolver {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Arc::new(move |info| f(info).boxed()))
    }

    /// A resolver that does not need to await anything.
    pub fn sync(f: impl Fn(ResolveInfo) -> ResolverResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(move |info| futures_util::future::ready(f(info)).boxed()))
    }

    /// Always resolves to the same value.
    pub fn value(value: Value) -> Self {
        Self::sync(move |_| Ok(value.clone()))
    }

    /// The default resolution: the field of the same name on the parent value.
    pub fn parent_field() -> Self {
        Self::sync(|info| Ok(info.parent.get(info.field_name()).cloned().unwrap_or(Value::Null)))
    }

    pub fn call(&self, info: ResolveInfo) -> BoxFuture<'static, ResolverResult> {
        (self.0)(info)
    }
}

impl From<Value> for Resolver {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolver").finish_non_exhaustive()
    }
}

/// Resolvers by type name, then field name.
#[derive(Clone, Debug, Default)]
pub struct ResolverMap {
    types: BTreeMap<String, BTreeMap<String, Resolver>>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn resolver(mut self, type_name: &str, field_name: &str, resolver: impl Into<Resolver>) -> Self {
        self.insert(type_name, field_name, resolver);
        self
    }

    /// Registers the reference resolver of a federated entity.
    #[must_use]
    pub fn reference_resolver(self, type_name: &str, resolver: impl Into<Resolver>) -> Self {
        self.resolver(type_name, RESOLVE_REFERENCE, resolver)
    }

    pub fn insert(&mut self, type_name: &str, field_name: &str, resolver: impl Into<Resolver>) -> Option<Resolver> {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .insert(field_name.to_string(), resolver.into())
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.types.get(type_name)?.get(field_name)
    }

    /// All `(type, field, resolver)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Resolver)> + '_ {
        self.types.iter().flat_map(|(type_name, fields)| {
            fields
                .iter()
                .map(move |(field_name, resolver)| (type_name.as_str(), field_name.as_str(), resolver))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.types.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn parent_field_reads_the_parent() {
        let info = ResolveInfo::new("User", "name").with_parent(json!({ "name": "Ada", "age": 36 }));

        assert_eq!(Resolver::parent_field().call(info.clone()).await.unwrap(), json!("Ada"));

        let info = ResolveInfo::new("User", "email").with_parent(info.parent().clone());
        assert_eq!(Resolver::parent_field().call(info).await.unwrap(), json!(null));
    }

    #[tokio::test]
    async fn async_resolvers_see_their_arguments() {
        let resolver = Resolver::new(|info: ResolveInfo| async move {
            let id = info.argument("id").and_then(Value::as_str).ok_or("missing id")?;
            Ok(json!({ "id": id }))
        });

        let mut arguments = Map::new();
        arguments.insert("id".into(), json!("1"));

        let value = resolver
            .call(ResolveInfo::new("Query", "user").with_arguments(arguments))
            .await
            .unwrap();
        assert_eq!(value, json!({ "id": "1" }));

        let error = resolver.call(ResolveInfo::new("Query", "user")).await.unwrap_err();
        assert_eq!(error.message, "missing id");
    }

    #[test]
    fn iterates_all_entries() {
        let resolvers = ResolverMap::new()
            .resolver("Query", "me", json!({ "id": "1" }))
            .resolver("Query", "topProducts", json!([]))
            .reference_resolver("User", Resolver::parent_field());

        let entries = resolvers
            .iter()
            .map(|(type_name, field_name, _)| format!("{type_name}.{field_name}"))
            .collect::<Vec<_>>();

        assert_eq!(entries, vec!["Query.me", "Query.topProducts", "User.__resolveReference"]);
        assert!(resolvers.get("User", RESOLVE_REFERENCE).is_some());
        assert!(!resolvers.is_empty());
        assert!(ResolverMap::new().is_empty());
    }
}

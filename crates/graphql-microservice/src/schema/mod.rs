//! Assembly of the federated subgraph schema.
//!
//! The SDL documents and resolver maps of all [`SchemaModule`]s are merged
//! into a [`FederatedSchema`]: a set of type drafts with resolvers attached.
//! Directives are applied to the drafts, and the server turns them into an
//! executable `async-graphql` schema with [`FederatedSchema::finish`].

mod executable;

use std::sync::Arc;

use async_graphql::parser::types::{
    ConstDirective, EnumValueDefinition, FieldDefinition, InputValueDefinition, ServiceDocument, TypeDefinition,
    TypeKind, TypeSystemDefinition,
};
use indexmap::IndexMap;

use crate::{
    datasources::{DataSourceAccessor, ResolvedDataSources},
    resolver::{Resolver, ResolverMap, RESOLVE_REFERENCE},
    Error,
};

pub(crate) use executable::RequestContext;

/// Types defined by async-graphql's federation support.
const FEDERATION_TYPES: &[&str] = &[
    "_Any",
    "_Entity",
    "_Service",
    "_FieldSet",
    "FieldSet",
    "link__Import",
    "link__Purpose",
];

/// One unit of schema: type definitions, their resolvers and the datasources
/// those resolvers see.
#[derive(Debug)]
pub struct SchemaModule {
    pub type_defs: ServiceDocument,
    pub resolvers: ResolverMap,
    pub datasources: DataSourceAccessor,
}

/// Builds a federated schema out of schema modules.
pub trait SchemaBuilder: Send + Sync {
    fn build(&self, modules: Vec<SchemaModule>) -> crate::Result<FederatedSchema>;
}

/// Builds subgraph schemas supporting the Apollo Federation `_service` and
/// `_entities` fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct FederatedSchemaBuilder;

impl SchemaBuilder for FederatedSchemaBuilder {
    fn build(&self, modules: Vec<SchemaModule>) -> crate::Result<FederatedSchema> {
        let mut schema = FederatedSchema::default();

        let modules = modules
            .into_iter()
            .map(|module| {
                let datasources = module.datasources.get();
                (module, datasources)
            })
            .collect::<Vec<_>>();

        for (module, datasources) in &modules {
            schema.add_document(&module.type_defs, datasources)?;
        }

        for (module, datasources) in &modules {
            schema.bind_resolvers(&module.resolvers, datasources)?;
        }

        schema.check_roots()?;

        Ok(schema)
    }
}

#[derive(Clone, Debug, Default)]
struct Roots {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

/// A subgraph schema with its resolvers, not yet executable.
#[derive(Clone, Debug, Default)]
pub struct FederatedSchema {
    roots: Roots,
    pub(crate) types: IndexMap<String, TypeDraft>,
}

impl FederatedSchema {
    pub fn query_type(&self) -> &str {
        self.roots.query.as_deref().unwrap_or("Query")
    }

    pub fn mutation_type(&self) -> Option<&str> {
        match &self.roots.mutation {
            Some(mutation) => Some(mutation),
            None => self.types.contains_key("Mutation").then_some("Mutation"),
        }
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.keys().map(String::as_str)
    }

    /// Types carrying a `@key`.
    pub fn entities(&self) -> impl Iterator<Item = &str> + '_ {
        self.types
            .values()
            .filter(|draft| draft.is_entity())
            .map(|draft| draft.name.as_str())
    }

    #[cfg(test)]
    pub(crate) fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDraft> {
        match &self.types.get(type_name)?.kind {
            DraftKind::Object(object) => object.fields.get(field_name),
            _ => None,
        }
    }

    fn is_root(&self, type_name: &str) -> bool {
        type_name == self.query_type() || Some(type_name) == self.mutation_type()
    }

    fn add_document(&mut self, document: &ServiceDocument, datasources: &Arc<ResolvedDataSources>) -> crate::Result<()> {
        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    let schema = &schema.node;

                    if let Some(query) = &schema.query {
                        self.roots.query = Some(query.node.to_string());
                    }
                    if let Some(mutation) = &schema.mutation {
                        self.roots.mutation = Some(mutation.node.to_string());
                    }
                    if let Some(subscription) = &schema.subscription {
                        self.roots.subscription = Some(subscription.node.to_string());
                    }
                }
                TypeSystemDefinition::Type(definition) => self.add_type(&definition.node, datasources)?,
                // Directive definitions only matter to the directive visitor, which
                // works from the applied directives.
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        Ok(())
    }

    fn add_type(&mut self, definition: &TypeDefinition, datasources: &Arc<ResolvedDataSources>) -> crate::Result<()> {
        let name = definition.name.node.to_string();

        if FEDERATION_TYPES.contains(&name.as_str()) {
            return Ok(());
        }

        let draft = TypeDraft::new(definition, datasources)?;

        match self.types.get_mut(&name) {
            Some(existing) => existing.merge(draft),
            None => {
                self.types.insert(name, draft);
                Ok(())
            }
        }
    }

    fn bind_resolvers(&mut self, resolvers: &ResolverMap, datasources: &Arc<ResolvedDataSources>) -> crate::Result<()> {
        for (type_name, field_name, resolver) in resolvers.iter() {
            let object = match self.types.get_mut(type_name).map(|draft| &mut draft.kind) {
                Some(DraftKind::Object(object)) => object,
                Some(_) => {
                    return Err(Error::SchemaBuild(format!(
                        "{type_name} defined in resolvers, but it is not an object type"
                    )))
                }
                None => {
                    return Err(Error::SchemaBuild(format!(
                        "{type_name} defined in resolvers, but not in schema"
                    )))
                }
            };

            let bound = BoundResolver {
                resolver: resolver.clone(),
                datasources: datasources.clone(),
            };

            if field_name == RESOLVE_REFERENCE {
                object.reference = Some(bound);
                continue;
            }

            let Some(field) = object.fields.get_mut(field_name) else {
                return Err(Error::SchemaBuild(format!(
                    "{type_name}.{field_name} defined in resolvers, but not in schema"
                )));
            };

            field.resolver = Some(bound.resolver);
            field.datasources = bound.datasources;
        }

        Ok(())
    }

    fn check_roots(&self) -> crate::Result<()> {
        if self.roots.subscription.is_some() || self.types.contains_key("Subscription") {
            return Err(Error::SchemaBuild("subscriptions are not supported".into()));
        }

        for root in [Some(self.query_type()), self.mutation_type()].into_iter().flatten() {
            match self.types.get(root).map(|draft| &draft.kind) {
                Some(DraftKind::Object(_)) | None => {}
                Some(_) => return Err(Error::SchemaBuild(format!("root type {root} must be an object type"))),
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct BoundResolver {
    pub(crate) resolver: Resolver,
    pub(crate) datasources: Arc<ResolvedDataSources>,
}

#[derive(Clone, Debug)]
pub(crate) struct TypeDraft {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    /// Every definition of the type was an extension.
    pub(crate) extends: bool,
    pub(crate) directives: Vec<ConstDirective>,
    pub(crate) kind: DraftKind,
}

#[derive(Clone, Debug)]
pub(crate) enum DraftKind {
    Object(ObjectDraft),
    Interface(IndexMap<String, FieldDefinition>),
    Union(Vec<String>),
    Enum(Vec<EnumValueDefinition>),
    Scalar,
    InputObject(Vec<InputValueDefinition>),
}

impl DraftKind {
    fn describe(&self) -> &'static str {
        match self {
            DraftKind::Object(_) => "an object",
            DraftKind::Interface(_) => "an interface",
            DraftKind::Union(_) => "a union",
            DraftKind::Enum(_) => "an enum",
            DraftKind::Scalar => "a scalar",
            DraftKind::InputObject(_) => "an input object",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ObjectDraft {
    pub(crate) implements: Vec<String>,
    pub(crate) fields: IndexMap<String, FieldDraft>,
    pub(crate) reference: Option<BoundResolver>,
}

#[derive(Clone, Debug)]
pub(crate) struct FieldDraft {
    pub(crate) definition: FieldDefinition,
    /// `None` resolves the field from the parent value.
    pub(crate) resolver: Option<Resolver>,
    pub(crate) datasources: Arc<ResolvedDataSources>,
}

fn has_directive(directives: &[ConstDirective], name: &str) -> bool {
    directives.iter().any(|directive| directive.name.node.as_str() == name)
}

fn duplicate(type_name: &str, member: &str) -> Error {
    Error::SchemaBuild(format!("{type_name}.{member} can only be defined once"))
}

impl TypeDraft {
    fn new(definition: &TypeDefinition, datasources: &Arc<ResolvedDataSources>) -> crate::Result<Self> {
        let name = definition.name.node.to_string();
        let directives = definition
            .directives
            .iter()
            .map(|directive| directive.node.clone())
            .collect::<Vec<_>>();

        let kind = match &definition.kind {
            TypeKind::Scalar => DraftKind::Scalar,
            TypeKind::Object(object) => {
                let mut fields = IndexMap::new();

                for field in &object.fields {
                    let field_name = field.node.name.node.to_string();
                    let draft = FieldDraft {
                        definition: field.node.clone(),
                        resolver: None,
                        datasources: datasources.clone(),
                    };

                    if fields.insert(field_name.clone(), draft).is_some() {
                        return Err(duplicate(&name, &field_name));
                    }
                }

                DraftKind::Object(ObjectDraft {
                    implements: object.implements.iter().map(|name| name.node.to_string()).collect(),
                    fields,
                    reference: None,
                })
            }
            TypeKind::Interface(interface) => DraftKind::Interface(
                interface
                    .fields
                    .iter()
                    .map(|field| (field.node.name.node.to_string(), field.node.clone()))
                    .collect(),
            ),
            TypeKind::Union(union) => {
                DraftKind::Union(union.members.iter().map(|member| member.node.to_string()).collect())
            }
            TypeKind::Enum(enum_type) => {
                DraftKind::Enum(enum_type.values.iter().map(|value| value.node.clone()).collect())
            }
            TypeKind::InputObject(input) => {
                DraftKind::InputObject(input.fields.iter().map(|field| field.node.clone()).collect())
            }
        };

        Ok(Self {
            extends: definition.extend || has_directive(&directives, "extends"),
            description: definition.description.as_ref().map(|description| description.node.clone()),
            name,
            directives,
            kind,
        })
    }

    /// Adds the members of another definition of the same type, coming from an
    /// `extend` or from another module.
    fn merge(&mut self, other: TypeDraft) -> crate::Result<()> {
        self.extends &= other.extends;
        self.description = self.description.take().or(other.description);
        self.directives.extend(other.directives);

        match (&mut self.kind, other.kind) {
            (DraftKind::Object(object), DraftKind::Object(other)) => {
                object.implements.extend(other.implements);

                for (name, field) in other.fields {
                    if object.fields.insert(name.clone(), field).is_some() {
                        return Err(duplicate(&self.name, &name));
                    }
                }
            }
            (DraftKind::Interface(fields), DraftKind::Interface(other)) => {
                for (name, field) in other {
                    if fields.insert(name.clone(), field).is_some() {
                        return Err(duplicate(&self.name, &name));
                    }
                }
            }
            (DraftKind::Union(members), DraftKind::Union(other)) => members.extend(other),
            (DraftKind::Enum(values), DraftKind::Enum(other)) => values.extend(other),
            (DraftKind::InputObject(fields), DraftKind::InputObject(other)) => fields.extend(other),
            (DraftKind::Scalar, DraftKind::Scalar) => {}
            (kind, other) => {
                return Err(Error::SchemaBuild(format!(
                    "{} is defined both as {} and {}",
                    self.name,
                    kind.describe(),
                    other.describe()
                )))
            }
        }

        Ok(())
    }

    pub(crate) fn is_entity(&self) -> bool {
        matches!(self.kind, DraftKind::Object(_)) && has_directive(&self.directives, "key")
    }
}

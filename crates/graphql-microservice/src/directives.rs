//! Custom schema directives.
//!
//! A [`SchemaDirective`] is registered under the directive name used in the
//! SDL. [`visit_schema_directives`] calls it once for every object type and
//! every field carrying that directive, giving it the chance to wrap the
//! resolvers.

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_graphql::parser::types::ConstDirective;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    resolver::Resolver,
    schema::{DraftKind, FederatedSchema, FieldDraft},
};

/// The implementation of one custom directive.
pub trait SchemaDirective: Send + Sync {
    /// Called for an object type annotated with the directive.
    fn visit_object(&self, _object: &mut ObjectVisit<'_>) {}

    /// Called for a field annotated with the directive.
    fn visit_field_definition(&self, _field: &mut FieldVisit<'_>) {}
}

/// Directive implementations by directive name.
#[derive(Clone, Default)]
pub struct DirectiveMap {
    directives: BTreeMap<String, Arc<dyn SchemaDirective>>,
}

impl DirectiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, directive: Arc<dyn SchemaDirective>) -> Self {
        self.insert(name, directive);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, directive: Arc<dyn SchemaDirective>) {
        self.directives.insert(name.into(), directive);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SchemaDirective>> {
        self.directives.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.directives.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl fmt::Debug for DirectiveMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.directives.keys()).finish()
    }
}

/// An object type being visited.
pub struct ObjectVisit<'a> {
    type_name: &'a str,
    arguments: &'a Map<String, Value>,
    fields: &'a mut IndexMap<String, FieldDraft>,
}

impl ObjectVisit<'_> {
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    /// The arguments the directive was applied with.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// Replaces the resolver of every field of the type.
    pub fn wrap_resolvers(&mut self, wrap: impl Fn(&str, Resolver) -> Resolver) {
        for (name, field) in self.fields.iter_mut() {
            let inner = field.resolver.take().unwrap_or_else(Resolver::parent_field);
            field.resolver = Some(wrap(name, inner));
        }
    }
}

/// A field being visited.
pub struct FieldVisit<'a> {
    type_name: &'a str,
    arguments: &'a Map<String, Value>,
    field: &'a mut FieldDraft,
}

impl FieldVisit<'_> {
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn field_name(&self) -> &str {
        self.field.definition.name.node.as_str()
    }

    /// The arguments the directive was applied with.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        self.arguments
    }

    /// The explicit resolver, `None` if the field resolves from its parent.
    pub fn resolver(&self) -> Option<&Resolver> {
        self.field.resolver.as_ref()
    }

    pub fn set_resolver(&mut self, resolver: Resolver) {
        self.field.resolver = Some(resolver);
    }

    /// Replaces the resolver with one built around the current one.
    pub fn wrap_resolver(&mut self, wrap: impl FnOnce(Resolver) -> Resolver) {
        let inner = self.field.resolver.take().unwrap_or_else(Resolver::parent_field);
        self.field.resolver = Some(wrap(inner));
    }
}

fn arguments(directive: &ConstDirective) -> Map<String, Value> {
    directive
        .arguments
        .iter()
        .map(|(name, value)| {
            let value = value.node.clone().into_json().unwrap_or_default();
            (name.node.to_string(), value)
        })
        .collect()
}

/// Applies the directives to every annotated object type and field.
pub fn visit_schema_directives(schema: &mut FederatedSchema, directives: &DirectiveMap) {
    if directives.is_empty() {
        return;
    }

    for draft in schema.types.values_mut() {
        let DraftKind::Object(object) = &mut draft.kind else {
            continue;
        };

        for directive in &draft.directives {
            let Some(visitor) = directives.get(directive.name.node.as_str()) else {
                continue;
            };

            let arguments = arguments(directive);

            visitor.visit_object(&mut ObjectVisit {
                type_name: &draft.name,
                arguments: &arguments,
                fields: &mut object.fields,
            });
        }

        for field in object.fields.values_mut() {
            let applied = field
                .definition
                .directives
                .iter()
                .filter_map(|directive| {
                    let visitor = directives.get(directive.node.name.node.as_str())?;
                    Some((visitor.clone(), arguments(&directive.node)))
                })
                .collect::<Vec<_>>();

            for (visitor, arguments) in applied {
                visitor.visit_field_definition(&mut FieldVisit {
                    type_name: &draft.name,
                    arguments: &arguments,
                    field,
                });
            }
        }
    }
}

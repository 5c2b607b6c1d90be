use std::{collections::HashMap, sync::Arc};

use async_graphql::{
    dynamic::{
        Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface, InterfaceField, Object,
        ResolverContext, Scalar, Schema, Type as DynamicType, TypeRef, Union,
    },
    parser::types::{BaseType, ConstDirective, FieldDefinition, InputValueDefinition, Type},
    Context, Name,
};
use serde_json::{Map, Value};

use super::{BoundResolver, DraftKind, FederatedSchema, FieldDraft, TypeDraft};
use crate::{
    config::ServerConfig,
    context::ContextMap,
    datasources::ResolvedDataSources,
    resolver::{ResolveInfo, Resolver, RESOLVE_REFERENCE},
};

/// The context of one request, stored in the request data.
#[derive(Clone, Debug, Default)]
pub(crate) struct RequestContext(pub(crate) Arc<ContextMap>);

/// How a resolved JSON value becomes a GraphQL value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Object,
    /// Interfaces and unions, the concrete type comes from `__typename`.
    Abstract,
    Enum,
    Scalar,
}

type Outputs = Arc<HashMap<String, Output>>;

impl FederatedSchema {
    /// Turns the drafts into an executable federated schema.
    pub fn finish(&self, config: &ServerConfig) -> crate::Result<Schema> {
        let outputs: Outputs = Arc::new(
            self.types
                .values()
                .map(|draft| {
                    let output = match draft.kind {
                        DraftKind::Object(_) => Output::Object,
                        DraftKind::Interface(_) | DraftKind::Union(_) => Output::Abstract,
                        DraftKind::Enum(_) => Output::Enum,
                        DraftKind::Scalar | DraftKind::InputObject(_) => Output::Scalar,
                    };
                    (draft.name.clone(), output)
                })
                .collect(),
        );

        let query = self.query_type();
        let mut builder = Schema::build(query, self.mutation_type(), None);

        if !self.types.contains_key(query) {
            builder = builder.register(Object::new(query));
        }

        for draft in self.types.values() {
            builder = builder.register(draft.executable(self.is_root(&draft.name), &outputs));
        }

        let references: Arc<HashMap<String, BoundResolver>> = Arc::new(
            self.types
                .values()
                .filter_map(|draft| match &draft.kind {
                    DraftKind::Object(object) => Some((draft.name.clone(), object.reference.clone()?)),
                    _ => None,
                })
                .collect(),
        );

        builder = builder
            .enable_federation()
            .entity_resolver(move |ctx| resolve_entities(ctx, references.clone()));

        if let Some(depth) = config.operation_limits.depth {
            builder = builder.limit_depth(depth);
        }

        if let Some(complexity) = config.operation_limits.complexity {
            builder = builder.limit_complexity(complexity);
        }

        if !config.introspection {
            builder = builder.disable_introspection();
        }

        Ok(builder.finish()?)
    }
}

impl TypeDraft {
    fn executable(&self, is_root: bool, outputs: &Outputs) -> DynamicType {
        match &self.kind {
            DraftKind::Object(object) => {
                let mut dynamic = Object::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                for interface in &object.implements {
                    dynamic = dynamic.implement(interface);
                }

                for directive in &self.directives {
                    match directive.name.node.as_str() {
                        "key" => {
                            let Some(fields) = string_argument(directive, "fields") else {
                                continue;
                            };

                            dynamic = match argument(directive, "resolvable") {
                                Some(async_graphql::Value::Boolean(false)) => dynamic.unresolvable(fields),
                                _ => dynamic.key(fields),
                            };
                        }
                        "shareable" => dynamic = dynamic.shareable(),
                        _ => {}
                    }
                }

                // Root types are never extensions of another subgraph's type.
                if self.extends && !is_root {
                    dynamic = dynamic.extends();
                }

                for field in object.fields.values() {
                    dynamic = dynamic.field(executable_field(&self.name, field, outputs));
                }

                dynamic.into()
            }
            DraftKind::Interface(fields) => {
                let mut dynamic = Interface::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                for field in fields.values() {
                    dynamic = dynamic.field(interface_field(field));
                }

                dynamic.into()
            }
            DraftKind::Union(members) => {
                let mut dynamic = Union::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                for member in members {
                    dynamic = dynamic.possible_type(member);
                }

                dynamic.into()
            }
            DraftKind::Enum(values) => {
                let mut dynamic = Enum::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                for value in values {
                    let mut item = EnumItem::new(value.value.node.as_str());

                    if let Some(description) = &value.description {
                        item = item.description(&description.node);
                    }

                    dynamic = dynamic.item(item);
                }

                dynamic.into()
            }
            DraftKind::Scalar => {
                let mut dynamic = Scalar::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                dynamic.into()
            }
            DraftKind::InputObject(fields) => {
                let mut dynamic = InputObject::new(&self.name);

                if let Some(description) = &self.description {
                    dynamic = dynamic.description(description);
                }

                for field in fields {
                    dynamic = dynamic.field(input_value(field));
                }

                dynamic.into()
            }
        }
    }
}

fn executable_field(type_name: &str, field: &FieldDraft, outputs: &Outputs) -> Field {
    let definition = &field.definition;

    let type_name: Arc<str> = type_name.into();
    let field_name: Arc<str> = definition.name.node.as_str().into();
    let output = Arc::new(definition.ty.node.clone());
    let resolver = field.resolver.clone().unwrap_or_else(Resolver::parent_field);
    let datasources = field.datasources.clone();
    let outputs = outputs.clone();
    let nullable = definition.ty.node.nullable;

    let mut dynamic = Field::new(definition.name.node.as_str(), type_ref(&definition.ty.node), move |ctx| {
        let info = resolve_info(&ctx, &type_name, &field_name, &datasources);
        let context = ctx.ctx;
        let resolver = resolver.clone();
        let output = output.clone();
        let outputs = outputs.clone();

        FieldFuture::new(async move {
            let resolved = match info {
                Ok(info) => match resolver.call(info).await {
                    Ok(value) => output_value(value, &output, &outputs),
                    Err(error) => Err(error),
                },
                Err(error) => Err(error),
            };

            match resolved {
                Ok(value) => Ok(Some(value)),
                // A nullable field resolves to null on error, its siblings are kept.
                Err(error) if nullable => {
                    context.add_error(context.set_error_path(error.into_server_error(context.item.pos)));
                    Ok(None)
                }
                Err(error) => Err(error),
            }
        })
    });

    if let Some(description) = &definition.description {
        dynamic = dynamic.description(&description.node);
    }

    for argument in &definition.arguments {
        dynamic = dynamic.argument(input_value(&argument.node));
    }

    for directive in definition.directives.iter().map(|directive| &directive.node) {
        dynamic = match directive.name.node.as_str() {
            "external" => dynamic.external(),
            "shareable" => dynamic.shareable(),
            "requires" => match string_argument(directive, "fields") {
                Some(fields) => dynamic.requires(fields),
                None => dynamic,
            },
            "provides" => match string_argument(directive, "fields") {
                Some(fields) => dynamic.provides(fields),
                None => dynamic,
            },
            "deprecated" => dynamic.deprecation(string_argument(directive, "reason").as_deref()),
            _ => dynamic,
        };
    }

    dynamic
}

fn interface_field(definition: &FieldDefinition) -> InterfaceField {
    let mut field = InterfaceField::new(definition.name.node.as_str(), type_ref(&definition.ty.node));

    if let Some(description) = &definition.description {
        field = field.description(&description.node);
    }

    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }

    field
}

fn input_value(definition: &InputValueDefinition) -> InputValue {
    let mut value = InputValue::new(definition.name.node.as_str(), type_ref(&definition.ty.node));

    if let Some(description) = &definition.description {
        value = value.description(&description.node);
    }

    if let Some(default) = &definition.default_value {
        value = value.default_value(default.node.clone());
    }

    value
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.as_str()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };

    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

fn argument<'a>(directive: &'a ConstDirective, name: &str) -> Option<&'a async_graphql::Value> {
    directive
        .arguments
        .iter()
        .find(|(argument, _)| argument.node.as_str() == name)
        .map(|(_, value)| &value.node)
}

fn string_argument(directive: &ConstDirective, name: &str) -> Option<String> {
    match argument(directive, name)? {
        async_graphql::Value::String(value) => Some(value.clone()),
        _ => None,
    }
}

fn request_context(ctx: &Context<'_>) -> Arc<ContextMap> {
    ctx.data_opt::<RequestContext>()
        .map(|context| context.0.clone())
        .unwrap_or_default()
}

fn resolve_info(
    ctx: &ResolverContext<'_>,
    type_name: &Arc<str>,
    field_name: &Arc<str>,
    datasources: &Arc<ResolvedDataSources>,
) -> async_graphql::Result<ResolveInfo> {
    let mut arguments = Map::new();

    for (name, value) in ctx.args.iter() {
        arguments.insert(name.to_string(), value.as_value().clone().into_json()?);
    }

    Ok(ResolveInfo {
        type_name: type_name.clone(),
        field_name: field_name.clone(),
        parent: ctx.parent_value.downcast_ref::<Value>().cloned().unwrap_or_default(),
        arguments,
        context: request_context(ctx.ctx),
        datasources: datasources.clone(),
    })
}

/// Maps a resolved JSON value onto the declared output type.
fn output_value<'a>(value: Value, ty: &Type, outputs: &HashMap<String, Output>) -> async_graphql::Result<FieldValue<'a>> {
    if value.is_null() {
        return Ok(FieldValue::NULL);
    }

    let name = match &ty.base {
        BaseType::List(inner) => {
            let Value::Array(items) = value else {
                return Err(format!("expected a list of {inner}, got {value}").into());
            };

            let items = items
                .into_iter()
                .map(|item| output_value(item, inner, outputs))
                .collect::<async_graphql::Result<Vec<_>>>()?;

            return Ok(FieldValue::list(items));
        }
        BaseType::Named(name) => name.as_str(),
    };

    match outputs.get(name).copied().unwrap_or(Output::Scalar) {
        Output::Object => Ok(FieldValue::owned_any(value)),
        Output::Abstract => {
            let Some(typename) = value.get("__typename").and_then(Value::as_str).map(str::to_string) else {
                return Err(format!("a value of the abstract type {name} must have a __typename").into());
            };

            Ok(FieldValue::owned_any(value).with_type(typename))
        }
        Output::Enum => match value {
            Value::String(item) => Ok(FieldValue::value(async_graphql::Value::Enum(Name::new(item)))),
            other => Err(format!("expected a {name} value, got {other}").into()),
        },
        Output::Scalar => Ok(FieldValue::value(async_graphql::Value::from_json(value)?)),
    }
}

fn resolve_entities<'a>(ctx: ResolverContext<'a>, references: Arc<HashMap<String, BoundResolver>>) -> FieldFuture<'a> {
    let representations = ctx
        .args
        .try_get("representations")
        .and_then(|representations| representations.list())
        .and_then(|representations| {
            representations
                .iter()
                .map(|representation| Ok(representation.as_value().clone().into_json()?))
                .collect::<async_graphql::Result<Vec<Value>>>()
        });

    let context = request_context(ctx.ctx);

    FieldFuture::new(async move {
        let mut entities = Vec::new();

        for representation in representations? {
            let Some(typename) = representation.get("__typename").and_then(Value::as_str).map(str::to_string) else {
                return Err("representation is missing __typename".into());
            };

            let entity = match references.get(&typename) {
                Some(bound) => {
                    let info = ResolveInfo::new(&typename, RESOLVE_REFERENCE)
                        .with_parent(representation)
                        .with_context(context.clone())
                        .with_datasources(bound.datasources.clone());

                    bound.resolver.call(info).await?
                }
                None => representation,
            };

            entities.push(match entity {
                Value::Null => FieldValue::NULL,
                entity => FieldValue::owned_any(entity).with_type(typename),
            });
        }

        Ok(Some(FieldValue::list(entities)))
    })
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use graphql_microservice::{
    microservice, microservice_with_directives, DataSources, DirectiveMap, Error, FieldVisit, Options, Resolver,
    ResolverMap, SchemaDirective,
};
use serde_json::{json, Value};

use super::{local_config, post, start};

const SDL: &str = r#"
    directive @upper on FIELD_DEFINITION

    type Query {
        hello: String @upper
        name: String @upper
        plain: String
    }
"#;

#[derive(Default)]
struct Upper {
    visits: AtomicUsize,
}

impl SchemaDirective for Upper {
    fn visit_field_definition(&self, field: &mut FieldVisit<'_>) {
        self.visits.fetch_add(1, Ordering::SeqCst);

        field.wrap_resolver(|inner| {
            Resolver::new(move |info| {
                let inner = inner.clone();

                async move {
                    let value = inner.call(info).await?;
                    Ok(match value {
                        Value::String(value) => Value::String(value.to_uppercase()),
                        other => other,
                    })
                }
            })
        });
    }
}

fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .resolver("Query", "hello", json!("hello"))
        .resolver("Query", "name", json!("ada"))
        .resolver("Query", "plain", json!("plain"))
}

#[tokio::test]
async fn directives_in_the_config_bag_are_applied_once() {
    let upper = Arc::new(Upper::default());
    let directives = DirectiveMap::new().with("upper", upper.clone());

    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new()
            .with_schema_directives(directives.clone())
            .with_config(local_config().with_schema_directives(directives)),
    )
    .unwrap();

    assert_eq!(upper.visits.load(Ordering::SeqCst), 2);

    let url = start(&service).await;
    let response = post(&url, "{ hello name plain }", &[]).await;

    assert_eq!(
        response,
        json!({ "data": { "hello": "HELLO", "name": "ADA", "plain": "plain" } })
    );

    service.stop().await.unwrap();
}

#[tokio::test]
async fn positional_directives() {
    let upper = Arc::new(Upper::default());

    let service = microservice_with_directives(
        SDL,
        resolvers(),
        DataSources::none(),
        DirectiveMap::new().with("upper", upper.clone()),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    assert_eq!(upper.visits.load(Ordering::SeqCst), 2);

    let response = service
        .server()
        .execute(&Default::default(), "{ hello }")
        .await
        .data
        .into_json()
        .unwrap();

    assert_eq!(response, json!({ "hello": "HELLO" }));
}

#[test]
fn directives_are_not_merged_from_two_slots() {
    let upper = Arc::new(Upper::default());
    let directives = DirectiveMap::new().with("upper", upper.clone());

    let error = microservice_with_directives(
        SDL,
        resolvers(),
        DataSources::none(),
        directives.clone(),
        Options::new().with_schema_directives(directives),
    )
    .unwrap_err();

    assert!(matches!(error, Error::InvalidDirectives(_)), "{error}");
    assert_eq!(upper.visits.load(Ordering::SeqCst), 0);
}

use graphql_microservice::{gql, microservice, DataSources, Options, ResolveInfo, Resolver, ResolverMap};
use serde_json::json;

use super::{local_config, post, start};

const REVIEWS: &str = r#"
    type Review @key(fields: "id") {
        id: ID!
        body: String
        author: User @provides(fields: "username")
        product: Product
    }

    extend type User @key(fields: "id") {
        id: ID! @external
        username: String @external
        reviews: [Review]
    }

    extend type Product @key(fields: "upc") {
        upc: String! @external
        reviews: [Review]
    }

    extend type Query {
        topReviews: [Review]
    }
"#;

fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .resolver(
            "Query",
            "topReviews",
            json!([{ "id": "1", "body": "Love it!", "author": { "id": "1", "username": "@ada" } }]),
        )
        .reference_resolver(
            "Review",
            Resolver::sync(|info: ResolveInfo| {
                let id = info.parent()["id"].as_str().unwrap_or_default().to_string();
                Ok(json!({ "id": id, "body": format!("review {id}") }))
            }),
        )
        .resolver(
            "User",
            "reviews",
            Resolver::sync(|info: ResolveInfo| {
                let id = info.parent()["id"].clone();
                Ok(json!([{ "id": "7", "body": format!("by {}", id.as_str().unwrap_or_default()) }]))
            }),
        )
}

#[tokio::test]
async fn service_sdl() {
    let service = microservice(
        gql(REVIEWS).unwrap(),
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    let response = post(&url, "{ _service { sdl } }", &[]).await;
    let sdl = response["data"]["_service"]["sdl"].as_str().unwrap_or_default();

    assert!(sdl.contains(r#"type Review @key(fields: "id")"#), "{sdl}");
    assert!(sdl.contains("extend type User"), "{sdl}");
    assert!(sdl.contains("extend type Product"), "{sdl}");
    assert!(sdl.contains(r#"@provides(fields: "username")"#), "{sdl}");
    assert!(sdl.contains("topReviews: [Review]"), "{sdl}");

    service.stop().await.unwrap();
}

#[tokio::test]
async fn entities() {
    let service = microservice(
        REVIEWS,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;

    let response = post(
        &url,
        r#"
        {
            _entities(representations: [
                { __typename: "User", id: "1" },
                { __typename: "Review", id: "3" },
                { __typename: "Product", upc: "top-1" }
            ]) {
                __typename
                ... on User { reviews { body } }
                ... on Review { body }
                ... on Product { upc }
            }
        }
        "#,
        &[],
    )
    .await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "_entities": [
          {
            "__typename": "User",
            "reviews": [
              {
                "body": "by 1"
              }
            ]
          },
          {
            "__typename": "Review",
            "body": "review 3"
          },
          {
            "__typename": "Product",
            "upc": "top-1"
          }
        ]
      }
    }
    "###);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn root_fields_next_to_federation_fields() {
    let service = microservice(
        REVIEWS,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    let response = post(&url, "{ topReviews { body author { username } } }", &[]).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "topReviews": [
          {
            "body": "Love it!",
            "author": {
              "username": "@ada"
            }
          }
        ]
      }
    }
    "###);

    service.stop().await.unwrap();
}

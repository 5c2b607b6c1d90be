use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use graphql_microservice::{
    microservice, ContextMap, ContextSpec, DataSourceMap, DataSources, Error, LoggerCandidate, Options, ResolveInfo,
    Resolver, ResolverMap, HEALTH_CHECK_PATH,
};
use serde_json::{json, Value};

use super::{local_config, post, start};

const SDL: &str = r#"
    type Query {
        me: User
        users(first: Int): [User!]!
        whoami: String
        visits: Int
    }

    type User {
        id: ID!
        name: String
        friends: [User!]
    }
"#;

fn users() -> Value {
    json!([
        { "id": "1", "name": "Ada", "friends": [{ "id": "2", "name": "Grace" }] },
        { "id": "2", "name": "Grace" },
        { "id": "3", "name": "Alan" }
    ])
}

fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .resolver("Query", "me", users()[0].clone())
        .resolver(
            "Query",
            "users",
            Resolver::sync(|info: ResolveInfo| {
                let first = info.argument("first").and_then(Value::as_u64).unwrap_or(u64::MAX);
                let users = users().as_array().cloned().unwrap_or_default();

                Ok(users.into_iter().take(first as usize).collect())
            }),
        )
        .resolver(
            "Query",
            "whoami",
            Resolver::sync(|info: ResolveInfo| {
                if let Some(logger) = info.logger() {
                    logger.info("whoami called");
                }

                Ok(info.context().get_json("user").cloned().unwrap_or(Value::Null))
            }),
        )
}

#[tokio::test]
async fn queries_resolve_over_http() {
    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    let response = post(&url, "{ me { name friends { name } } users(first: 2) { id } }", &[]).await;

    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "me": {
          "name": "Ada",
          "friends": [
            {
              "name": "Grace"
            }
          ]
        },
        "users": [
          {
            "id": "1"
          },
          {
            "id": "2"
          }
        ]
      }
    }
    "###);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn context_factory_sees_request_headers() {
    let context = ContextSpec::factory(|integration| {
        let user = integration
            .headers
            .get("x-user")
            .and_then(|value| value.to_str().ok())
            .map(|value| json!(value))
            .unwrap_or(Value::Null);

        ContextMap::new().with("user", user)
    });

    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new().with_context(context).with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;

    let response = post(&url, "{ whoami }", &[("x-user", "ada")]).await;
    assert_eq!(response, json!({ "data": { "whoami": "ada" } }));

    let response = post(&url, "{ whoami }", &[]).await;
    assert_eq!(response, json!({ "data": { "whoami": null } }));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn injected_logger_reaches_resolvers() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let lines = lines.clone();
        move |message: &str| lines.lock().unwrap().push(message.to_string())
    };

    let logger = LoggerCandidate::new()
        .with_debug(|_| ())
        .with_info(record)
        .with_warn(|_| ())
        .with_error(|_| ());

    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new()
            .with_logger(logger)
            .with_context(ContextMap::new().with("user", json!("grace")))
            .with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    let response = post(&url, "{ whoami }", &[]).await;

    assert_eq!(response, json!({ "data": { "whoami": "grace" } }));
    assert_eq!(*lines.lock().unwrap(), vec!["whoami called"]);

    service.stop().await.unwrap();
}

static API_INSTANCES: AtomicUsize = AtomicUsize::new(0);

struct VisitsApi {
    visits: AtomicUsize,
}

impl Default for VisitsApi {
    fn default() -> Self {
        API_INSTANCES.fetch_add(1, Ordering::SeqCst);

        Self {
            visits: AtomicUsize::new(0),
        }
    }
}

#[tokio::test]
async fn constructible_datasources_are_shared_across_requests() {
    let resolvers = ResolverMap::new().resolver(
        "Query",
        "visits",
        Resolver::sync(|info: ResolveInfo| {
            let api = info.datasources().instance::<VisitsApi>().ok_or("no api")?;
            Ok(json!(api.visits.fetch_add(1, Ordering::SeqCst) + 1))
        }),
    );

    let service = microservice(
        SDL,
        resolvers,
        DataSources::constructible::<VisitsApi>(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;

    for expected in 1..=3 {
        let response = post(&url, "{ visits }", &[]).await;
        assert_eq!(response, json!({ "data": { "visits": expected } }));
    }

    assert_eq!(API_INSTANCES.load(Ordering::SeqCst), 1);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn named_datasources() {
    let resolvers = ResolverMap::new().resolver(
        "Query",
        "whoami",
        Resolver::sync(|info: ResolveInfo| {
            let name = info.datasources().get::<String>("profile").ok_or("no profile")?;
            Ok(json!(name.as_str()))
        }),
    );

    let service = microservice(
        SDL,
        resolvers,
        DataSourceMap::new().with("profile", String::from("ada")),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    let response = post(&url, "{ whoami }", &[]).await;

    assert_eq!(response, json!({ "data": { "whoami": "ada" } }));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn health_check() {
    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let result = service.start(None).await.unwrap();
    assert!(result.health_check_url.ends_with(HEALTH_CHECK_PATH));
    assert_eq!(
        result.health_check_url,
        format!("{}.well-known/apollo/server-health", result.url)
    );

    let response = reqwest::get(format!("http://127.0.0.1:{}{HEALTH_CHECK_PATH}", result.address.port()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "status": "pass" }));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn failing_health_check() {
    let config = local_config().with_health_check(|| async { Err(anyhow::anyhow!("database is gone")) });

    let service = microservice(SDL, resolvers(), DataSources::none(), Options::new().with_config(config)).unwrap();

    let result = service.start(None).await.unwrap();
    let response = reqwest::get(format!("http://127.0.0.1:{}{HEALTH_CHECK_PATH}", result.address.port()))
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "status": "fail" }));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn listen_failures_propagate() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let error = service.start(Some(port)).await.unwrap_err();
    assert!(matches!(error, Error::ListenFailure(_)), "{error}");
}

#[tokio::test]
async fn stopped_servers_refuse_connections() {
    let service = microservice(
        SDL,
        resolvers(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let url = start(&service).await;
    service.stop().await.unwrap();

    assert!(reqwest::Client::new().post(&url).send().await.is_err());
}

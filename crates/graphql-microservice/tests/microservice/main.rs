mod directives;
mod federation;
mod logging;
mod server;

use std::net::{IpAddr, Ipv4Addr};

use graphql_microservice::{GraphQlServer, ListenResult, Microservice, ServerConfig};
use serde_json::{json, Value};

/// Binds to the loopback interface only.
fn local_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        ..Default::default()
    }
}

fn endpoint(result: &ListenResult) -> String {
    format!("http://127.0.0.1:{}/", result.address.port())
}

async fn post(url: &str, query: &str, headers: &[(&str, &str)]) -> Value {
    let mut request = reqwest::Client::new().post(url).json(&json!({ "query": query }));

    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    request.send().await.unwrap().json().await.unwrap()
}

/// Starts the service on an ephemeral port and returns its GraphQL endpoint.
async fn start(service: &Microservice<GraphQlServer>) -> String {
    endpoint(&service.start(None).await.unwrap())
}

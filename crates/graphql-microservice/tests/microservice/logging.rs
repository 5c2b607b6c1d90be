use std::{
    io,
    sync::{Arc, Mutex},
};

use graphql_microservice::{microservice, DataSources, Options, ResolverMap};
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

use super::local_config;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(|line| line.trim().to_string())
            .collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn start_logs_the_endpoint_and_the_health_check() {
    let capture = Capture::default();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("graphql_microservice=info"))
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish();

    let _guard = tracing::subscriber::set_default(subscriber);

    let service = microservice(
        "type Query { hello: String }",
        ResolverMap::new(),
        DataSources::none(),
        Options::new().with_config(local_config()),
    )
    .unwrap();

    let result = service.start(None).await.unwrap();
    let port = result.address.port();

    let lines = capture.lines();

    assert_eq!(
        lines,
        vec![
            format!("INFO Server ready at http://localhost:{port}/"),
            format!("INFO Try your health check at: http://localhost:{port}/.well-known/apollo/server-health"),
        ]
    );

    service.stop().await.unwrap();
}

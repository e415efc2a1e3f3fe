//! Posts client against the public JSONPlaceholder API.
//!
//! Run with: cargo run --example posts
//!
//! Set `RUST_LOG=debug` to see breaker and transport logs.

use serde::{Deserialize, Serialize};
use service_transport::{
    CircuitBreakerConfig, HttpTransport, JsonSerializer, NetworkFaultKind, RequestArguments,
    ServiceError, ServiceTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(rename = "userId")]
    user_id: u64,
    title: String,
    body: String,
}

impl Post {
    fn new(user_id: u64, title: &str, body: &str) -> Self {
        Self {
            id: None,
            user_id,
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// Explains a failed call, recovering the network fault from the chain.
fn describe(err: &ServiceError) -> String {
    match err.network_fault() {
        Some(NetworkFaultKind::NotFound) => format!("{err} (resource does not exist)"),
        Some(NetworkFaultKind::Forbidden) => format!("{err} (access denied)"),
        Some(NetworkFaultKind::TransportUnavailable) => format!("{err} (try again later)"),
        None if err.is_circuit_open() => format!("{err} (circuit open, call skipped)"),
        None => err.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let network = HttpTransport::builder()
        .base_url("https://jsonplaceholder.typicode.com")
        .timeout(Duration::from_secs(5))
        .trace_id("posts-demo")
        .build()?;

    let breaker = Arc::new(
        CircuitBreakerConfig::builder()
            .name("jsonplaceholder")
            .max_failures(1)
            .retry_timeout(Duration::from_secs(1))
            .on_state_transition(|key, from, to| println!("breaker: {key} {from} -> {to}"))
            .build(),
    );

    let posts = ServiceTransport::builder(network)
        .circuit_breaker(Arc::clone(&breaker))
        .serializer(JsonSerializer::<Post>::new())
        .build();

    let post = posts.retrieve("/posts/1", None).await?;
    println!("retrieved: {post:?}");

    let created = posts
        .create("/posts", None, Some(&Post::new(1, "hello", "first post")))
        .await?;
    println!("created: {created:?}");

    let mut changed = post.clone();
    changed.title = "updated title".to_string();
    let updated = posts.update("/posts/1", None, Some(&changed)).await?;
    println!("updated: {updated:?}");

    // Delete answers with an empty JSON object, not a post.
    let untyped = ServiceTransport::builder(posts.transport())
        .circuit_breaker(Arc::clone(&breaker))
        .serializer(JsonSerializer::<serde_json::Value>::new())
        .build();
    untyped.delete("/posts/1", None).await?;
    println!("deleted /posts/1");

    let listing = ServiceTransport::builder(posts.transport())
        .circuit_breaker(Arc::clone(&breaker))
        .serializer(JsonSerializer::<Vec<Post>>::new())
        .build();
    let args = RequestArguments::new().with("userId", 1);
    let by_user = listing.retrieve("/posts", Some(&args)).await?;
    println!("user 1 wrote {} posts", by_user.len());

    match posts.retrieve("/posts/100000", None).await {
        Ok(post) => println!("unexpectedly found {post:?}"),
        Err(err) => println!("lookup failed: {}", describe(&err)),
    }

    if let Some(last) = posts.transport().last_request() {
        println!("last request: {} {}", last.method, last.url);
    }

    Ok(())
}

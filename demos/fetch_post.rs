//! A view-like consumer that renders by status while a simulated fetch runs.
//!
//! Run with `RUST_LOG=async_state=trace` to see every dispatch.

use async_state::builder::activate;
use async_state::core::{AsyncState, Update};
use async_state::effects::Operation;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Post {
    title: String,
    body: String,
}

#[derive(Clone, Debug, Error)]
#[error("Failed to fetch post: #{0}.")]
struct FetchError(u32);

async fn fetch_post(id: u32) -> Result<Post, FetchError> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if id % 2 == 0 {
        return Err(FetchError(id));
    }
    Ok(Post {
        title: format!("Post #{id}"),
        body: "Lorem ipsum dolor sit amet.".to_string(),
    })
}

fn render(state: &AsyncState<Post, FetchError>) {
    if state.is_idle() || state.is_loading() {
        println!("loading");
    } else if state.is_error() {
        if let Some(error) = &state.error {
            println!("error: {error}");
        }
    } else if let Some(post) = &state.data {
        println!("{}\n  {}", post.title, post.body);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (machine, view) = activate::<Post, FetchError>(Update::new());
    machine.subscribe(render);
    render(&machine.state());

    for id in [1, 2] {
        let outcome = machine
            .run(Operation::deferred(move || fetch_post(id)))
            .await;
        println!("run({id}) returned {outcome:?}");
    }

    // Tear the view down while a fetch is still in flight.
    let pending = tokio::spawn({
        let machine = machine.clone();
        async move { machine.run(fetch_post(3)).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(view);

    let late = pending.await;
    println!("late result {late:?} was not applied; status stays {}", machine.status());

    machine.reset();
    println!("reset after teardown is ignored: {}", machine.status());
}

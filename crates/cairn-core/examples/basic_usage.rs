//! Basic usage example - persist a couple of records and watch them live

use cairn_registry::{Registry, Result, SqliteBackend, StreamEvent};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<()> {
    // Get path from args or use a file in the current directory
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./cairn-example.sqlite".to_string());

    println!("Opening registry backend at: {path}");
    let backend = Arc::new(SqliteBackend::open(&path)?);
    let registry = Registry::new(backend);

    // Pick up anything persisted by a previous run
    registry.load()?;

    let stream = registry.get_data("about-page")?;
    let _sub = stream.subscribe(|event| match event {
        StreamEvent::Value(value) => println!("about-page -> {value}"),
        StreamEvent::Completed => println!("about-page stream completed"),
    });

    registry.set_data("about-page", &json!({"headline": "About Us"}))?;
    registry.set_data("team", &json!([{"name": "Ada"}, {"name": "Grace"}]))?;

    let state = registry.state();
    println!("full state: {}", state.current());

    Ok(())
}

//! Cascading Deactivation Demo
//!
//! This example demonstrates:
//! - Creating flags with dependencies
//! - Cycle rejection on dependency add and on create
//! - Toggle-off cascading to every dependent
//! - Toggle-on refusal while a dependency is off
//! - Reading the audit log
//!
//! ## Scenario
//! `checkout` depends on `payments`, which depends on `auth`. Turning `auth`
//! off takes the other two down with it. `checkout` cannot come back until
//! `payments` does.
//!
//! ## Run with
//! ```bash
//! cargo run --example cascade_demo
//!
//! # Against an in-memory SQLite database, with debug logs
//! RUST_LOG=flaggraph=debug cargo run --example cascade_demo -- --sqlite
//! ```

use flaggraph::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let use_sqlite = std::env::args().any(|arg| arg == "--sqlite");
    let store: Box<dyn FlagStore> = if use_sqlite {
        Box::new(SqliteFlagStore::in_memory().await?)
    } else {
        Box::new(InMemoryFlagStore::new())
    };
    let engine = FlagEngine::open(Arc::new(store)).await?;

    let auth = engine.create_flag(NewFlag::new("auth"), "demo").await?;
    engine
        .create_flag(NewFlag::new("payments").depends_on("auth"), "demo")
        .await?;
    let checkout = engine
        .create_flag(NewFlag::new("checkout").depends_on("payments"), "demo")
        .await?;

    if let Err(e) = engine.add_dependency("auth", "checkout").await {
        warn!("auth -> checkout refused: {}", e);
    }
    if let Err(e) = engine
        .create_flag(NewFlag::new("checkout").depends_on("payments"), "demo")
        .await
    {
        warn!("second checkout refused: {}", e);
    }

    let outcome = engine.toggle_flag(auth.id(), "demo").await?;
    info!(
        "{} (cascaded to {} flags: {})",
        outcome.message(),
        outcome.cascaded_count(),
        outcome.cascaded.join(", ")
    );

    if let Err(e) = engine.toggle_flag(checkout.id(), "demo").await {
        warn!("checkout stays off: {}", e);
    }

    println!("\nFlags:");
    for view in engine.list_flags().await {
        println!(
            "  {:<10} {:<8} depends on [{}]",
            view.name,
            FlagState::from(view.active),
            view.dependencies.join(", ")
        );
    }

    println!("\nAudit log:");
    for entry in engine.list_audit_log().await? {
        println!(
            "  #{:<3} {:<24} {:<32} by {}",
            entry.id(),
            entry.to_string(),
            entry.reason(),
            entry.actor()
        );
    }

    engine.store().close().await?;
    Ok(())
}

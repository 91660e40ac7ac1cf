//! Spellbind Engine - dry-run entry point.
//!
//! Loads a scenario (an actor, its items and effects, and the actor schema),
//! runs the derived-data pass and prints the resulting overrides as JSON.
//!
//! ```text
//! spellbind-engine scenario.json
//! SPELLBIND_SCENARIO=scenario.json SPELLBIND_RULES=rules.json spellbind-engine
//! ```

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use spellbind_domain::{ActiveEffect, ActorDocument, DocumentSchema, ItemDocument, RulesConfig};
use spellbind_engine::infrastructure::{
    memory_store::MemoryDocumentStore,
    session::{SessionAuthority, TracingNotifier},
};
use spellbind_engine::App;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Input of a dry run.
#[derive(Debug, Deserialize)]
struct Scenario {
    actor: ActorDocument,
    #[serde(default)]
    items: Vec<ItemDocument>,
    #[serde(default)]
    effects: Vec<ActiveEffect>,
    #[serde(default)]
    schema: DocumentSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spellbind_engine=debug,spellbind_domain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match std::env::var("SPELLBIND_RULES") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading rules configuration");
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading rules configuration {}", path))?;
            RulesConfig::from_json_str(&json)?
        }
        Err(_) => RulesConfig::default(),
    };
    let scenario_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SPELLBIND_SCENARIO").ok())
        .context("usage: spellbind-engine <scenario.json> (or set SPELLBIND_SCENARIO)")?;

    let json = std::fs::read_to_string(&scenario_path)
        .with_context(|| format!("reading scenario {}", scenario_path))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario {}", scenario_path))?;
    tracing::info!(
        actor = %scenario.actor.name,
        items = scenario.items.len(),
        effects = scenario.effects.len(),
        "Running derived-data pass"
    );

    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(scenario.actor.clone());
    for item in &scenario.items {
        store.insert(item.clone());
    }
    for effect in &scenario.effects {
        store.insert(effect.clone());
    }
    let app = App::new(
        store,
        Arc::new(SessionAuthority::new(false)),
        Arc::new(TracingNotifier),
        config,
    );

    let derived = app.use_cases.derived.run(
        &scenario.actor,
        &scenario.items,
        scenario.effects,
        &scenario.schema,
    );
    for effect in derived.effects.iter().filter(|effect| effect.suppressed) {
        tracing::info!(effect = %effect.name, "Suppressed");
    }
    println!("{}", serde_json::to_string_pretty(&derived.overrides)?);

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

#[path = "chatloop-server/args.rs"]
mod args;
#[path = "chatloop-server/builtin.rs"]
mod builtin;
#[path = "chatloop-server/logging.rs"]
mod logging;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use chatloop::api::Server;
use chatloop::cache::InMemoryConversationStore;
use chatloop::client::OpenAIClient;
use chatloop::config::load_config;
use chatloop::orchestrator::{ChatService, Orchestrator};
use chatloop::tools::ToolRegistry;

use args::ServerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    let loaded = load_config(args.config.clone()).context("loading configuration")?;
    let mut config = loaded.config;
    args.apply(&mut config);

    logging::init_logging(&config.logging)?;
    if loaded.config_exists {
        log::info!("loaded configuration from {}", loaded.path.display());
    } else {
        log::info!(
            "no configuration at {}, using defaults",
            loaded.path.display()
        );
    }

    let provider = OpenAIClient::new(&config.provider).context("creating provider client")?;
    log::info!(
        "provider {} with model {}",
        provider.base_url(),
        config.provider.model
    );

    let mut tools = ToolRegistry::new();
    for definition in builtin::builtin_tools() {
        tools.register(definition)?;
    }
    log::info!("tools: {}", tools.tool_names().join(", "));

    let orchestrator = Orchestrator::new(
        Arc::new(provider),
        Arc::new(tools),
        config.orchestrator.clone(),
    );
    let service = ChatService::new(orchestrator, Arc::new(InMemoryConversationStore::new()));

    Server::new(service)
        .with_auth_key(config.server.auth_key.clone())
        .run(&config.server.bind)
        .await?;
    Ok(())
}

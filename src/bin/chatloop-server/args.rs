use clap::Parser;
use std::path::PathBuf;

use chatloop::config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "chatloop-server",
    about = "Streams chat completions with tool calling over Server-Sent Events"
)]
pub struct ServerArgs {
    /// Config file, defaults to <config dir>/chatloop/config.toml
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Address to listen on, overrides `server.bind`
    #[arg(long)]
    pub bind: Option<String>,
    /// Model to use, overrides `provider.model`
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

impl ServerArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
    }
}

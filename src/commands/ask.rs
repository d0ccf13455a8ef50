//! One-shot question: a fresh session, one turn, optional export

use colored::*;
use eyre::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::inference::HfClient;
use crate::session::Session;
use crate::workspace::Workspace;

pub struct AskOptions {
    pub agent: String,
    pub message: Vec<String>,
    pub model: Option<String>,
    pub token: Option<String>,
    pub export: Option<PathBuf>,
}

pub fn run(opts: AskOptions, config: &Config) -> Result<()> {
    let client = HfClient::from_config(&config.inference);
    let workspace = Workspace::from_config(client, config, opts.model.as_deref(), opts.token.as_deref())?;
    let persona = workspace.persona(&opts.agent)?;

    let message = opts.message.join(" ");
    let mut session = Session::new();

    eprintln!(
        "{} {} is thinking... ({})",
        "→".blue(),
        persona.name.cyan(),
        workspace.model().dimmed()
    );

    match workspace.send(&mut session, &persona.key, &message)? {
        Some(exchange) => println!("{}", exchange.response),
        None => eyre::bail!("Message is empty"),
    }

    if let Some(dir) = opts.export {
        let path = session.export_to(&Config::expand_path(&dir))?;
        eprintln!("{} Exported session to {}", "✓".green(), path.display());
    }

    Ok(())
}

//! Interactive chat session
//!
//! Plain lines go to the selected agent; lines starting with `/` are
//! commands. The session lives exactly as long as the loop.

use colored::*;
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use super::agents::{print_card, print_team};
use crate::config::Config;
use crate::inference::{HfClient, TextGenerator};
use crate::persona::Persona;
use crate::session::{Exchange, Session};
use crate::workspace::Workspace;

/// Entries shown by `/recent`
const RECENT_COUNT: usize = 3;

/// Characters of user text shown per `/recent` entry
const RECENT_PREVIEW: usize = 50;

const HELP: &[(&str, &str)] = &[
    ("<text>", "Send a message to the selected agent"),
    ("/agent <key>", "Switch agent (no key: show the current card)"),
    ("/agents", "Team overview"),
    ("/history [n]", "Conversation with the selected agent, newest first"),
    ("/recent", "Latest messages across the crew"),
    ("/clear", "Clear the chat with the selected agent"),
    ("/clear-all", "Clear the whole session"),
    ("/stats", "Session stats"),
    ("/model <id>", "Switch model"),
    ("/models", "List models"),
    ("/token <value>", "Set the API token for this session"),
    ("/prompt <text>", "Show the prompt without sending"),
    ("/note <key> <text>", "Attach a project note to the session"),
    ("/export [dir]", "Write the session as JSON"),
    ("/help", "This help"),
    ("/quit", "Leave"),
];

pub fn run(agent: Option<String>, model: Option<String>, token: Option<String>, config: &Config) -> Result<()> {
    let client = HfClient::from_config(&config.inference);
    let workspace = Workspace::from_config(client, config, model.as_deref(), token.as_deref())?;
    let mut chat = Chat::new(workspace, config, agent.as_deref())?;

    let stdin = io::stdin();
    chat.run(stdin.lock(), &mut io::stdout())
}

enum Step {
    Continue,
    Quit,
}

pub struct Chat<'c, G: TextGenerator> {
    workspace: Workspace<G>,
    session: Session,
    selected: &'static Persona,
    config: &'c Config,
}

impl<'c, G: TextGenerator> Chat<'c, G> {
    pub fn new(workspace: Workspace<G>, config: &'c Config, agent: Option<&str>) -> Result<Self> {
        let selected = match agent {
            Some(key) => workspace.persona(key)?,
            None => workspace.registry().default_persona(),
        };

        Ok(Self {
            workspace,
            session: Session::new(),
            selected,
            config,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selected(&self) -> &Persona {
        self.selected
    }

    /// Read lines until EOF or `/quit`. Invalid UTF-8 is replaced, not fatal.
    pub fn run(&mut self, mut input: impl BufRead, out: &mut impl Write) -> Result<()> {
        self.banner(out)?;
        self.prompt(out)?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if let Step::Quit = self.handle(&line, out)? {
                break;
            }
            self.prompt(out)?;
        }

        writeln!(out)?;
        log::info!("Chat ended after {} exchanges", self.session().conversations().len());
        Ok(())
    }

    fn banner(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", "AI Crew Workspace".bold())?;
        writeln!(out, "{}", "Your team of AI agents at your service".dimmed())?;
        writeln!(out, "{}", divider().dimmed())?;
        print_card(out, self.selected)?;
        writeln!(out, "{} {}", "Model:".bold(), self.workspace.model())?;
        if !self.workspace.has_credential() {
            writeln!(
                out,
                "{} No API token set. Use /token <value> or set {}.",
                "!".yellow(),
                self.config.inference.token_env
            )?;
        }
        writeln!(out, "{}", "Type /help for commands.".dimmed())?;
        Ok(())
    }

    fn prompt(&self, out: &mut impl Write) -> Result<()> {
        write!(out, "{}> ", self.selected.key.cyan())?;
        out.flush()?;
        Ok(())
    }

    fn handle(&mut self, line: &str, out: &mut impl Write) -> Result<Step> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Step::Continue);
        }

        let result = match line.strip_prefix('/') {
            Some(command) => self.command(command, out),
            None => self.send(line, out).map(|_| Step::Continue),
        };

        // A bad command never ends the session
        match result {
            Ok(step) => Ok(step),
            Err(e) => {
                writeln!(out, "{} {}", "✗".red(), e)?;
                Ok(Step::Continue)
            }
        }
    }

    fn command(&mut self, command: &str, out: &mut impl Write) -> Result<Step> {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" => return Ok(Step::Quit),
            "help" => self.help(out)?,
            "agent" => self.select(arg, out)?,
            "agents" => print_team(out, self.workspace.registry(), Some(&self.session))?,
            "history" => self.history(arg, out)?,
            "recent" => self.recent(out)?,
            "clear" => {
                let removed = self.session.clear_for(&self.selected.key);
                writeln!(
                    out,
                    "{} Cleared {} exchanges with {}",
                    "✓".green(),
                    removed,
                    self.selected.name
                )?;
            }
            "clear-all" => {
                self.session.clear();
                writeln!(out, "{} Memory cleared!", "✓".green())?;
            }
            "stats" => self.stats(out)?,
            "model" => {
                if arg.is_empty() {
                    writeln!(out, "{} {}", "Model:".bold(), self.workspace.model())?;
                } else {
                    let model = self.config.inference.resolve_model(Some(arg))?;
                    writeln!(out, "{} Using {}", "✓".green(), model.cyan())?;
                    self.workspace.set_model(model);
                }
            }
            "models" => {
                for model in &self.config.inference.models {
                    let marker = if *model == self.workspace.model() { "●".green() } else { "○".dimmed() };
                    writeln!(out, "  {} {}", marker, model)?;
                }
            }
            "token" => {
                self.workspace.set_credential(arg);
                if self.workspace.has_credential() {
                    writeln!(out, "{} Token set for this session", "✓".green())?;
                } else {
                    writeln!(out, "{} Token cleared", "✓".green())?;
                }
            }
            "prompt" => {
                if arg.is_empty() {
                    eyre::bail!("Usage: /prompt <text>");
                }
                let prompt = self.workspace.prompt_for(&self.session, &self.selected.key, arg)?;
                writeln!(out, "{}", prompt)?;
            }
            "note" => {
                let (key, text) = arg
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| eyre::eyre!("Usage: /note <key> <text>"))?;
                self.session.set_context(key, text.trim());
                writeln!(out, "{} Noted {}", "✓".green(), key.cyan())?;
            }
            "export" => {
                let dir = if arg.is_empty() {
                    self.config.export_dir()
                } else {
                    Config::expand_path(&PathBuf::from(arg))
                };
                let path = self.session.export_to(&dir)?;
                writeln!(out, "{} Exported session to {}", "✓".green(), path.display())?;
            }
            other => eyre::bail!("Unknown command: /{} (try /help)", other),
        }

        Ok(Step::Continue)
    }

    fn send(&mut self, text: &str, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", format!("{} is thinking...", self.selected.name).dimmed())?;
        out.flush()?;

        if let Some(exchange) = self.workspace.send(&mut self.session, &self.selected.key, text)? {
            writeln!(out, "{} {}", format!("{}:", self.selected.name).green().bold(), exchange.response)?;
        }
        Ok(())
    }

    fn select(&mut self, key: &str, out: &mut impl Write) -> Result<()> {
        if !key.is_empty() {
            self.selected = self.workspace.persona(key)?;
        }
        print_card(out, self.selected)?;
        Ok(())
    }

    fn help(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", "Commands:".bold())?;
        for (usage, what) in HELP {
            writeln!(out, "  {:16} {}", usage.cyan(), what)?;
        }
        Ok(())
    }

    fn history(&self, arg: &str, out: &mut impl Write) -> Result<()> {
        let limit = if arg.is_empty() {
            self.config.session.history_limit
        } else {
            arg.parse::<NonZeroUsize>()
                .map_err(|_| eyre::eyre!("Invalid count: {} (use a positive number)", arg))?
                .get()
        };

        let history = self.session.history(Some(&self.selected.key), limit);
        writeln!(out, "{}", "Conversation History".bold())?;

        if history.is_empty() {
            writeln!(
                out,
                "  {}",
                format!("No conversation history with {} yet. Start chatting!", self.selected.name).dimmed()
            )?;
            return Ok(());
        }

        for exchange in history.iter().rev() {
            self.print_exchange(exchange, out)?;
        }
        Ok(())
    }

    /// Display name for an agent key; the key itself when it is not in the registry
    fn agent_name<'a>(&self, key: &'a str) -> &'a str {
        self.workspace
            .registry()
            .get(key)
            .map(|p| p.name.as_str())
            .unwrap_or(key)
    }

    fn print_exchange(&self, exchange: &Exchange, out: &mut impl Write) -> Result<()> {
        let name = self.agent_name(&exchange.agent);

        writeln!(out, "{}", divider().dimmed())?;
        writeln!(out, "{}", exchange.when().dimmed())?;
        writeln!(out, "{} {}", "You:".bold(), exchange.user_input)?;
        writeln!(out, "{} {}", format!("{}:", name).bold(), exchange.response)?;
        Ok(())
    }

    fn recent(&self, out: &mut impl Write) -> Result<()> {
        let recent = self.session.history(None, RECENT_COUNT);
        writeln!(out, "{}", "Recent Activity".bold())?;

        if recent.is_empty() {
            writeln!(out, "  {}", "(no messages yet)".dimmed())?;
        }
        for exchange in recent {
            let name = self.agent_name(&exchange.agent);
            writeln!(out, "  {}: {}", name.bold(), preview(&exchange.user_input, RECENT_PREVIEW))?;
        }
        Ok(())
    }

    fn stats(&self, out: &mut impl Write) -> Result<()> {
        let stats = self.session.stats();
        writeln!(out, "{}", "Session Stats".bold())?;
        writeln!(out, "  Total Messages: {}", stats.total_messages)?;
        writeln!(out, "  Active Agents:  {}", stats.active_agents)?;
        writeln!(out, "  Agent States:   {}", stats.tracked_agents)?;
        writeln!(out, "  Model:          {}", self.workspace.model())?;
        writeln!(
            out,
            "  Token:          {}",
            if self.workspace.has_credential() { "configured" } else { "missing" }
        )?;
        writeln!(
            out,
            "  Started:        {}",
            self.session.created_at().format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(())
    }
}

/// First `max` characters of `text`, with "..." when cut
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

fn divider() -> String {
    let width = terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w as usize)
        .unwrap_or(60)
        .min(80);
    "─".repeat(width)
}

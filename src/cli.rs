use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "crewhub",
    about = "Chat with a crew of persona agents backed by a hosted text-generation API",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/crewhub/logs/crewhub.log\n\nSet HUGGINGFACE_API_TOKEN (or pass --token) to talk to the models."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to crewhub.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the crew
    Agents {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show one agent's card
    Show {
        /// Agent key (e.g., tinker, mr_smiley)
        agent: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// List the models you can pick from
    Models {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the prompt a message would produce, without sending it
    Prompt {
        /// Agent key
        agent: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Send one message and print the reply
    Ask {
        /// Agent key
        agent: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Model to use (must be in the configured allow-list)
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// API token (defaults to the configured env var)
        #[arg(long)]
        token: Option<String>,

        /// Export the session to this directory afterwards
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Start an interactive chat session
    Chat {
        /// Agent to start with
        #[arg(long, short = 'a')]
        agent: Option<String>,

        /// Model to use (must be in the configured allow-list)
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// API token (defaults to the configured env var)
        #[arg(long)]
        token: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },
}

use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "crewhub Configuration".bold());
            println!();

            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
            println!();

            println!("{}:", "inference".cyan());
            println!("  base_url: {}", config.inference.base_url);
            println!("  token_env: {}", config.inference.token_env);
            println!("  default_model: {}", config.inference.default_model);
            println!("  models: {}", config.inference.models.join(", "));
            println!("  max_length: {}", config.inference.max_length);
            println!("  temperature: {}", config.inference.temperature);
            println!("  do_sample: {}", config.inference.do_sample);
            println!();

            println!("{}:", "session".cyan());
            println!("  context_exchanges: {}", config.session.context_exchanges);
            println!("  history_limit: {}", config.session.history_limit);
            println!("  export_dir: {}", config.session.export_dir.display());
        }
    }

    Ok(())
}

fn value(key: &str, config: &Config) -> Option<String> {
    let value = match key {
        "log_level" | "log-level" => config.log_level.as_filter().to_string(),
        "inference.base_url" => config.inference.base_url.clone(),
        "inference.token_env" => config.inference.token_env.clone(),
        "inference.default_model" => config.inference.default_model.clone(),
        "inference.models" => config.inference.models.join(","),
        "inference.max_length" => config.inference.max_length.to_string(),
        "inference.temperature" => config.inference.temperature.to_string(),
        "inference.do_sample" => config.inference.do_sample.to_string(),
        "session.context_exchanges" => config.session.context_exchanges.to_string(),
        "session.history_limit" => config.session.history_limit.to_string(),
        "session.export_dir" => config.session.export_dir.display().to_string(),
        _ => return None,
    };
    Some(value)
}

fn get(key: &str, config: &Config) -> Result<()> {
    match value(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

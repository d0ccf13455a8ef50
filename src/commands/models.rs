use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;

#[derive(Serialize)]
struct ModelInfo<'a> {
    name: &'a str,
    default: bool,
    endpoint: String,
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let inference = &config.inference;
    let models: Vec<ModelInfo> = inference
        .models
        .iter()
        .map(|m| ModelInfo {
            name: m,
            default: *m == inference.default_model,
            endpoint: format!("{}/{}", inference.base_url.trim_end_matches('/'), m),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&models)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&models)?),
        OutputFormat::Text => {
            println!("{}", "Available Models:".bold());
            println!();
            for model in &models {
                if model.default {
                    println!("  {} {} {}", "●".green(), model.name.bold(), "(default)".dimmed());
                } else {
                    println!("  {} {}", "○".dimmed(), model.name);
                }
            }
        }
    }

    Ok(())
}

//! Crew listing and agent cards

use colored::*;
use eyre::Result;
use serde::Serialize;
use std::io::{self, Write};

use crate::cli::OutputFormat;
use crate::persona::{Persona, PersonaRegistry};
use crate::session::{AgentStatus, Session};

#[derive(Serialize)]
struct AgentSummary<'a> {
    key: &'a str,
    name: &'a str,
    description: &'a str,
    specialties: &'a [String],
}

pub fn list(format: OutputFormat) -> Result<()> {
    let registry = PersonaRegistry::builtin();

    let summaries: Vec<AgentSummary> = registry
        .iter()
        .map(|p| AgentSummary {
            key: &p.key,
            name: &p.name,
            description: &p.description,
            specialties: &p.specialties,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => print_team(&mut io::stdout(), registry, None)?,
    }

    Ok(())
}

pub fn show(key: &str, format: OutputFormat) -> Result<()> {
    let persona = PersonaRegistry::builtin().get(key)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(persona)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(persona)?),
        OutputFormat::Text => print_card(&mut io::stdout(), persona)?,
    }

    Ok(())
}

/// Full card for one persona
pub fn print_card(out: &mut impl Write, persona: &Persona) -> Result<()> {
    writeln!(out, "{} {}", "Agent:".bold(), persona.name.green().bold())?;
    writeln!(out, "{} {}", "Role:".bold(), persona.description)?;
    writeln!(out, "{} {}", "Persona:".bold(), persona.persona)?;
    writeln!(out, "{} {}", "Specialties:".bold(), persona.specialties_line().cyan())?;
    Ok(())
}

/// Team overview; with a session, each agent is marked Active or Idle
pub fn print_team(out: &mut impl Write, registry: &PersonaRegistry, session: Option<&Session>) -> Result<()> {
    writeln!(out, "{}", "Team Overview:".bold())?;
    writeln!(out)?;

    for persona in registry.iter() {
        match session.map(|s| s.status(&persona.key)) {
            Some(AgentStatus::Active) => writeln!(
                out,
                "  {} {} ({})  {}",
                "●".green(),
                persona.name.bold(),
                persona.key,
                AgentStatus::Active.to_string().green().bold()
            )?,
            Some(AgentStatus::Idle) => writeln!(
                out,
                "  {} {} ({})  {}",
                "●".dimmed(),
                persona.name.bold(),
                persona.key,
                AgentStatus::Idle.to_string().dimmed()
            )?,
            None => writeln!(out, "  {} {} ({})", "●".green(), persona.name.bold(), persona.key)?,
        }
        writeln!(out, "    {}", persona.description.dimmed())?;
        writeln!(out, "    Specialties: {}", persona.specialties_line().cyan())?;
        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_print_card() {
        let spy = PersonaRegistry::builtin().get("spy").unwrap();
        let text = render(|out| print_card(out, spy));
        assert!(text.contains("Spy"));
        assert!(text.contains("The Intelligence Analyst"));
        assert!(text.contains("Research, Analysis, Intelligence Gathering, Strategic Planning"));
    }

    #[test]
    fn test_print_team_with_status() {
        let registry = PersonaRegistry::builtin();
        let mut session = Session::new();
        session.append(registry.get("tailor").unwrap(), "draft", "done");

        let text = render(|out| print_team(out, registry, Some(&session)));
        for persona in registry.iter() {
            assert!(text.contains(&persona.name));
        }
        assert_eq!(text.matches("Active").count(), 1);
        assert_eq!(text.matches("Idle").count(), 4);
    }

    #[test]
    fn test_print_team_without_session() {
        let text = render(|out| print_team(out, PersonaRegistry::builtin(), None));
        assert!(text.contains("Mr. Smiley"));
        assert!(!text.contains("Idle"));
    }
}

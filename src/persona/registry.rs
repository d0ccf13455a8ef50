//! Built-in persona table

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The role a persona plays on the crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Tinker,
    Tailor,
    Soldier,
    Spy,
    Ceo,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

/// A persona agent the user can talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Stable lookup key (e.g., "tinker", "mr_smiley")
    pub key: String,

    /// Display name
    pub name: String,

    /// Crew role
    pub role: AgentRole,

    /// Role label shown next to the name
    pub description: String,

    /// Narrative text describing how the persona thinks and talks
    pub persona: String,

    /// Areas of expertise, in display order
    pub specialties: Vec<String>,
}

impl Persona {
    fn builtin(key: &str, name: &str, role: AgentRole, description: &str, persona: &str, specialties: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            role,
            description: description.to_string(),
            persona: persona.to_string(),
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn specialties_line(&self) -> String {
        self.specialties.join(", ")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonaError {
    #[error("Unknown agent: {key}. Available: {available}")]
    NotFound { key: String, available: String },
}

static BUILTIN: Lazy<PersonaRegistry> = Lazy::new(PersonaRegistry::new);

/// Immutable table of the crew's personas, keyed in display order
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: IndexMap<String, Persona>,
}

impl PersonaRegistry {
    /// Build the table of built-in personas
    pub fn new() -> Self {
        let personas = [
            Persona::builtin(
                "tinker",
                "Tinker",
                AgentRole::Tinker,
                "The Technical Innovator",
                "A brilliant engineer who loves to build, fix, and optimize systems. Always curious about how things work.",
                &["Code Generation", "System Architecture", "Problem Solving", "Technical Innovation"],
            ),
            Persona::builtin(
                "tailor",
                "Tailor",
                AgentRole::Tailor,
                "The Content Creator",
                "A meticulous wordsmith who crafts perfect content, adapts messaging, and ensures quality.",
                &["Content Writing", "Documentation", "Communication", "Quality Assurance"],
            ),
            Persona::builtin(
                "soldier",
                "Soldier",
                AgentRole::Soldier,
                "The Executor",
                "A disciplined professional who gets things done efficiently and follows through on commitments.",
                &["Project Management", "Execution", "Process Optimization", "Quality Control"],
            ),
            Persona::builtin(
                "spy",
                "Spy",
                AgentRole::Spy,
                "The Intelligence Analyst",
                "A perceptive analyst who gathers information, identifies patterns, and provides strategic insights.",
                &["Research", "Analysis", "Intelligence Gathering", "Strategic Planning"],
            ),
            Persona::builtin(
                "mr_smiley",
                "Mr. Smiley",
                AgentRole::Ceo,
                "The CEO Persona",
                "A charismatic leader who coordinates the team, makes strategic decisions, and ensures success.",
                &["Leadership", "Strategy", "Coordination", "Decision Making"],
            ),
        ];

        Self {
            personas: personas.into_iter().map(|p| (p.key.clone(), p)).collect(),
        }
    }

    /// Shared instance of the built-in table
    pub fn builtin() -> &'static PersonaRegistry {
        &BUILTIN
    }

    /// Look up a persona by key
    pub fn get(&self, key: &str) -> Result<&Persona, PersonaError> {
        self.personas.get(key).ok_or_else(|| PersonaError::NotFound {
            key: key.to_string(),
            available: self.keys().join(", "),
        })
    }

    /// All valid keys, in display order
    pub fn keys(&self) -> Vec<&str> {
        self.personas.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    /// First persona in display order
    pub fn default_persona(&self) -> &Persona {
        self.personas
            .first()
            .map(|(_, p)| p)
            .unwrap_or_else(|| unreachable!("built-in registry is never empty"))
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

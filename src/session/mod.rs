//! Conversation session
//!
//! An in-memory, append-only log of exchanges with the crew, owned by one
//! front-end session and passed explicitly to every operation.
//! Lives as long as the process; `export` writes a JSON snapshot on request.

pub mod export;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// One user-input/agent-response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub timestamp: DateTime<Local>,
    /// Persona key
    pub agent: String,
    pub user_input: String,
    /// Reply text, or the error text shown in its place
    pub response: String,
}

impl Exchange {
    /// Timestamp formatted for transcript headers
    pub fn when(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Idle,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "Active"),
            AgentStatus::Idle => write!(f, "Idle"),
        }
    }
}

/// Per-agent bookkeeping kept alongside the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub status: AgentStatus,
    pub exchanges: usize,
    pub last_active: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_model: Option<String>,
}

/// Session counters for the stats view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_messages: usize,
    pub active_agents: usize,
    pub tracked_agents: usize,
}

/// The whole per-session state; its serialized form is the export format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    conversations: Vec<Exchange>,
    agent_states: IndexMap<String, AgentState>,
    project_context: IndexMap<String, String>,
    created_at: DateTime<Local>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            agent_states: IndexMap::new(),
            project_context: IndexMap::new(),
            created_at: Local::now(),
        }
    }

    /// Record an exchange with `persona`.
    ///
    /// Taking the persona itself keeps every stored key pointing at a real
    /// registry entry.
    pub fn append(&mut self, persona: &Persona, user_input: &str, response: &str) -> &Exchange {
        self.append_with_model(persona, user_input, response, None)
    }

    /// Record an exchange and the model that produced it
    pub fn append_with_model(
        &mut self,
        persona: &Persona,
        user_input: &str,
        response: &str,
        model: Option<&str>,
    ) -> &Exchange {
        let exchange = Exchange {
            timestamp: Local::now(),
            agent: persona.key.clone(),
            user_input: user_input.to_string(),
            response: response.to_string(),
        };

        let state = self
            .agent_states
            .entry(persona.key.clone())
            .or_insert_with(|| AgentState {
                status: AgentStatus::Active,
                exchanges: 0,
                last_active: exchange.timestamp,
                last_model: None,
            });
        state.status = AgentStatus::Active;
        state.exchanges += 1;
        state.last_active = exchange.timestamp;
        if let Some(model) = model {
            state.last_model = Some(model.to_string());
        }

        log::debug!("Appended exchange for {} ({} total)", persona.key, self.conversations.len() + 1);
        self.conversations.push(exchange);
        &self.conversations[self.conversations.len() - 1]
    }

    /// The last `limit` exchanges, optionally for one agent, most recent last
    pub fn history(&self, agent: Option<&str>, limit: usize) -> Vec<&Exchange> {
        let matching: Vec<&Exchange> = self
            .conversations
            .iter()
            .filter(|e| agent.is_none_or(|a| e.agent == a))
            .collect();
        let start = matching.len().saturating_sub(limit);
        matching[start..].to_vec()
    }

    /// Every exchange, oldest first
    pub fn conversations(&self) -> &[Exchange] {
        &self.conversations
    }

    pub fn agent_state(&self, agent: &str) -> Option<&AgentState> {
        self.agent_states.get(agent)
    }

    pub fn is_active(&self, agent: &str) -> bool {
        self.conversations.iter().any(|e| e.agent == agent)
    }

    pub fn status(&self, agent: &str) -> AgentStatus {
        if self.is_active(agent) { AgentStatus::Active } else { AgentStatus::Idle }
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Free-form notes carried in the export
    pub fn set_context(&mut self, key: &str, value: &str) {
        self.project_context.insert(key.to_string(), value.to_string());
    }

    pub fn context(&self) -> &IndexMap<String, String> {
        &self.project_context
    }

    pub fn stats(&self) -> SessionStats {
        let mut agents: Vec<&str> = self.conversations.iter().map(|e| e.agent.as_str()).collect();
        agents.sort_unstable();
        agents.dedup();

        SessionStats {
            total_messages: self.conversations.len(),
            active_agents: agents.len(),
            tracked_agents: self.agent_states.len(),
        }
    }

    /// Drop everything and start a fresh session
    pub fn clear(&mut self) {
        log::info!("Clearing session ({} exchanges)", self.conversations.len());
        *self = Self::new();
    }

    /// Drop one agent's exchanges, leaving the others untouched
    pub fn clear_for(&mut self, agent: &str) -> usize {
        let before = self.conversations.len();
        self.conversations.retain(|e| e.agent != agent);
        self.agent_states.shift_remove(agent);
        let removed = before - self.conversations.len();
        log::info!("Cleared {} exchanges for {}", removed, agent);
        removed
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

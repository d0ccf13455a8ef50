//! Prompt building
//!
//! Turns a persona, its recent exchanges and a new request into the single
//! text prompt sent to the model.

use super::Persona;
use crate::session::Exchange;

/// Marker that ends every prompt; the model's continuation follows it.
pub const RESPONSE_MARKER: &str = "Response:";

/// Exchanges fetched from the session for context (the builder keeps fewer).
const CONTEXT_FETCH: usize = 3;

/// Prompt builder for a single persona turn
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    /// How many prior exchanges to inline as context
    context_exchanges: usize,
}

impl PromptBuilder {
    pub fn new(context_exchanges: usize) -> Self {
        Self { context_exchanges }
    }

    /// Exchanges to fetch from the session: at least `CONTEXT_FETCH`,
    /// more when the builder inlines more than that
    pub fn fetch_count(&self) -> usize {
        self.context_exchanges.max(CONTEXT_FETCH)
    }

    /// Build the prompt.
    ///
    /// `history` is the persona's own exchanges, most recent last. Only the
    /// tail of it is inlined.
    pub fn build(&self, persona: &Persona, history: &[&Exchange], user_input: &str) -> String {
        let context = self.context_block(history);

        format!(
            "You are {name}, {description}.\n\
             \n\
             Your persona: {persona}\n\
             \n\
             Your specialties: {specialties}\n\
             \n\
             Instructions: Respond as {name} would, staying in character. Be helpful, professional, and leverage your specialties. Keep responses concise but informative.\n\
             \n\
             {context}\n\
             \n\
             Current user request: {user_input}\n\
             \n\
             {marker}",
            name = persona.name,
            description = persona.description,
            persona = persona.persona,
            specialties = persona.specialties_line(),
            context = context,
            user_input = user_input,
            marker = RESPONSE_MARKER,
        )
    }

    fn context_block(&self, history: &[&Exchange]) -> String {
        if history.is_empty() || self.context_exchanges == 0 {
            return String::new();
        }

        let start = history.len().saturating_sub(self.context_exchanges);
        let mut block = String::from("\n\nRecent conversation context:\n");
        for exchange in &history[start..] {
            block.push_str(&format!("User: {}\nYou: {}\n", exchange.user_input, exchange.response));
        }
        block
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(2)
    }
}

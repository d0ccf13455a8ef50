//! One chat turn, end to end
//!
//! Persona lookup -> prompt -> inference -> reply cleanup -> session append.
//! The session is owned by the caller and passed in for every turn.

use eyre::Result;

use crate::config::Config;
use crate::inference::{TextGenerator, reply_text};
use crate::persona::prompt::PromptBuilder;
use crate::persona::{Persona, PersonaRegistry};
use crate::session::{Exchange, Session};

/// The crew plus everything needed to talk to it
pub struct Workspace<G: TextGenerator> {
    registry: &'static PersonaRegistry,
    builder: PromptBuilder,
    generator: G,
    model: String,
    credential: Option<String>,
}

impl<G: TextGenerator> Workspace<G> {
    pub fn new(generator: G, model: String, credential: Option<String>, context_exchanges: usize) -> Self {
        Self {
            registry: PersonaRegistry::builtin(),
            builder: PromptBuilder::new(context_exchanges),
            generator,
            model,
            credential,
        }
    }

    /// Build a workspace with the model and token resolved from `config`
    pub fn from_config(generator: G, config: &Config, model: Option<&str>, token: Option<&str>) -> Result<Self> {
        let model = config.inference.resolve_model(model)?;
        let credential = config.inference.resolve_token(token);
        if credential.is_none() {
            log::warn!("No API token configured (env var {})", config.inference.token_env);
        }
        Ok(Self::new(generator, model, credential, config.session.context_exchanges))
    }

    pub fn registry(&self) -> &'static PersonaRegistry {
        self.registry
    }

    pub fn persona(&self, key: &str) -> Result<&'static Persona> {
        Ok(self.registry.get(key)?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Set or clear the token; blank input clears it
    pub fn set_credential(&mut self, token: &str) {
        let token = token.trim();
        self.credential = if token.is_empty() { None } else { Some(token.to_string()) };
    }

    /// The prompt a message to `agent` would produce right now
    pub fn prompt_for(&self, session: &Session, agent: &str, user_input: &str) -> Result<String> {
        let persona = self.persona(agent)?;
        let history = session.history(Some(&persona.key), self.builder.fetch_count());
        Ok(self.builder.build(persona, &history, user_input))
    }

    /// Send a message to `agent` and record the exchange.
    ///
    /// Blank input is ignored and yields `None`. Inference failures are not
    /// errors here: their text is recorded as the reply.
    pub fn send<'s>(&self, session: &'s mut Session, agent: &str, user_input: &str) -> Result<Option<&'s Exchange>> {
        if user_input.trim().is_empty() {
            return Ok(None);
        }

        let persona = self.persona(agent)?;
        let prompt = self.prompt_for(session, agent, user_input)?;
        let outcome = self
            .generator
            .query(&prompt, &self.model, self.credential.as_deref());
        if let Err(e) = &outcome {
            log::warn!("Inference for {} failed: {:?}", persona.key, e);
        }
        let response = reply_text(&prompt, outcome);

        Ok(Some(session.append_with_model(persona, user_input, &response, Some(&self.model))))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use std::cell::RefCell;

    /// Generator that replays canned outcomes and records prompts
    pub(crate) struct ScriptedGenerator {
        pub outcomes: RefCell<Vec<Result<String, InferenceError>>>,
        pub prompts: RefCell<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(outcomes: Vec<Result<String, InferenceError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes),
                prompts: RefCell::new(Vec::new()),
            }
        }

        /// Echo the prompt back followed by `reply`, the way raw text-generation models do
        pub(crate) fn echoing(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(format!("{{prompt}} {}", r))).collect())
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn query(&self, prompt: &str, _model_id: &str, credential: Option<&str>) -> Result<String, InferenceError> {
            if credential.is_none() {
                return Err(InferenceError::MissingCredential);
            }
            self.prompts.borrow_mut().push(prompt.to_string());
            let mut outcomes = self.outcomes.borrow_mut();
            if outcomes.is_empty() {
                return Ok(String::new());
            }
            outcomes.remove(0).map(|text| text.replace("{prompt}", prompt))
        }
    }

    fn workspace(generator: ScriptedGenerator) -> Workspace<ScriptedGenerator> {
        Workspace::new(generator, "gpt2".to_string(), Some("token".to_string()), 2)
    }

    #[test]
    fn test_send_records_cleaned_reply() {
        let ws = workspace(ScriptedGenerator::echoing(&["Consider the files."]));
        let mut session = Session::new();

        let exchange = ws.send(&mut session, "spy", "What do we know?").unwrap().unwrap();
        assert_eq!(exchange.agent, "spy");
        assert_eq!(exchange.user_input, "What do we know?");
        assert_eq!(exchange.response, "Consider the files.");
        assert_eq!(session.agent_state("spy").unwrap().last_model.as_deref(), Some("gpt2"));
    }

    #[test]
    fn test_send_ignores_blank_input() {
        let ws = workspace(ScriptedGenerator::echoing(&["unused"]));
        let mut session = Session::new();

        assert!(ws.send(&mut session, "spy", "   \n").unwrap().is_none());
        assert!(session.conversations().is_empty());
        assert!(ws.generator.prompts.borrow().is_empty());
    }

    #[test]
    fn test_send_unknown_agent() {
        let ws = workspace(ScriptedGenerator::echoing(&["unused"]));
        let mut session = Session::new();

        let err = ws.send(&mut session, "ghost", "hi").unwrap_err();
        assert!(err.to_string().contains("Unknown agent: ghost"));
        assert!(session.conversations().is_empty());
    }

    #[test]
    fn test_send_stores_error_text_as_reply() {
        let ws = workspace(ScriptedGenerator::new(vec![Err(InferenceError::HttpError {
            status: 500,
            body: "boom".to_string(),
        })]));
        let mut session = Session::new();

        let exchange = ws.send(&mut session, "tinker", "build").unwrap().unwrap();
        assert_eq!(exchange.response, "API Error: 500 - boom");
        assert_eq!(session.history(Some("tinker"), 1).len(), 1);
    }

    #[test]
    fn test_send_without_credential() {
        let mut ws = workspace(ScriptedGenerator::echoing(&["unused"]));
        ws.set_credential("  ");
        assert!(!ws.has_credential());

        let mut session = Session::new();
        let exchange = ws.send(&mut session, "tailor", "draft").unwrap().unwrap();
        assert_eq!(exchange.response, InferenceError::MissingCredential.to_string());
    }

    #[test]
    fn test_follow_up_prompt_includes_context() {
        let ws = workspace(ScriptedGenerator::echoing(&["first reply", "second reply"]));
        let mut session = Session::new();

        ws.send(&mut session, "soldier", "step one").unwrap();
        ws.send(&mut session, "soldier", "step two").unwrap();

        let prompts = ws.generator.prompts.borrow();
        assert!(!prompts[0].contains("Recent conversation context"));
        assert!(prompts[1].contains("User: step one\nYou: first reply\n"));
    }

    #[test]
    fn test_context_beyond_default_fetch() {
        let ws = Workspace::new(
            ScriptedGenerator::echoing(&["r1", "r2", "r3", "r4", "r5", "r6"]),
            "gpt2".to_string(),
            Some("token".to_string()),
            5,
        );
        let mut session = Session::new();
        for i in 1..=6 {
            ws.send(&mut session, "spy", &format!("m{}", i)).unwrap();
        }

        let prompt = ws.prompt_for(&session, "spy", "next").unwrap();
        assert_eq!(prompt.matches("User: m").count(), 5);
        assert!(!prompt.contains("User: m1\n"));
        assert!(prompt.contains("User: m6\nYou: r6\n"));
    }

    #[test]
    fn test_context_is_per_agent() {
        let ws = workspace(ScriptedGenerator::echoing(&["spy reply", "tinker reply"]));
        let mut session = Session::new();

        ws.send(&mut session, "spy", "secret").unwrap();
        let prompt = ws.prompt_for(&session, "tinker", "gears").unwrap();
        assert!(!prompt.contains("secret"));
        assert!(prompt.contains("You are Tinker"));
    }
}

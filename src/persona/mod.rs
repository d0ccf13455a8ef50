//! Persona system for the crew
//!
//! Personas are fixed agent identities whose metadata steers generated text:
//! - Registry (the immutable lookup table)
//! - Prompt building (persona + recent history + new request)

pub mod prompt;
pub mod registry;

pub use registry::{Persona, PersonaError, PersonaRegistry};

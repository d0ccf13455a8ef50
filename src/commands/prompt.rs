use eyre::Result;

use crate::config::Config;
use crate::persona::PersonaRegistry;
use crate::persona::prompt::PromptBuilder;

/// Print the prompt a first message to `agent` would produce
pub fn run(agent: &str, message: &[String], config: &Config) -> Result<()> {
    let persona = PersonaRegistry::builtin().get(agent)?;
    let user_input = message.join(" ");
    if user_input.trim().is_empty() {
        eyre::bail!("Message is empty");
    }

    let prompt = PromptBuilder::new(config.session.context_exchanges).build(persona, &[], &user_input);
    println!("{}", prompt);
    Ok(())
}

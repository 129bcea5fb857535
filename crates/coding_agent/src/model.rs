/// Produces a response for a fully assembled prompt.
///
/// The prompt is the bounded conversation context followed by the new user
/// message, formatted the same way stored turns are.
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String>;
}

impl<F> TextGenerator for F
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String> {
        self(prompt)
    }
}

/// Deterministic stand-in for a model: answers with the newest user message
/// and how many earlier turns were in context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoBackend;

const USER_PREFIX: &str = "User: ";

impl TextGenerator for EchoBackend {
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String> {
        let Some(start) = prompt.rfind(USER_PREFIX) else {
            anyhow::bail!("prompt has no user message");
        };

        let message = prompt[start + USER_PREFIX.len()..].trim();
        let earlier_turns = prompt[..start].matches(USER_PREFIX).count();
        Ok(format!(
            "Echo ({earlier_turns} earlier turn{} in context): {message}",
            if earlier_turns == 1 { "" } else { "s" }
        ))
    }
}

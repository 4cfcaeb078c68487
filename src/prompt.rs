use crate::models::api::Message;

pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a friendly, knowledgeable customer support \
assistant for an AI-powered interview practice platform for software engineering candidates. \
Answer clearly and concisely in a professional, supportive tone. Use the following background \
information to inform your answers without referring to it explicitly. If it does not cover the \
question, rely on your general knowledge of the platform:

{context}

Help with how the platform works, scheduling interviews, technical problems, and getting the \
most out of AI-assisted practice. Walk users through troubleshooting step by step and suggest \
contacting human support when an issue cannot be resolved here.";

/// System prompt template with a single `{context}` slot.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    template: String,
}

impl SystemPrompt {
    pub fn new(template: impl Into<String>) -> anyhow::Result<Self> {
        let template = template.into();
        if !template.contains(CONTEXT_PLACEHOLDER) {
            anyhow::bail!("System prompt template must contain {CONTEXT_PLACEHOLDER}");
        }
        Ok(Self { template })
    }

    /// Substitute `context` into the first placeholder.
    pub fn render(&self, context: &str) -> String {
        self.template.replacen(CONTEXT_PLACEHOLDER, context, 1)
    }

    pub fn message(&self, context: &str) -> Message {
        Message::system(self.render(context))
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self {
            template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
        }
    }
}

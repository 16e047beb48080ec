//! Catalog of the built-in chat models and their credentials.

use crate::agent::StreamingChatAgent;
use crate::anthropic::{self, AnthropicAgent};
use crate::config::AgentConfig;
use crate::error::{ChatError, Result};
use crate::gemini::{self, GeminiAgent};
use crate::openai::{self, OpenAiAgent};
use crate::openrouter::{self, OpenRouterAgent};
use crate::together::{self, TogetherAgent};

/// Builds an agent from a credential and its configuration.
pub type AgentFactory = fn(String, AgentConfig) -> Result<Box<dyn StreamingChatAgent>>;

/// Everything needed to list a model and construct its agent.
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    /// Stable identifier used in config files and on the command line.
    pub key: &'static str,
    pub display_name: &'static str,
    pub provider_name: &'static str,
    pub description: &'static str,
    /// Name of the credential (environment variable) holding the API key.
    pub credential_key: &'static str,
    /// Whether snapshots from this model can carry thinking text.
    pub supports_thinking: bool,
    pub defaults: fn() -> AgentConfig,
    pub factory: AgentFactory,
}

impl AgentDescriptor {
    /// Build the agent with its default configuration.
    pub fn instantiate(&self, credential: impl Into<String>) -> Result<Box<dyn StreamingChatAgent>> {
        (self.factory)(credential.into(), (self.defaults)())
    }

    /// Build the agent with an explicit configuration.
    pub fn instantiate_with(
        &self,
        credential: impl Into<String>,
        config: AgentConfig,
    ) -> Result<Box<dyn StreamingChatAgent>> {
        (self.factory)(credential.into(), config)
    }
}

/// Ordered set of descriptors.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    descriptors: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in providers.
    pub fn builtin() -> Self {
        Self::new()
            .register(AgentDescriptor {
                key: "openai",
                display_name: "GPT-4 Turbo",
                provider_name: "OpenAI",
                description: "Latest GPT-4 model with improved performance",
                credential_key: "OPENAI_API_KEY",
                supports_thinking: false,
                defaults: openai::default_config,
                factory: |key, cfg| Ok(Box::new(OpenAiAgent::with_config(key, cfg)?)),
            })
            .register(AgentDescriptor {
                key: "anthropic",
                display_name: "Claude 3 Opus",
                provider_name: "Anthropic",
                description: "Most capable Claude model for complex tasks",
                credential_key: "ANTHROPIC_API_KEY",
                supports_thinking: false,
                defaults: anthropic::default_config,
                factory: |key, cfg| Ok(Box::new(AnthropicAgent::with_config(key, cfg)?)),
            })
            .register(AgentDescriptor {
                key: "gemini",
                display_name: "Gemini 2.0 Flash Thinking",
                provider_name: "Google",
                description: "Gemini model that streams its reasoning before the answer",
                credential_key: "GOOGLE_API_KEY",
                supports_thinking: true,
                defaults: gemini::default_config,
                factory: |key, cfg| Ok(Box::new(GeminiAgent::with_config(key, cfg)?)),
            })
            .register(AgentDescriptor {
                key: "together",
                display_name: "Mixtral-8x7B",
                provider_name: "Together AI",
                description: "Open-weight mixture-of-experts model served by Together",
                credential_key: "TOGETHER_API_KEY",
                supports_thinking: false,
                defaults: together::default_config,
                factory: |key, cfg| Ok(Box::new(TogetherAgent::with_config(key, cfg)?)),
            })
            .register(AgentDescriptor {
                key: "openrouter",
                display_name: "OpenRouter Hub",
                provider_name: "OpenRouter",
                description: "Access to multiple LLM providers through a single API",
                credential_key: "OPENROUTER_API_KEY",
                supports_thinking: false,
                defaults: openrouter::default_config,
                factory: |key, cfg| Ok(Box::new(OpenRouterAgent::with_config(key, cfg)?)),
            })
    }

    /// Add a descriptor, replacing any existing one with the same key.
    pub fn register(mut self, descriptor: AgentDescriptor) -> Self {
        match self.descriptors.iter_mut().find(|d| d.key == descriptor.key) {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        self
    }

    pub fn descriptors(&self) -> &[AgentDescriptor] {
        &self.descriptors
    }

    /// Look up a descriptor by key.
    pub fn get(&self, key: &str) -> Result<&AgentDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| ChatError::UnknownModel(key.to_string()))
    }

    /// Descriptors whose credential `lookup` can resolve, in registration order.
    pub fn list_available<F>(&self, lookup: F) -> Vec<&AgentDescriptor>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.descriptors
            .iter()
            .filter(|d| lookup(d.credential_key).is_some_and(|k| !k.is_empty()))
            .collect()
    }

    /// First descriptor with a credential, paired with that credential.
    pub fn first_available<F>(&self, lookup: F) -> Option<(&AgentDescriptor, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.descriptors.iter().find_map(|d| {
            lookup(d.credential_key)
                .filter(|k| !k.is_empty())
                .map(|k| (d, k))
        })
    }

    /// Build the agent for `descriptor` with its default configuration.
    pub fn instantiate(
        &self,
        descriptor: &AgentDescriptor,
        credential: impl Into<String>,
    ) -> Result<Box<dyn StreamingChatAgent>> {
        descriptor.instantiate(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAgent, MockConfig};

    fn lookup_from(keys: &'static [&'static str]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| keys.iter().any(|k| *k == name).then(|| format!("key-for-{name}"))
    }

    #[test]
    fn builtin_order_and_keys() {
        let registry = AgentRegistry::builtin();
        let keys: Vec<&str> = registry.descriptors().iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["openai", "anthropic", "gemini", "together", "openrouter"]);
    }

    #[test]
    fn only_gemini_supports_thinking() {
        let registry = AgentRegistry::builtin();
        let thinking: Vec<&str> = registry
            .descriptors()
            .iter()
            .filter(|d| d.supports_thinking)
            .map(|d| d.key)
            .collect();
        assert_eq!(thinking, vec!["gemini"]);
    }

    #[test]
    fn list_available_filters_by_credential() {
        let registry = AgentRegistry::builtin();
        let available = registry.list_available(lookup_from(&["GOOGLE_API_KEY", "OPENROUTER_API_KEY"]));
        let keys: Vec<&str> = available.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["gemini", "openrouter"]);
    }

    #[test]
    fn empty_credentials_do_not_count() {
        let registry = AgentRegistry::builtin();
        let available = registry.list_available(|_| Some(String::new()));
        assert!(available.is_empty());
        assert!(registry.first_available(|_| Some(String::new())).is_none());
    }

    #[test]
    fn first_available_returns_credential() {
        let registry = AgentRegistry::builtin();
        let (descriptor, key) = registry
            .first_available(lookup_from(&["TOGETHER_API_KEY", "ANTHROPIC_API_KEY"]))
            .unwrap();
        assert_eq!(descriptor.key, "anthropic");
        assert_eq!(key, "key-for-ANTHROPIC_API_KEY");
    }

    #[test]
    fn get_unknown_model_fails() {
        let registry = AgentRegistry::builtin();
        assert!(matches!(registry.get("llama"), Err(ChatError::UnknownModel(_))));
    }

    #[test]
    fn instantiate_every_builtin() {
        let registry = AgentRegistry::builtin();
        for descriptor in registry.descriptors() {
            let agent = registry.instantiate(descriptor, "test-key").unwrap();
            assert_eq!(agent.model_name(), (descriptor.defaults)().model);
        }
    }

    #[test]
    fn instantiate_with_overrides_model() {
        let registry = AgentRegistry::builtin();
        let descriptor = registry.get("openrouter").unwrap();
        let config = (descriptor.defaults)().with_model("anthropic/claude-3.5-sonnet");
        let agent = descriptor.instantiate_with("k", config).unwrap();
        assert_eq!(agent.model_name(), "anthropic/claude-3.5-sonnet");
    }

    #[test]
    fn register_replaces_same_key() {
        let mock = AgentDescriptor {
            key: "openai",
            display_name: "Mock",
            provider_name: "Mock",
            description: "scripted",
            credential_key: "MOCK_KEY",
            supports_thinking: false,
            defaults: || AgentConfig::new("mock-model", "http://localhost"),
            factory: |_, cfg| Ok(Box::new(MockAgent::new(MockConfig::new().with_model(cfg.model)))),
        };
        let registry = AgentRegistry::builtin().register(mock);
        assert_eq!(registry.descriptors().len(), 5);
        assert_eq!(registry.get("openai").unwrap().display_name, "Mock");
    }
}

//! Chat session: one selected agent, a display history, and the
//! interactive prompt loop.

use std::io::{self, BufRead, Write};

use futures::StreamExt;
use tc_backend::{AgentDescriptor, AgentRegistry, StreamingChatAgent};
use tc_protocol::{ChatHistory, ChatSnapshot, ChatTurn};
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::render::Renderer;
use crate::style::Style;

pub struct ChatSession {
    registry: AgentRegistry,
    config: Config,
    agent: Box<dyn StreamingChatAgent>,
    key: String,
    supports_thinking: bool,
    history: ChatHistory,
    style: Style,
}

impl ChatSession {
    /// Select a model and build its agent.
    ///
    /// An explicit `model` wins, then `chat.default_model`, then the first
    /// registered model that has a credential.
    pub fn start(
        registry: AgentRegistry,
        config: Config,
        model: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let requested = model
            .map(str::to_string)
            .or_else(|| config.chat.default_model.clone());

        let (descriptor, credential) = match requested {
            Some(key) => {
                let descriptor = registry.get(&key)?.clone();
                let credential = config.resolve_credential(&descriptor).ok_or_else(|| {
                    ConfigError::MissingCredential {
                        model: key.clone(),
                        env: descriptor.credential_key.to_string(),
                    }
                })?;
                (descriptor, credential)
            }
            None => {
                let found = registry
                    .first_available(config.credential_lookup(&registry))
                    .map(|(d, cred)| (d.clone(), cred));
                found.ok_or_else(|| ConfigError::NoCredentials(credential_names(&registry)))?
            }
        };

        let agent = descriptor.instantiate_with(credential, config.agent_config(&descriptor))?;
        info!(model = descriptor.key, name = agent.model_name(), "selected model");
        Ok(Self {
            key: descriptor.key.to_string(),
            supports_thinking: descriptor.supports_thinking,
            registry,
            config,
            agent,
            history: ChatHistory::new(),
            style: Style::new(),
        })
    }

    /// Session around an already-built agent.
    pub fn with_agent(
        registry: AgentRegistry,
        config: Config,
        key: impl Into<String>,
        agent: Box<dyn StreamingChatAgent>,
        supports_thinking: bool,
    ) -> Self {
        Self {
            registry,
            config,
            agent,
            key: key.into(),
            supports_thinking,
            history: ChatHistory::new(),
            style: Style::new(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Registry key of the current model.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn model_name(&self) -> &str {
        self.agent.model_name()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Switch to another model. The current agent stays on failure.
    pub fn select(&mut self, key: &str) -> Result<(), ConfigError> {
        let descriptor = self.registry.get(key)?;
        let credential = self.config.resolve_credential(descriptor).ok_or_else(|| {
            ConfigError::MissingCredential {
                model: key.to_string(),
                env: descriptor.credential_key.to_string(),
            }
        })?;
        let agent = descriptor.instantiate_with(credential, self.config.agent_config(descriptor))?;
        self.supports_thinking = descriptor.supports_thinking;
        self.key = descriptor.key.to_string();
        self.agent = agent;
        info!(model = %self.key, name = self.agent.model_name(), "switched model");
        Ok(())
    }

    /// Stream one reply to `out` and record the turn.
    pub async fn ask<W: Write>(&mut self, prompt: &str, out: &mut W) -> io::Result<ChatSnapshot> {
        self.history.push(ChatTurn::user(prompt));

        let mut renderer = Renderer::new(&mut *out, self.style, self.supports_thinking);
        let mut stream = self.agent.stream_chat(prompt);
        let mut last = ChatSnapshot::default();
        let mut count = 0usize;
        while let Some(snapshot) = stream.next().await {
            renderer.update(&snapshot)?;
            last = snapshot;
            count += 1;
        }
        renderer.finish()?;
        debug!(snapshots = count, "reply finished");
        if last.is_empty() {
            writeln!(out, "{}", self.style.paint(self.style.thinking_start(), "(empty reply)"))?;
        }

        self.history
            .push(ChatTurn::assistant(last.clone(), self.agent.model_name()));
        Ok(last)
    }

    /// Read prompts line by line until EOF or `/quit`.
    pub async fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(
                out,
                "{} ",
                self.style
                    .paint(self.style.label_start(), &format!("{}>", self.key))
            )?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            let prompt = line.trim();
            if prompt.is_empty() {
                continue;
            }

            match parse_command(prompt) {
                Some(Command::Quit) => return Ok(()),
                Some(Command::Model(None)) => {
                    writeln!(out, "current model: {} ({})", self.key, self.model_name())?;
                }
                Some(Command::Model(Some(key))) => match self.select(key) {
                    Ok(()) => writeln!(out, "switched to {} ({})", self.key, self.model_name())?,
                    Err(e) => writeln!(out, "{}", self.style.paint(self.style.error_start(), &e.to_string()))?,
                },
                Some(Command::Models) => {
                    write_model_list(&self.registry, &self.config, self.style, out)?;
                }
                Some(Command::Clear) => {
                    self.history.clear();
                    writeln!(out, "history cleared")?;
                }
                Some(Command::Help) => write_help(out)?,
                None => {
                    self.ask(prompt, out).await?;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Model(Option<&'a str>),
    Models,
    Clear,
    Help,
}

/// Lines starting with `/` are commands. Unknown commands show help.
fn parse_command(line: &str) -> Option<Command<'_>> {
    let rest = line.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let command = match parts.next().unwrap_or("") {
        "quit" | "exit" => Command::Quit,
        "model" => Command::Model(parts.next()),
        "models" => Command::Models,
        "clear" => Command::Clear,
        _ => Command::Help,
    };
    Some(command)
}

fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "commands:")?;
    writeln!(out, "  /model [key]  show or switch the model")?;
    writeln!(out, "  /models       list models and credential status")?;
    writeln!(out, "  /clear        clear the history")?;
    writeln!(out, "  /quit         leave")
}

fn credential_names(registry: &AgentRegistry) -> String {
    registry
        .descriptors()
        .iter()
        .map(|d| d.credential_key)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per registered model, marked ✓ when a credential resolves.
pub fn write_model_list<W: Write>(
    registry: &AgentRegistry,
    config: &Config,
    style: Style,
    out: &mut W,
) -> io::Result<()> {
    let available = registry.list_available(config.credential_lookup(registry));
    for descriptor in registry.descriptors() {
        let has_key = available.iter().any(|d| d.key == descriptor.key);
        write_model_line(descriptor, has_key, style, out)?;
    }
    Ok(())
}

fn write_model_line<W: Write>(
    descriptor: &AgentDescriptor,
    available: bool,
    style: Style,
    out: &mut W,
) -> io::Result<()> {
    let mark = if available {
        style.paint(style.ok_start(), "✓")
    } else {
        style.paint(style.error_start(), "✗")
    };
    let thinking = if descriptor.supports_thinking {
        " [thinking]"
    } else {
        ""
    };
    writeln!(
        out,
        "{mark} {:<11} {} ({}){thinking}  {}",
        descriptor.key, descriptor.display_name, descriptor.provider_name, descriptor.credential_key
    )
}

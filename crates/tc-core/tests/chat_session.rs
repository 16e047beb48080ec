//! Config file to session to rendered output, with scripted agents in
//! place of the HTTP providers.

use std::io::Cursor;

use tc_backend::mock::fixtures;
use tc_backend::{AgentConfig, AgentDescriptor, AgentRegistry, MockAgent, MockConfig, MockFrame};
use tc_core::config::Config;
use tc_core::session::ChatSession;
use tc_core::style::Style;
use tc_protocol::ChatSnapshot;

fn registry() -> AgentRegistry {
    AgentRegistry::new()
        .register(AgentDescriptor {
            key: "plain",
            display_name: "Plain",
            provider_name: "Mock",
            description: "single-channel replies",
            credential_key: "TC_IT_UNSET_PLAIN",
            supports_thinking: false,
            defaults: || AgentConfig::new("plain-model", "http://localhost"),
            factory: |_, cfg| {
                Ok(Box::new(MockAgent::new(
                    fixtures::streaming_text(&["Hello", " world"]).with_model(cfg.model),
                )))
            },
        })
        .register(AgentDescriptor {
            key: "thinker",
            display_name: "Thinker",
            provider_name: "Mock",
            description: "thinking then answer",
            credential_key: "TC_IT_UNSET_THINKER",
            supports_thinking: true,
            defaults: || AgentConfig::new("thinker-model", "http://localhost"),
            factory: |_, cfg| {
                Ok(Box::new(MockAgent::new(
                    MockConfig::new().with_model(cfg.model).with_frames(vec![
                        MockFrame::Parts {
                            parts: vec!["Let me think...".to_string()],
                        },
                        MockFrame::Malformed {
                            raw: "{".to_string(),
                        },
                        MockFrame::Parts {
                            parts: vec![String::new(), "4".to_string()],
                        },
                        MockFrame::End,
                        MockFrame::Parts {
                            parts: vec!["never read".to_string()],
                        },
                    ]),
                )))
            },
        })
}

fn load(contents: &str) -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    Config::load(&path).unwrap()
}

#[tokio::test]
async fn default_model_from_config_file() {
    let config = load(
        r#"
[chat]
default_model = "thinker"

[providers.thinker]
api_key_cmd = "echo secret"
"#,
    );
    let mut session = ChatSession::start(registry(), config, None)
        .unwrap()
        .with_style(Style::disabled());
    assert_eq!(session.key(), "thinker");

    let mut out = Vec::new();
    let last = session.ask("What is 2+2?", &mut out).await.unwrap();

    assert_eq!(last, ChatSnapshot::new("Let me think...", "4"));
    assert_eq!(String::from_utf8(out).unwrap(), "Let me think...\n\n4\n");
}

#[tokio::test]
async fn interactive_switch_between_models() {
    let config = load(
        r#"
[providers.plain]
api_key_cmd = "echo a"

[providers.thinker]
api_key_cmd = "echo b"
"#,
    );
    let mut session = ChatSession::start(registry(), config, Some("plain"))
        .unwrap()
        .with_style(Style::disabled());

    let input = Cursor::new("hi\n/model thinker\nhi again\n/quit\n");
    let mut out = Vec::new();
    session.run_interactive(input, &mut out).await.unwrap();

    let turns = &session.history().turns;
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[1].content, "Hello world");
    assert_eq!(turns[1].model.as_deref(), Some("plain-model"));
    assert_eq!(turns[3].content, "4");
    assert_eq!(turns[3].thinking, "Let me think...");
    assert_eq!(turns[3].model.as_deref(), Some("thinker-model"));

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("switched to thinker (thinker-model)"));
}

#[tokio::test]
async fn unreachable_provider_renders_error_reply() {
    let registry = AgentRegistry::new().register(AgentDescriptor {
        key: "down",
        display_name: "Down",
        provider_name: "Mock",
        description: "always refuses",
        credential_key: "TC_IT_UNSET_DOWN",
        supports_thinking: false,
        defaults: || AgentConfig::new("down-model", "http://localhost"),
        factory: |_, _| Ok(Box::new(MockAgent::new(fixtures::connection_refused("refused")))),
    });
    let config = load("[providers.down]\napi_key_cmd = \"echo k\"\n");
    let mut session = ChatSession::start(registry, config, None)
        .unwrap()
        .with_style(Style::disabled());

    let mut out = Vec::new();
    let last = session.ask("hi", &mut out).await.unwrap();

    assert_eq!(last, ChatSnapshot::error("stream error: refused"));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Error generating response: stream error: refused\n"
    );
}

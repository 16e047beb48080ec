use std::io::{self, IsTerminal, Read};

use tc_backend::AgentRegistry;
use tc_core::config::{config_path, load_dotenv, Config};
use tc_core::logging;
use tc_core::session::{write_model_list, ChatSession};
use tc_core::style::Style;
use tracing::warn;

fn print_help() {
    println!("thinkchat: stream chat replies from several LLM providers");
    println!();
    println!("Usage:");
    println!("  thinkchat                      Interactive mode");
    println!("  thinkchat \"prompt\"             Ask once and exit");
    println!("  echo \"prompt\" | thinkchat      Ask once via stdin pipe");
    println!();
    println!("Options:");
    println!("  --model <key>   Model to use (see --list)");
    println!("  --list          List models and whether an API key is set");
    println!("  --version       Print version");
    println!("  --help          Print this help");
    println!();
    println!("Config: {}", config_path().display());
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("thinkchat {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let path = config_path();
    let (config, load_error) = match Config::load(&path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    logging::init(&config.logging);
    if let Some(e) = load_error {
        warn!("{e}; using defaults");
    }
    load_dotenv();

    let registry = AgentRegistry::builtin();

    if args.iter().any(|a| a == "--list") {
        let mut stdout = io::stdout();
        if let Err(e) = write_model_list(&registry, &config, Style::new(), &mut stdout) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let mut model = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--model" || arg == "-m" {
            match iter.next() {
                Some(key) => model = Some(key.clone()),
                None => {
                    eprintln!("error: --model needs a model key");
                    std::process::exit(2);
                }
            }
        } else if let Some(key) = arg.strip_prefix("--model=") {
            model = Some(key.to_string());
        } else if arg.starts_with('-') {
            eprintln!("error: unknown option {arg} (see --help)");
            std::process::exit(2);
        } else {
            positional.push(arg.clone());
        }
    }

    // One-shot mode: positional prompt or piped stdin
    let prompt = if !positional.is_empty() {
        Some(positional.join(" "))
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        if io::stdin().read_to_string(&mut buf).is_ok() && !buf.trim().is_empty() {
            Some(buf.trim().to_string())
        } else {
            None
        }
    } else {
        None
    };

    let mut session = match ChatSession::start(registry, config, model.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout();
    let result = match prompt {
        Some(prompt) => runtime
            .block_on(session.ask(&prompt, &mut stdout))
            .map(|_| ()),
        None => {
            let stdin = io::stdin();
            runtime.block_on(session.run_interactive(stdin.lock(), &mut stdout))
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

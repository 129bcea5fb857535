use std::io::{self, BufRead, StdinLock, Write};
use std::path::Path;

use anyhow::Context;
use codez::config::EnvConfig;
use coding_agent::app::{App, HostOps, Role};
use coding_agent::model::{EchoBackend, TextGenerator};
use conversation_memory::{
    ContextWindowBuilder, ConversationStore, InMemoryConversationStore, JsonlConversationStore,
    WordCountEstimator,
};
use mutation_engine::{Decision, MutationEngine};

const CONTENT_TERMINATOR: &str = "END";

/// Line-oriented terminal host: stdin for input, stdout for prompts.
struct Terminal<G> {
    lines: io::Lines<StdinLock<'static>>,
    generator: G,
    auto_confirm: bool,
}

impl<G: TextGenerator> Terminal<G> {
    fn new(generator: G, auto_confirm: bool) -> Self {
        Self {
            lines: io::stdin().lock().lines(),
            generator,
            auto_confirm,
        }
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        self.lines.next().transpose()
    }
}

impl<G: TextGenerator> HostOps for Terminal<G> {
    fn generate(&mut self, prompt: &str) -> Result<String, String> {
        self.generator
            .generate(prompt)
            .map_err(|error| format!("{error:#}"))
    }

    fn request_decision(&mut self, prompt: &str) -> io::Result<String> {
        println!("{prompt}");
        if self.auto_confirm {
            let answer = Decision::AcceptOnce.as_str();
            println!("> {answer} (AUTO_CONFIRM)");
            return Ok(answer.to_string());
        }

        self.read_line("> ")?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "input closed at permission prompt")
        })
    }

    fn read_content(&mut self, path: &Path) -> io::Result<String> {
        println!(
            "Enter the new content for {}. Finish with a line containing only {CONTENT_TERMINATOR}.",
            path.display()
        );

        let mut content = String::new();
        while let Some(line) = self.read_line("")? {
            if line == CONTENT_TERMINATOR {
                break;
            }
            content.push_str(&line);
            content.push('\n');
        }
        Ok(content)
    }
}

fn open_store(config: &EnvConfig, cwd: &Path) -> anyhow::Result<Box<dyn ConversationStore>> {
    if config.ephemeral {
        return Ok(Box::new(InMemoryConversationStore::new()));
    }

    let path = config.history_path_in(cwd);
    let store = JsonlConversationStore::open(&path)
        .with_context(|| format!("opening conversation history {}", path.display()))?;
    tracing::debug!(path = %path.display(), turns = store.len(), "conversation history loaded");
    Ok(Box::new(store))
}

fn main() -> anyhow::Result<()> {
    let config = EnvConfig::from_env();
    codez::logging::init(&config).context("initializing logging")?;

    let cwd = std::env::current_dir().context("resolving current directory")?;
    let store = open_store(&config, &cwd)?;
    let context = ContextWindowBuilder::new(WordCountEstimator::default(), config.token_budget);
    let engine = MutationEngine::new(config.backup_dir_in(&cwd))
        .with_workspace_root(&cwd)
        .context("resolving workspace root")?;

    let mut app = App::new(store, context, engine);
    let mut terminal = Terminal::new(EchoBackend, config.auto_confirm);

    println!(
        "codez: {} earlier turns loaded. Type /help for commands.",
        app.store().len()
    );

    let mut printed = 0;
    while !app.should_exit {
        let Some(line) = terminal
            .read_line(&format!("[{}]> ", app.mode))
            .context("reading input")?
        else {
            break;
        };

        app.on_submit(&line, &mut terminal);

        for message in &app.transcript[printed..] {
            match message.role {
                Role::User => {}
                Role::Assistant | Role::System => println!("{}", message.content),
            }
        }
        printed = app.transcript.len();
    }

    Ok(())
}

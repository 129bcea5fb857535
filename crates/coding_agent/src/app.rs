use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use conversation_memory::{ContextWindowBuilder, ConversationStore};
use mutation_engine::{remove_backup, DecisionSource, FileChange, MutationEngine, Operation};

use crate::commands::{parse_slash_command, SlashCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Conversation only; file commands are refused.
    Ask,
    Build,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(Self::Ask),
            "build" => Ok(Self::Build),
            _ => Err(format!("Invalid mode '{}'. Use: /mode ask or /mode build", input.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Everything the app needs from its surroundings: a model and a human.
pub trait HostOps {
    fn generate(&mut self, prompt: &str) -> Result<String, String>;

    /// Shows a permission prompt and returns the raw answer.
    fn request_decision(&mut self, prompt: &str) -> io::Result<String>;

    /// Collects the proposed full content for `/edit` and `/create`.
    fn read_content(&mut self, path: &Path) -> io::Result<String>;
}

struct HostDecisions<'a>(&'a mut dyn HostOps);

impl DecisionSource for HostDecisions<'_> {
    fn request_decision(&mut self, prompt: &str) -> io::Result<String> {
        self.0.request_decision(prompt)
    }
}

const HELP_TEXT: &str = "Commands:
  /help                 show this help
  /mode <ask|build>     switch mode (file commands need build mode)
  /edit <path>          propose new content for an existing file
  /create <path>        propose a new file
  /delete <path>        propose deleting a file
  /pending              list changes staged this build session
  /revert               revert the most recent applied change that has a backup
  /history              show recorded turns
  /context              show the context window sent with the next message
  /clear                forget the conversation history
  /quit                 exit";

pub struct App {
    pub mode: Mode,
    pub transcript: Vec<Message>,
    pub should_exit: bool,
    store: Box<dyn ConversationStore>,
    context: ContextWindowBuilder,
    engine: MutationEngine,
    staged: Vec<FileChange>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("mode", &self.mode)
            .field("turns", &self.store.len())
            .field("staged", &self.staged.len())
            .field("should_exit", &self.should_exit)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(
        store: Box<dyn ConversationStore>,
        context: ContextWindowBuilder,
        engine: MutationEngine,
    ) -> Self {
        Self {
            mode: Mode::Ask,
            transcript: Vec::new(),
            should_exit: false,
            store,
            context,
            engine,
            staged: Vec::new(),
        }
    }

    pub fn store(&self) -> &dyn ConversationStore {
        self.store.as_ref()
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    /// Changes proposed since build mode was entered, oldest first.
    pub fn staged_changes(&self) -> &[FileChange] {
        &self.staged
    }

    pub fn push_system_message(&mut self, content: impl Into<String>) {
        self.push_system(content.into());
    }

    /// Handles one line of input: a slash command or a message for the model.
    pub fn on_submit(&mut self, input: &str, host: &mut dyn HostOps) {
        let prompt = input.trim();
        if prompt.is_empty() {
            return;
        }

        if let Some(command) = parse_slash_command(prompt) {
            self.on_command(command, host);
            return;
        }

        self.on_message(prompt, host);
    }

    /// Switches mode. Leaving or entering build mode drops every approval and
    /// every staged change along with its backup.
    pub fn set_mode(&mut self, mode: Mode) -> String {
        if mode == self.mode {
            return format!("Already in {} mode.", mode.as_str().to_uppercase());
        }

        self.discard_build_session();
        self.mode = mode;
        tracing::info!(%mode, "mode switched");

        match mode {
            Mode::Build => {
                "Switched to BUILD mode. File changes are applied only with your permission."
                    .to_string()
            }
            Mode::Ask => "Switched to ASK mode. Files will not be changed.".to_string(),
        }
    }

    fn on_command(&mut self, command: SlashCommand, host: &mut dyn HostOps) {
        match command {
            SlashCommand::Help => self.push_system(HELP_TEXT.to_string()),
            SlashCommand::Mode(None) => {
                self.push_system(format!("Current mode: {}", self.mode.as_str().to_uppercase()));
            }
            SlashCommand::Mode(Some(requested)) => match requested.parse::<Mode>() {
                Ok(mode) => {
                    let message = self.set_mode(mode);
                    self.push_system(message);
                }
                Err(message) => self.push_system(message),
            },
            SlashCommand::Edit(path) => self.on_file_command(&path, Operation::Edit, host),
            SlashCommand::Create(path) => self.on_file_command(&path, Operation::Create, host),
            SlashCommand::Delete(path) => self.on_file_command(&path, Operation::Delete, host),
            SlashCommand::Pending => self.show_pending(),
            SlashCommand::Revert => self.revert_latest(),
            SlashCommand::History => self.show_history(),
            SlashCommand::Context => self.show_context(),
            SlashCommand::Clear => match self.store.clear() {
                Ok(()) => self.push_system("Conversation history cleared".to_string()),
                Err(error) => self.push_system(format!("Failed to clear history: {error}")),
            },
            SlashCommand::Quit => self.should_exit = true,
            SlashCommand::Usage(usage) => self.push_system(format!("Usage: {usage}")),
            SlashCommand::Unknown(command) => {
                self.push_system(format!("Unknown command: {command}"));
            }
        }
    }

    fn on_message(&mut self, message: &str, host: &mut dyn HostOps) {
        let context = self.context.build_prompt(self.store.as_ref());
        let prompt = if context.is_empty() {
            format!("User: {message}")
        } else {
            format!("{context}\n\nUser: {message}")
        };

        self.transcript.push(Message {
            role: Role::User,
            content: message.to_string(),
        });

        let response = match host.generate(&prompt) {
            Ok(response) => response,
            Err(error) => {
                self.push_system(format!("Generation failed: {error}"));
                return;
            }
        };

        if let Err(error) = self.store.add(message, &response) {
            self.push_system(format!("Failed to record turn: {error}"));
        }

        self.transcript.push(Message {
            role: Role::Assistant,
            content: response,
        });
    }

    fn on_file_command(&mut self, path: &str, operation: Operation, host: &mut dyn HostOps) {
        if self.mode != Mode::Build {
            self.push_system(format!(
                "Cannot {operation} files in ASK mode. Use /mode build first."
            ));
            return;
        }

        let content = match operation {
            Operation::Delete => String::new(),
            Operation::Edit | Operation::Create => match host.read_content(Path::new(path)) {
                Ok(content) => content,
                Err(error) => {
                    self.push_system(format!("Failed to read new content for {path}: {error}"));
                    return;
                }
            },
        };

        let change = match self.engine.propose(path, content, operation) {
            Ok(change) => change,
            Err(error) => {
                self.push_system(error.to_string());
                return;
            }
        };

        self.review_and_apply(change, host);
    }

    fn review_and_apply(&mut self, mut change: FileChange, host: &mut dyn HostOps) {
        let label = change.path().display().to_string();
        if change.is_noop() {
            self.push_system(format!("No changes to apply for {label}."));
            return;
        }

        if !self.engine.ledger().check(change.path()) {
            match self.engine.review(&change, &mut HostDecisions(&mut *host)) {
                Ok(true) => {}
                Ok(false) => {
                    self.push_system(format!("Change to {label} rejected."));
                    self.staged.push(change);
                    return;
                }
                Err(error) => {
                    self.push_system(format!("Change to {label} not applied: {error}"));
                    return;
                }
            }
        }

        match self.engine.apply(&mut change) {
            Ok(true) => self.push_system(format!("Applied {} to {label}.", change.operation())),
            Ok(false) => self.push_system(format!("Change to {label} was not applied.")),
            Err(error) => self.push_system(error.to_string()),
        }
        self.staged.push(change);
    }

    fn show_pending(&mut self) {
        if self.staged.is_empty() {
            self.push_system("No staged changes.".to_string());
            return;
        }

        let lines = self
            .staged
            .iter()
            .enumerate()
            .map(|(index, change)| {
                format!(
                    "{}. {} {} [{}]",
                    index + 1,
                    change.operation(),
                    change.path().display(),
                    if change.applied() { "applied" } else { "not applied" }
                )
            })
            .collect::<Vec<_>>();
        self.push_system(lines.join("\n"));
    }

    /// Reverts the newest applied change that has a backup. Created files
    /// have nothing to restore and are skipped.
    fn revert_latest(&mut self) {
        let Some(index) = self
            .staged
            .iter()
            .rposition(|change| change.applied() && change.backup_path().is_some())
        else {
            self.push_system("No applied change to revert.".to_string());
            return;
        };

        let change = &mut self.staged[index];
        let message = match self.engine.revert(change) {
            Ok(_) => format!("Reverted {}.", change.path().display()),
            Err(error) => error.to_string(),
        };
        self.push_system(message);
    }

    fn show_history(&mut self) {
        if self.store.is_empty() {
            self.push_system("No conversation history.".to_string());
            return;
        }

        let lines = self
            .store
            .list()
            .iter()
            .map(|turn| {
                format!(
                    "#{} User: {}\n   Model: {}",
                    turn.sequence(),
                    turn.user(),
                    turn.response()
                )
            })
            .collect::<Vec<_>>();
        self.push_system(lines.join("\n"));
    }

    fn show_context(&mut self) {
        let window = self.context.window(self.store.as_ref());
        let summary = format!(
            "Context: {} of {} turns, ~{} tokens (budget {})",
            window.sequences.len(),
            self.store.len(),
            window.estimated_tokens,
            self.context.budget()
        );
        self.push_system(summary);
    }

    fn discard_build_session(&mut self) {
        self.engine.reset_permissions();
        for mut change in self.staged.drain(..) {
            if let Err(error) = remove_backup(&mut change) {
                tracing::warn!(path = %change.path().display(), %error, "failed to remove backup");
            }
        }
    }

    fn push_system(&mut self, content: String) {
        self.transcript.push(Message {
            role: Role::System,
            content,
        });
    }
}

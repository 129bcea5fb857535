use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use coding_agent::app::{App, HostOps, Message, Mode, Role};
use coding_agent::model::{EchoBackend, TextGenerator};
use conversation_memory::{
    ContextWindowBuilder, ConversationStore, InMemoryConversationStore, JsonlConversationStore,
};
use mutation_engine::MutationEngine;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct HostSpy {
    prompts: Vec<String>,
    decisions: VecDeque<&'static str>,
    decision_prompts: Vec<String>,
    contents: VecDeque<&'static str>,
    fail_generation: bool,
}

impl HostSpy {
    fn answering(decisions: &[&'static str]) -> Self {
        Self {
            decisions: decisions.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn with_content(mut self, content: &'static str) -> Self {
        self.contents.push_back(content);
        self
    }
}

impl HostOps for HostSpy {
    fn generate(&mut self, prompt: &str) -> Result<String, String> {
        self.prompts.push(prompt.to_string());
        if self.fail_generation {
            return Err("backend offline".to_string());
        }
        EchoBackend.generate(prompt).map_err(|error| error.to_string())
    }

    fn request_decision(&mut self, prompt: &str) -> io::Result<String> {
        self.decision_prompts.push(prompt.to_string());
        self.decisions
            .pop_front()
            .map(str::to_string)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no answer scripted"))
    }

    fn read_content(&mut self, _path: &Path) -> io::Result<String> {
        self.contents
            .pop_front()
            .map(str::to_string)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no content scripted"))
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    fn app_with_store(&self, store: Box<dyn ConversationStore>, budget: usize) -> App {
        fs::create_dir_all(self.root()).expect("mkdir project");
        let engine = MutationEngine::new(self.dir.path().join("backups"))
            .with_workspace_root(self.root())
            .expect("workspace root");
        let words = |text: &str| text.split_whitespace().count();
        App::new(store, ContextWindowBuilder::new(words, budget), engine)
    }

    fn app(&self) -> App {
        self.app_with_store(Box::new(InMemoryConversationStore::new()), 3000)
    }

    fn file(&self, name: &str, content: &str) -> String {
        fs::create_dir_all(self.root()).expect("mkdir project");
        let path = self.root().join(name);
        fs::write(&path, content).expect("seed file");
        path.display().to_string()
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root().join(name)).expect("read file")
    }
}

fn last_system(app: &App) -> &str {
    app.transcript
        .iter()
        .rev()
        .find(|message| message.role == Role::System)
        .map(|message| message.content.as_str())
        .expect("system message")
}

#[test]
fn message_is_generated_and_recorded() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy::default();

    app.on_submit("  hello there ", &mut host);

    assert_eq!(host.prompts, vec!["User: hello there".to_string()]);
    assert_eq!(app.store().len(), 1);
    assert_eq!(app.store().list()[0].user(), "hello there");
    assert_eq!(
        app.transcript,
        vec![
            Message {
                role: Role::User,
                content: "hello there".to_string(),
            },
            Message {
                role: Role::Assistant,
                content: "Echo (0 earlier turns in context): hello there".to_string(),
            },
        ]
    );
}

#[test]
fn later_messages_carry_bounded_context() {
    let workspace = Workspace::new();
    let mut app = workspace.app_with_store(Box::new(InMemoryConversationStore::new()), 12);
    let mut host = HostSpy::default();

    app.on_submit("first question", &mut host);
    app.on_submit("second question", &mut host);
    app.on_submit("third", &mut host);

    let last = host.prompts.last().expect("prompt");
    assert!(last.ends_with("\n\nUser: third"), "{last}");
    assert!(last.contains("User: second question"), "{last}");
    assert!(!last.contains("first question"), "{last}");
}

#[test]
fn failed_generation_records_nothing() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy {
        fail_generation: true,
        ..HostSpy::default()
    };

    app.on_submit("anyone?", &mut host);

    assert!(app.store().is_empty());
    assert_eq!(last_system(&app), "Generation failed: backend offline");
}

#[test]
fn blank_input_is_ignored() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy::default();

    app.on_submit("   \n", &mut host);

    assert!(app.transcript.is_empty());
    assert!(host.prompts.is_empty());
}

#[test]
fn mode_switching_reports_current_state() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy::default();

    assert_eq!(app.mode, Mode::Ask);
    app.on_submit("/mode ask", &mut host);
    assert_eq!(last_system(&app), "Already in ASK mode.");

    app.on_submit("/mode BUILD", &mut host);
    assert_eq!(app.mode, Mode::Build);
    assert!(last_system(&app).starts_with("Switched to BUILD mode."));

    app.on_submit("/mode build", &mut host);
    assert_eq!(last_system(&app), "Already in BUILD mode.");

    app.on_submit("/mode turbo", &mut host);
    assert_eq!(app.mode, Mode::Build);
    assert!(last_system(&app).starts_with("Invalid mode 'turbo'"));
}

#[test]
fn file_commands_are_refused_in_ask_mode() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "a\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept once"]).with_content("b\n");

    app.on_submit(&format!("/edit {path}"), &mut host);

    assert_eq!(
        last_system(&app),
        "Cannot edit files in ASK mode. Use /mode build first."
    );
    assert!(host.decision_prompts.is_empty());
    assert_eq!(workspace.read("a.txt"), "a\n");
}

#[test]
fn accepted_edit_is_applied_and_revertible() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "old\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["show full", "accept once"]).with_content("new\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    assert_eq!(host.decision_prompts.len(), 2);
    assert!(host.decision_prompts[1].contains("-old\n+new"));
    assert_eq!(workspace.read("a.txt"), "new\n");
    assert!(last_system(&app).starts_with("Applied edit to"));

    app.on_submit("/pending", &mut host);
    assert!(last_system(&app).ends_with("a.txt [applied]"), "{}", last_system(&app));

    app.on_submit("/revert", &mut host);
    assert_eq!(workspace.read("a.txt"), "old\n");
    app.on_submit("/revert", &mut host);
    assert_eq!(last_system(&app), "No applied change to revert.");
}

#[test]
fn once_approval_does_not_carry_to_the_next_edit() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "v0\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept once", "reject"])
        .with_content("v1\n")
        .with_content("v2\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    assert_eq!(host.decision_prompts.len(), 2);
    assert_eq!(workspace.read("a.txt"), "v1\n");
    assert!(last_system(&app).contains("rejected"));
}

#[test]
fn accept_all_skips_later_prompts_for_that_file() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "v0\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept all"])
        .with_content("v1\n")
        .with_content("v2\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    assert_eq!(host.decision_prompts.len(), 1);
    assert_eq!(workspace.read("a.txt"), "v2\n");
}

#[test]
fn switching_mode_resets_permissions_and_staged_changes() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "v0\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept global", "reject"])
        .with_content("v1\n")
        .with_content("v2\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);
    let backup = app.staged_changes()[0]
        .backup_path()
        .expect("backup")
        .to_path_buf();
    assert!(backup.exists());

    app.on_submit("/mode ask", &mut host);
    assert!(app.staged_changes().is_empty());
    assert!(!backup.exists());
    assert!(!app.engine().ledger().is_global());

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);
    assert_eq!(host.decision_prompts.len(), 2);
    assert_eq!(workspace.read("a.txt"), "v1\n");
}

#[test]
fn create_and_delete_round_trip() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept_all", "accept all"]).with_content("fresh\n");
    let target = workspace.root().join("sub/new.txt").display().to_string();

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/create {target}"), &mut host);
    assert_eq!(workspace.read("sub/new.txt"), "fresh\n");

    app.on_submit(&format!("/delete {target}"), &mut host);
    assert!(!workspace.root().join("sub/new.txt").exists());

    app.on_submit("/revert", &mut host);
    assert_eq!(workspace.read("sub/new.txt"), "fresh\n");
}

#[test]
fn unchanged_content_needs_no_decision() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "same\n");
    let mut app = workspace.app();
    let mut host = HostSpy::default().with_content("same\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    assert!(host.decision_prompts.is_empty());
    assert!(last_system(&app).starts_with("No changes to apply"));
}

#[test]
fn invalid_decision_leaves_file_untouched() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "a\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["sure"]).with_content("b\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    assert!(last_system(&app).contains("unrecognized decision 'sure'"));
    assert_eq!(workspace.read("a.txt"), "a\n");
    assert!(app.staged_changes().is_empty());
}

#[test]
fn paths_outside_the_workspace_are_refused() {
    let workspace = Workspace::new();
    fs::write(workspace.dir.path().join("outside.txt"), "x\n").expect("seed outside");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept once"]).with_content("y\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit("/edit ../outside.txt", &mut host);

    assert!(last_system(&app).contains("escapes workspace root"));
    assert!(host.decision_prompts.is_empty());
}

#[test]
fn history_context_and_clear_commands() {
    let workspace = Workspace::new();
    let history = workspace.dir.path().join("history.jsonl");
    let store = JsonlConversationStore::open(&history).expect("open store");
    let mut app = workspace.app_with_store(Box::new(store), 3000);
    let mut host = HostSpy::default();

    app.on_submit("/history", &mut host);
    assert_eq!(last_system(&app), "No conversation history.");

    app.on_submit("one", &mut host);
    app.on_submit("two", &mut host);
    app.on_submit("/history", &mut host);
    assert!(last_system(&app).starts_with("#1 User: one"));

    app.on_submit("/context", &mut host);
    assert!(last_system(&app).starts_with("Context: 2 of 2 turns"));

    app.on_submit("/clear", &mut host);
    assert!(app.store().is_empty());
    let reopened = JsonlConversationStore::open(&history).expect("reopen");
    assert!(reopened.is_empty());
}

#[test]
fn quit_and_unknown_commands() {
    let workspace = Workspace::new();
    let mut app = workspace.app();
    let mut host = HostSpy::default();

    app.on_submit("/nope extra", &mut host);
    assert_eq!(last_system(&app), "Unknown command: /nope");

    app.on_submit("/edit", &mut host);
    assert_eq!(last_system(&app), "Usage: /edit <path>");

    app.on_submit("/quit", &mut host);
    assert!(app.should_exit);
}

#[test]
fn revert_skips_created_files_and_reaches_older_edits() {
    let workspace = Workspace::new();
    let edited = workspace.file("a.txt", "original\n");
    let created = workspace.root().join("b.txt").display().to_string();
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept all", "accept once"])
        .with_content("edited\n")
        .with_content("new file\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {edited}"), &mut host);
    app.on_submit(&format!("/create {created}"), &mut host);
    assert_eq!(workspace.read("b.txt"), "new file\n");

    app.on_submit("/revert", &mut host);
    assert_eq!(workspace.read("a.txt"), "original\n");
    assert!(last_system(&app).starts_with("Reverted"), "{}", last_system(&app));

    app.on_submit("/revert", &mut host);
    assert_eq!(last_system(&app), "No applied change to revert.");
    assert_eq!(workspace.read("b.txt"), "new file\n");
}

#[test]
fn repeated_edits_revert_back_to_the_original() {
    let workspace = Workspace::new();
    let path = workspace.file("a.txt", "original\n");
    let mut app = workspace.app();
    let mut host = HostSpy::answering(&["accept all"])
        .with_content("first\n")
        .with_content("second\n");

    app.on_submit("/mode build", &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);
    app.on_submit(&format!("/edit {path}"), &mut host);

    app.on_submit("/revert", &mut host);
    assert_eq!(workspace.read("a.txt"), "first\n");
    app.on_submit("/revert", &mut host);
    assert_eq!(workspace.read("a.txt"), "original\n");
}

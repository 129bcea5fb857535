#![allow(unused_imports)]

use codez::config::EnvConfig;
use codez::conversation_memory::{
    build_prompt, default_history_path, format_turn, select_window, ContextWindow,
    ContextWindowBuilder, ConversationStore, ConversationStoreError, InMemoryConversationStore,
    JsonlConversationStore, TokenEstimator, Turn, WordCountEstimator, DEFAULT_TOKEN_BUDGET,
};
use codez::mutation_engine::{
    backup_path_for, remove_backup, unified_diff, Decision, DecisionSource, FileChange,
    MutationEngine, MutationError, Operation, PermissionLedger, Scope, DEFAULT_PREVIEW_CHARS,
};

#[test]
fn public_api_exports_compile() {}

#[test]
fn facade_pieces_work_together() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = EnvConfig {
        history_path: Some(dir.path().join("h.jsonl")),
        ..EnvConfig::default()
    };

    let mut store =
        JsonlConversationStore::open(&config.history_path_in(dir.path())).expect("open store");
    store.add("ping", "pong").expect("add turn");

    let context = ContextWindowBuilder::new(WordCountEstimator::default(), config.token_budget);
    assert_eq!(context.build_prompt(&store), "User: ping\nModel: pong");

    let target = dir.path().join("notes.txt");
    std::fs::write(&target, "draft\n").expect("seed");
    let mut engine = MutationEngine::new(config.backup_dir_in(dir.path()));
    let mut change = engine
        .propose(&target, "final\n", Operation::Edit)
        .expect("propose");
    assert!(engine.resolve(&change, Decision::AcceptOnce));
    assert!(engine.apply(&mut change).expect("apply"));
    assert!(change
        .backup_path()
        .expect("backup")
        .starts_with(dir.path().join(".codez/backups")));
}

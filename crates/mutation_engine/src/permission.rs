use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Breadth of a mutation approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    None,
    /// One apply, then back to `None`.
    Once,
    /// Every apply to the path until revoked or reset.
    All,
    /// Every apply to every path until reset. Never stored per path.
    Global,
}

/// Per-path approvals plus a session-wide override.
///
/// Owned by a [`MutationEngine`](crate::MutationEngine); independent engines
/// never share approvals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionLedger {
    per_path: HashMap<PathBuf, Scope>,
    global: bool,
}

impl PermissionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn check(&self, path: &Path) -> bool {
        self.granting_scope(path).is_some()
    }

    /// The scope that would authorize a write to `path` right now.
    #[must_use]
    pub fn granting_scope(&self, path: &Path) -> Option<Scope> {
        if self.global {
            return Some(Scope::Global);
        }

        match self.scope(path) {
            scope @ (Scope::Once | Scope::All) => Some(scope),
            Scope::None | Scope::Global => None,
        }
    }

    /// Scope recorded for `path` alone, ignoring the global override.
    #[must_use]
    pub fn scope(&self, path: &Path) -> Scope {
        self.per_path.get(path).copied().unwrap_or(Scope::None)
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn grant(&mut self, path: &Path, scope: Scope) {
        match scope {
            Scope::Global => self.global = true,
            scope => {
                self.per_path.insert(path.to_path_buf(), scope);
            }
        }
    }

    pub fn revoke(&mut self, path: &Path) {
        self.per_path.insert(path.to_path_buf(), Scope::None);
    }

    /// Downgrades a `Once` grant for `path` to `None`. Returns whether one was
    /// consumed.
    pub fn consume_once(&mut self, path: &Path) -> bool {
        match self.per_path.get_mut(path) {
            Some(scope @ Scope::Once) => {
                *scope = Scope::None;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.per_path.clear();
        self.global = false;
    }
}

//! Error taxonomy and the diagnostics log for reported conditions.
//!
//! Fatal conditions are returned to the caller as `Err(StoreError)`.
//! Non-fatal ones are *reported*: logged through `tracing` and appended to
//! a bounded [`DiagnosticsLog`] so embedders and tests can inspect them.

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors and reportable conditions raised by the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown mutation type: {kind}")]
    UnknownMutation { kind: String },

    #[error("unknown action type: {kind}")]
    UnknownAction { kind: String },

    #[error("unknown getter: {kind}")]
    UnknownGetter { kind: String },

    #[error("invalid module definition at \"{path}\": {reason}")]
    InvalidModuleDefinition { path: String, reason: String },

    #[error("duplicate namespace {namespace} for the namespaced module {path}")]
    DuplicateNamespace { namespace: String, path: String },

    #[error("duplicate getter key: {kind}")]
    DuplicateGetterKey { kind: String },

    /// Direct assignment of the root state. Use `Store::replace_state`.
    #[error("use replace_state() to explicitly replace store state")]
    InvalidMutation,

    #[error("do not mutate store state outside mutation handlers (version {version})")]
    InvariantViolation { version: u64 },

    #[error("module \"{path}\" is not registered")]
    ModuleNotFound { path: String },

    #[error("cannot register the root module with register_module")]
    RootRegistration,

    #[error("trying to add a new module '{key}' on hot reloading, manual reload is needed")]
    HotReloadNewModule { key: String },

    #[error("invalid invocation: {reason}")]
    InvalidInvocation { reason: String },

    #[error("state field \"{key}\" was overridden by a module with the same name at \"{path}\"")]
    StateFieldOverridden { key: String, path: String },
}

impl StoreError {
    /// Short machine-readable tag, used as a structured log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::UnknownMutation { .. } => "unknown_mutation",
            StoreError::UnknownAction { .. } => "unknown_action",
            StoreError::UnknownGetter { .. } => "unknown_getter",
            StoreError::InvalidModuleDefinition { .. } => "invalid_module_definition",
            StoreError::DuplicateNamespace { .. } => "duplicate_namespace",
            StoreError::DuplicateGetterKey { .. } => "duplicate_getter_key",
            StoreError::InvalidMutation => "invalid_mutation",
            StoreError::InvariantViolation { .. } => "invariant_violation",
            StoreError::ModuleNotFound { .. } => "module_not_found",
            StoreError::RootRegistration => "root_registration",
            StoreError::HotReloadNewModule { .. } => "hot_reload_new_module",
            StoreError::InvalidInvocation { .. } => "invalid_invocation",
            StoreError::StateFieldOverridden { .. } => "state_field_overridden",
        }
    }

    /// Whether a reported occurrence is logged at warn rather than error level.
    fn is_warning(&self) -> bool {
        matches!(
            self,
            StoreError::StateFieldOverridden { .. } | StoreError::HotReloadNewModule { .. }
        )
    }
}

/// A reported, non-fatal condition.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub timestamp: SystemTime,
    pub error: StoreError,
}

/// Bounded ring of reported conditions, oldest evicted first.
pub struct DiagnosticsLog {
    capacity: usize,
    entries: Mutex<VecDeque<Diagnostic>>,
}

impl DiagnosticsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
        }
    }

    /// Log the condition and keep it in the ring.
    pub fn report(&self, error: StoreError) {
        if error.is_warning() {
            tracing::warn!(error_type = error.error_type(), "{}", error);
        } else {
            tracing::error!(error_type = error.error_type(), "{}", error);
        }

        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Diagnostic {
            timestamp: SystemTime::now(),
            error,
        });
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_entries_in_order() {
        let log = DiagnosticsLog::new(4);
        log.report(StoreError::UnknownAction {
            kind: "a".to_string(),
        });
        log.report(StoreError::InvalidMutation);

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].error.error_type(), "unknown_action");
        assert_eq!(entries[1].error, StoreError::InvalidMutation);
    }

    #[test]
    fn test_report_evicts_oldest_at_capacity() {
        let log = DiagnosticsLog::new(2);
        for kind in ["a", "b", "c"] {
            log.report(StoreError::UnknownMutation {
                kind: kind.to_string(),
            });
        }

        let kinds: Vec<String> = log
            .snapshot()
            .into_iter()
            .map(|d| d.error.to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["unknown mutation type: b", "unknown mutation type: c"]
        );
    }

    #[test]
    fn test_zero_capacity_only_logs() {
        let log = DiagnosticsLog::new(0);
        log.report(StoreError::InvalidMutation);
        assert!(log.snapshot().is_empty());
    }
}

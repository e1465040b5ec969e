//! This module contains the [`KeywordRegistry`] struct, the mutable table of
//! `(keyword, handler)` bindings from which matcher snapshots are compiled.

use std::fmt::Debug;
use std::sync::Arc;

use crate::action::ActionHandler;
use crate::automaton::KeywordAutomaton;

/// One `(keyword, handler)` pair, in registration order.
pub(crate) struct Binding {
    pub(crate) keyword: String,
    pub(crate) handler: Arc<dyn ActionHandler>,
}

/// The error type for [`KeywordRegistry::register`].
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The empty string matches everywhere and nowhere; it cannot be a keyword.
    #[error("the empty string cannot be registered as a keyword")]
    InvalidKeyword,
}

/// The mutable registry of `(keyword, handler)` bindings.
///
/// The registry is dirty-on-mutation: [`register`](KeywordRegistry::register)
/// and a successful [`deregister`](KeywordRegistry::deregister) invalidate the
/// cached automaton, and [`snapshot`](KeywordRegistry::snapshot) lazily
/// recompiles it. Streams hold the snapshot they captured at construction, so
/// the registry may be mutated freely while streams are in flight.
#[derive(Default)]
pub struct KeywordRegistry {
    bindings: Vec<Binding>,
    compiled: Option<Arc<KeywordAutomaton>>,
}

impl Debug for KeywordRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordRegistry")
            .field(
                "bindings",
                &self
                    .bindings
                    .iter()
                    .map(|binding| binding.keyword.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("compiled", &self.compiled.is_some())
            .finish()
    }
}

impl KeywordRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to `keyword`'s binding list.
    ///
    /// Multiple handlers may be bound to the same keyword; they run in
    /// registration order on every match of that keyword.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::InvalidKeyword`] when `keyword` is empty.
    pub fn register(
        &mut self,
        keyword: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), RegisterError> {
        let keyword = keyword.into();
        if keyword.is_empty() {
            return Err(RegisterError::InvalidKeyword);
        }
        if self
            .bindings
            .iter()
            .any(|binding| binding.keyword == keyword && Arc::ptr_eq(&binding.handler, &handler))
        {
            log::warn!(
                "handler registered more than once for keyword {:?}; \
                it will run once per binding on every match",
                keyword
            );
        }
        self.bindings.push(Binding { keyword, handler });
        self.compiled = None;
        Ok(())
    }

    /// Removes the first binding whose keyword equals `keyword` and whose
    /// handler is the same allocation as `handler`. No-op when no such binding
    /// exists.
    pub fn deregister(&mut self, keyword: &str, handler: &Arc<dyn ActionHandler>) {
        match self
            .bindings
            .iter()
            .position(|binding| binding.keyword == keyword && Arc::ptr_eq(&binding.handler, handler))
        {
            Some(index) => {
                self.bindings.remove(index);
                self.compiled = None;
            }
            None => log::debug!("deregister of {:?} matched no binding", keyword),
        }
    }

    /// Rebuilds the cached automaton if a mutation invalidated it; no-op
    /// otherwise. Safe to call any number of times.
    pub fn compile(&mut self) {
        let _ = self.snapshot();
    }

    /// Returns the compiled automaton, rebuilding it first if the registry is
    /// dirty. The handle is immutable; a processor captures it at construction
    /// and is unaffected by later registry mutation.
    pub fn snapshot(&mut self) -> Arc<KeywordAutomaton> {
        let bindings = &self.bindings;
        self.compiled
            .get_or_insert_with(|| {
                let automaton = KeywordAutomaton::compile(bindings);
                log::debug!(
                    "compiled keyword automaton: {} keywords, {} states",
                    automaton.keyword_count(),
                    automaton.state_count()
                );
                Arc::new(automaton)
            })
            .clone()
    }

    /// The char length of the longest registered keyword, 0 when the registry
    /// is empty.
    pub fn max_len(&self) -> usize {
        self.bindings
            .iter()
            .map(|binding| binding.keyword.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// The number of bindings, counting repeated registrations separately.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no binding is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

//! This module contains the [`ActionDecision`] type returned by match callbacks,
//! the [`ActionHandler`] trait that callbacks implement, and the [`ActionContext`]
//! view they observe.

use crate::history::History;

/// The boxed error type a failing [`ActionHandler`] returns.
///
/// A handler failure halts the stream and surfaces as
/// [`ProcessError::CallbackFailure`](crate::processor::ProcessError::CallbackFailure).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The decision an [`ActionHandler`] returns for a committed keyword match.
///
/// The replacement text travels inside the [`Replace`](ActionDecision::Replace)
/// variant itself, so a replacement can never be attached to a decision that
/// does not use one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDecision {
    /// Emit the matched keyword unchanged.
    Pass,
    /// Remove the matched keyword from the output.
    Drop,
    /// Remove the matched keyword and emit the carried text instead.
    /// The text may be empty.
    Replace(String),
    /// Emit the matched keyword, then terminate the stream.
    Halt,
    /// Enter segment-drop mode. The flag flips before the keyword itself is
    /// committed, so the opening keyword is swallowed by the segment it opens.
    ContinueDrop,
    /// Leave segment-drop mode. The flag flips before the keyword itself is
    /// committed, so the closing keyword is emitted.
    ContinuePass,
}

impl ActionDecision {
    /// Returns the payload-free [`ActionKind`] of this decision.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionDecision::Pass => ActionKind::Pass,
            ActionDecision::Drop => ActionKind::Drop,
            ActionDecision::Replace(_) => ActionKind::Replace,
            ActionDecision::Halt => ActionKind::Halt,
            ActionDecision::ContinueDrop => ActionKind::ContinueDrop,
            ActionDecision::ContinuePass => ActionKind::ContinuePass,
        }
    }
}

/// The payload-free mirror of [`ActionDecision`] used in history records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ActionKind {
    /// The matched keyword was emitted unchanged.
    Pass,
    /// The matched keyword was removed from the output.
    Drop,
    /// The matched keyword was replaced.
    Replace,
    /// The matched keyword was emitted and the stream terminated.
    Halt,
    /// Segment-drop mode was entered.
    ContinueDrop,
    /// Segment-drop mode was left.
    ContinuePass,
    /// A handler failed and the stream halted.
    Fault,
}

/// The read-only view a handler observes when its keyword matches.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    keyword: &'a str,
    buffer: &'a [char],
    absolute_pos: usize,
    history: &'a History,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        keyword: &'a str,
        buffer: &'a [char],
        absolute_pos: usize,
        history: &'a History,
    ) -> Self {
        Self {
            keyword,
            buffer,
            absolute_pos,
            history,
        }
    }

    /// The matched keyword.
    pub fn keyword(&self) -> &str {
        self.keyword
    }

    /// The characters currently buffered by the processor. At dispatch time
    /// this is exactly the matched span.
    pub fn buffer(&self) -> &[char] {
        self.buffer
    }

    /// The 1-based position of the last matched character within the input stream.
    pub fn absolute_pos(&self) -> usize {
        self.absolute_pos
    }

    /// The processor's history handle. All getters return empty views when the
    /// processor was built without history recording.
    pub fn history(&self) -> &History {
        self.history
    }
}

/// A callback bound to a keyword through
/// [`KeywordRegistry::register`](crate::registry::KeywordRegistry::register).
///
/// Handlers must be pure functions of their context: they may read the buffer
/// view and the history, but must not retain either beyond the call. Any
/// closure `Fn(&ActionContext) -> ActionDecision` is a handler; implement the
/// trait directly when the callback itself can fail.
pub trait ActionHandler: Send + Sync {
    /// Decides what to do with a committed keyword match.
    ///
    /// # Errors
    ///
    /// Returning an error halts the stream and surfaces as
    /// [`ProcessError::CallbackFailure`](crate::processor::ProcessError::CallbackFailure).
    fn on_match(&self, context: &ActionContext<'_>) -> Result<ActionDecision, HandlerError>;
}

impl<F> ActionHandler for F
where
    F: Fn(&ActionContext<'_>) -> ActionDecision + Send + Sync,
{
    fn on_match(&self, context: &ActionContext<'_>) -> Result<ActionDecision, HandlerError> {
        Ok(self(context))
    }
}

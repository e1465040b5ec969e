//! This module contains the [`StreamProcessor`] struct, the synchronous
//! per-character core of the pipeline.

use std::collections::VecDeque;
use std::sync::Arc;

use displaydoc::Display;

use crate::action::{ActionContext, ActionDecision, ActionKind, HandlerError};
use crate::automaton::{KeywordAutomaton, StateId, ROOT};
use crate::config::StreamOptions;
use crate::history::{ActionRecord, History};

/// Represents the stream state after a [`StreamProcessor::push_char`] call.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamStatus {
    /// The stream can accept more characters.
    Ongoing,
    /// A halt decision committed; all further input is discarded.
    Halted,
}

/// The characters released by one [`StreamProcessor::push_char`] call, plus
/// the stream state after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// The characters that became safe to release downstream, possibly empty.
    pub emitted: String,
    /// [`StreamStatus::Halted`] exactly when a halt has committed; the
    /// emitted characters of the halting step itself are still returned.
    pub status: StreamStatus,
}

/// The error type for [`StreamProcessor::push_char`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A handler returned an error. The stream is halted, the history has
    /// recorded an [`ActionKind::Fault`] action, and emissions returned by
    /// earlier calls stand.
    #[error("action handler for keyword {keyword:?} failed: {reason}")]
    CallbackFailure {
        /// The keyword whose handler failed.
        keyword: String,
        /// The error the handler returned.
        reason: HandlerError,
    },
}

/// The streaming matcher and decision engine.
///
/// The processor consumes one character at a time and releases output lazily:
/// no prefix of a registered keyword leaves the bounded lookahead buffer until
/// the automaton has proven it cannot belong to a match, or a match decision
/// has committed it. One instance drives one stream; it is fully synchronous
/// and single-threaded, while its captured [`KeywordAutomaton`] snapshot may
/// be shared by any number of processors across threads.
#[derive(Debug)]
pub struct StreamProcessor {
    keywords: Arc<KeywordAutomaton>,
    buffer: VecDeque<char>,
    state: StateId,
    absolute_pos: usize,
    segment_drop: bool,
    halted: bool,
    history: History,
}

impl StreamProcessor {
    /// Creates a processor over the given snapshot with default options
    /// (no history recording).
    pub fn new(keywords: Arc<KeywordAutomaton>) -> Self {
        Self::with_options(keywords, StreamOptions::default())
    }

    /// Creates a processor over the given snapshot. Only
    /// [`record_history`](StreamOptions::record_history) is interpreted here;
    /// the yield mode shapes output at the adapter level.
    pub fn with_options(keywords: Arc<KeywordAutomaton>, options: StreamOptions) -> Self {
        Self {
            keywords,
            buffer: VecDeque::new(),
            state: ROOT,
            absolute_pos: 0,
            segment_drop: false,
            halted: false,
            history: History::new(options.record_history),
        }
    }

    /// Consumes one input character and returns whatever output became safe
    /// to release.
    ///
    /// After a halt has committed, further calls discard their input and
    /// return an empty [`StepOutput`] with [`StreamStatus::Halted`].
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::CallbackFailure`] when a handler fails; the
    /// stream halts and the failing step releases nothing.
    pub fn push_char(&mut self, ch: char) -> Result<StepOutput, ProcessError> {
        if self.halted {
            return Ok(StepOutput {
                emitted: String::new(),
                status: StreamStatus::Halted,
            });
        }
        self.history.record_input(ch);
        self.absolute_pos += 1;

        let keywords = self.keywords.clone();
        if keywords.max_len() == 0 {
            // No keywords registered: the processor is a pass-through.
            let emitted = ch.to_string();
            self.history.record_output(&emitted);
            return Ok(StepOutput {
                emitted,
                status: StreamStatus::Ongoing,
            });
        }

        self.buffer.push_back(ch);
        self.state = keywords.next_state(self.state, ch);

        let mut emitted = String::new();
        let mut status = StreamStatus::Ongoing;
        if let Some(pattern) = keywords.leading_match(self.state) {
            let span = keywords.pattern_char_len(pattern);
            // The automaton has consumed the whole keyword, so the buffer
            // holds at least `span` characters; treat a shorter buffer as no
            // match.
            if self.buffer.len() >= span {
                let excess = self.buffer.len() - span;
                if self.segment_drop {
                    self.buffer.drain(..excess);
                } else {
                    emitted.extend(self.buffer.drain(..excess));
                }

                let decision = self.dispatch(&keywords, pattern)?;
                let kind = decision.kind();
                let mut replacement = None;
                match decision {
                    ActionDecision::Pass => self.drain_span(&mut emitted),
                    ActionDecision::Drop => {
                        self.buffer.clear();
                    }
                    ActionDecision::Replace(text) => {
                        self.buffer.clear();
                        if !self.segment_drop {
                            emitted.push_str(&text);
                        }
                        replacement = Some(text);
                    }
                    ActionDecision::Halt => {
                        self.drain_span(&mut emitted);
                        self.halted = true;
                        status = StreamStatus::Halted;
                    }
                    ActionDecision::ContinueDrop => {
                        self.segment_drop = true;
                        self.drain_span(&mut emitted);
                    }
                    ActionDecision::ContinuePass => {
                        self.segment_drop = false;
                        self.drain_span(&mut emitted);
                    }
                }
                self.history.record_action(ActionRecord {
                    position: self.absolute_pos,
                    keyword: keywords.pattern_text(pattern).to_string(),
                    kind,
                    replacement,
                });
                self.state = ROOT;
            }
        }

        // The leftmost characters beyond the lookahead bound can no longer be
        // part of any match; release them.
        if self.buffer.len() > keywords.max_len() {
            let excess = self.buffer.len() - keywords.max_len();
            if self.segment_drop {
                self.buffer.drain(..excess);
            } else {
                emitted.extend(self.buffer.drain(..excess));
            }
        }

        self.history.record_output(&emitted);
        Ok(StepOutput { emitted, status })
    }

    /// Releases or discards every still-buffered character, according to the
    /// current segment mode. Call once the producer has ended. Idempotent, and
    /// returns an empty string after a halt.
    pub fn flush(&mut self) -> String {
        let mut emitted = String::new();
        if self.segment_drop {
            self.buffer.clear();
        } else {
            emitted.extend(self.buffer.drain(..));
        }
        self.state = ROOT;
        self.history.record_output(&emitted);
        emitted
    }

    /// The number of input characters consumed so far.
    pub fn absolute_pos(&self) -> usize {
        self.absolute_pos
    }

    /// Whether a halt has committed.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The number of characters currently withheld in the lookahead buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// The history of this stream. Empty views unless the processor was built
    /// with [`record_history`](StreamOptions::record_history) set.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Commits the matched span at the buffer's tail: emitted unless the
    /// stream is inside a dropped segment.
    fn drain_span(&mut self, emitted: &mut String) {
        if self.segment_drop {
            self.buffer.clear();
        } else {
            emitted.extend(self.buffer.drain(..));
        }
    }

    /// Runs every handler bound to `pattern` in registration order and
    /// resolves their decisions: the last decision wins, except that any halt
    /// among them forces a halt.
    fn dispatch(
        &mut self,
        keywords: &KeywordAutomaton,
        pattern: u32,
    ) -> Result<ActionDecision, ProcessError> {
        let mut resolved = None;
        let mut halt = false;
        let mut failure = None;
        {
            self.buffer.make_contiguous();
            let (span, _) = self.buffer.as_slices();
            let context = ActionContext::new(
                keywords.pattern_text(pattern),
                span,
                self.absolute_pos,
                &self.history,
            );
            for handler in keywords.handlers(pattern) {
                match handler.on_match(&context) {
                    Ok(decision) => {
                        if decision == ActionDecision::Halt {
                            halt = true;
                        }
                        resolved = Some(decision);
                    }
                    Err(reason) => {
                        failure = Some(reason);
                        break;
                    }
                }
            }
        }
        if let Some(reason) = failure {
            self.halted = true;
            self.buffer.clear();
            self.state = ROOT;
            let keyword = keywords.pattern_text(pattern).to_string();
            self.history.record_action(ActionRecord {
                position: self.absolute_pos,
                keyword: keyword.clone(),
                kind: ActionKind::Fault,
                replacement: None,
            });
            return Err(ProcessError::CallbackFailure { keyword, reason });
        }
        // A compiled pattern always carries at least one handler.
        let mut decision = resolved.unwrap_or(ActionDecision::Pass);
        if halt {
            decision = ActionDecision::Halt;
        }
        Ok(decision)
    }
}

//! This module contains the [`History`] substrate observable from match callbacks.

use crate::action::ActionKind;

/// One committed decision, recorded at the moment it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// 1-based position of the last matched character within the input stream.
    pub position: usize,
    /// The matched keyword.
    pub keyword: String,
    /// The kind of the committed decision, or [`ActionKind::Fault`] when a
    /// handler failed.
    pub kind: ActionKind,
    /// The replacement text, present only for [`ActionKind::Replace`].
    pub replacement: Option<String>,
}

/// The three append-only sequences of a recording history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    inputs: String,
    outputs: String,
    actions: Vec<ActionRecord>,
}

impl Transcript {
    /// Every character the processor has consumed, in order.
    pub fn inputs(&self) -> &str {
        &self.inputs
    }

    /// Every character the processor has emitted downstream, in order.
    pub fn outputs(&self) -> &str {
        &self.outputs
    }

    /// Every committed decision, in commit order.
    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }
}

/// The history substrate of a [`StreamProcessor`](crate::processor::StreamProcessor).
///
/// The shape is fixed at processor construction: [`Recording`](History::Recording)
/// grows all three sequences, [`Null`](History::Null) ignores every record call
/// and returns empty views, costing nothing on the hot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    /// All three sequences grow as the stream is processed.
    Recording(Transcript),
    /// Recording is a no-op; all getters return empty views.
    Null,
}

impl History {
    pub(crate) fn new(record: bool) -> Self {
        if record {
            History::Recording(Transcript::default())
        } else {
            History::Null
        }
    }

    pub(crate) fn record_input(&mut self, ch: char) {
        if let History::Recording(transcript) = self {
            transcript.inputs.push(ch);
        }
    }

    pub(crate) fn record_output(&mut self, emitted: &str) {
        if let History::Recording(transcript) = self {
            transcript.outputs.push_str(emitted);
        }
    }

    pub(crate) fn record_action(&mut self, record: ActionRecord) {
        if let History::Recording(transcript) = self {
            transcript.actions.push(record);
        }
    }

    /// Every character the processor has consumed, in order. Empty for [`History::Null`].
    pub fn inputs(&self) -> &str {
        match self {
            History::Recording(transcript) => &transcript.inputs,
            History::Null => "",
        }
    }

    /// Every character the processor has emitted downstream, in order. Empty for [`History::Null`].
    pub fn outputs(&self) -> &str {
        match self {
            History::Recording(transcript) => &transcript.outputs,
            History::Null => "",
        }
    }

    /// Every committed decision, in commit order. Empty for [`History::Null`].
    pub fn actions(&self) -> &[ActionRecord] {
        match self {
            History::Recording(transcript) => &transcript.actions,
            History::Null => &[],
        }
    }

    /// Whether this history records anything at all.
    pub fn is_recording(&self) -> bool {
        matches!(self, History::Recording(_))
    }
}

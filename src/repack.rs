//! This module contains the [`Repacker`] struct, which reshapes the
//! processor's character output into yielded pieces without ever inspecting
//! content.

use serde::{Deserialize, Serialize};

/// How an adapter groups the processor's character output into yielded pieces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum YieldMode {
    /// Yield every released character as its own piece.
    Char,
    /// Yield the characters released during one upstream token as one piece;
    /// tokens that release nothing yield nothing.
    Token,
    /// Yield fixed-width pieces of exactly this many characters, accumulated
    /// across token boundaries; the tail piece at stream end may be shorter.
    /// The width must be at least 1.
    Chunk(usize),
}

/// The error type for [`Repacker`] and adapter creation.
#[derive(Debug, thiserror::Error)]
pub enum CreateRepackerError {
    /// The requested chunk width cannot produce any piece.
    #[error("chunk width must be at least 1 (got {0})")]
    InvalidChunkSize(usize),
}

/// Groups released characters into pieces according to a [`YieldMode`].
#[derive(Debug, Clone)]
pub struct Repacker {
    mode: YieldMode,
    pending: String,
}

impl Repacker {
    /// Creates a re-packer for the given mode.
    ///
    /// # Errors
    ///
    /// Returns [`CreateRepackerError::InvalidChunkSize`] for [`YieldMode::Chunk`]
    /// with width 0.
    pub fn new(mode: YieldMode) -> Result<Self, CreateRepackerError> {
        if let YieldMode::Chunk(0) = mode {
            return Err(CreateRepackerError::InvalidChunkSize(0));
        }
        Ok(Self {
            mode,
            pending: String::new(),
        })
    }

    /// Accepts characters released by the processor, appending any pieces that
    /// became complete to `out`.
    pub fn push(&mut self, emitted: &str, out: &mut Vec<String>) {
        match self.mode {
            YieldMode::Char => out.extend(emitted.chars().map(String::from)),
            YieldMode::Token => self.pending.push_str(emitted),
            YieldMode::Chunk(width) => {
                self.pending.push_str(emitted);
                self.drain_full_chunks(width, out);
            }
        }
    }

    /// Marks the end of one upstream token. In token mode this yields the
    /// accumulated piece; the other modes ignore token boundaries.
    pub fn end_token(&mut self, out: &mut Vec<String>) {
        if matches!(self.mode, YieldMode::Token) && !self.pending.is_empty() {
            out.push(std::mem::take(&mut self.pending));
        }
    }

    /// Marks the end of the producer, handing over the processor's flush
    /// `tail`. Any pending remainder is yielded first as a short piece, then
    /// the tail is re-packed on its own cadence.
    pub fn finish(&mut self, tail: &str, out: &mut Vec<String>) {
        match self.mode {
            YieldMode::Char => out.extend(tail.chars().map(String::from)),
            YieldMode::Token => {
                self.end_token(out);
                if !tail.is_empty() {
                    out.push(tail.to_string());
                }
            }
            YieldMode::Chunk(width) => {
                if !self.pending.is_empty() {
                    out.push(std::mem::take(&mut self.pending));
                }
                self.pending.push_str(tail);
                self.drain_full_chunks(width, out);
                if !self.pending.is_empty() {
                    out.push(std::mem::take(&mut self.pending));
                }
            }
        }
    }

    /// Slices exact `width`-character pieces off the front of the accumulator.
    /// Widths count chars, not bytes.
    fn drain_full_chunks(&mut self, width: usize, out: &mut Vec<String>) {
        loop {
            match self.pending.char_indices().nth(width) {
                Some((split, _)) => {
                    let rest = self.pending.split_off(split);
                    out.push(std::mem::replace(&mut self.pending, rest));
                }
                None => {
                    if !self.pending.is_empty() && self.pending.chars().count() == width {
                        out.push(std::mem::take(&mut self.pending));
                    }
                    return;
                }
            }
        }
    }
}

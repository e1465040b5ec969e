//! This module contains the adapters that wrap a producer of string tokens:
//! [`SanitizedTokens`] for synchronous iterators and [`SanitizedStream`] for
//! suspension-capable sources. Both drive the same synchronous
//! [`StreamProcessor`] core.

use std::collections::VecDeque;
#[cfg(feature = "async")]
use std::pin::Pin;
use std::sync::Arc;
#[cfg(feature = "async")]
use std::task::{Context, Poll};

#[cfg(feature = "async")]
use futures::Stream;

use crate::automaton::KeywordAutomaton;
use crate::config::StreamOptions;
use crate::processor::{ProcessError, StreamProcessor, StreamStatus};
use crate::repack::{CreateRepackerError, Repacker};

/// The producer-agnostic drive loop shared by both adapters.
#[derive(Debug)]
struct AdapterCore {
    processor: StreamProcessor,
    repacker: Repacker,
    ready: VecDeque<String>,
    failure: Option<ProcessError>,
    done: bool,
}

impl AdapterCore {
    fn new(
        keywords: Arc<KeywordAutomaton>,
        options: StreamOptions,
    ) -> Result<Self, CreateRepackerError> {
        Ok(Self {
            processor: StreamProcessor::with_options(keywords, options),
            repacker: Repacker::new(options.yield_mode)?,
            ready: VecDeque::new(),
            failure: None,
            done: false,
        })
    }

    /// Feeds one producer token character by character. Returns false once the
    /// stream has ended (halt or handler failure) and the producer must not be
    /// pulled again.
    fn feed_token(&mut self, token: &str) -> bool {
        let mut pieces = Vec::new();
        for ch in token.chars() {
            match self.processor.push_char(ch) {
                Ok(step) => {
                    self.repacker.push(&step.emitted, &mut pieces);
                    if step.status == StreamStatus::Halted {
                        self.finish_into(&mut pieces);
                        self.ready.extend(pieces);
                        return false;
                    }
                }
                Err(error) => {
                    // Pieces committed before the failing character still
                    // reach the consumer, then the error does.
                    self.ready.extend(pieces);
                    self.failure = Some(error);
                    self.done = true;
                    return false;
                }
            }
        }
        self.repacker.end_token(&mut pieces);
        self.ready.extend(pieces);
        true
    }

    /// Flushes the processor and finalizes the re-packer once the producer is
    /// exhausted.
    fn finish_stream(&mut self) {
        let mut pieces = Vec::new();
        self.finish_into(&mut pieces);
        self.ready.extend(pieces);
    }

    fn finish_into(&mut self, pieces: &mut Vec<String>) {
        let tail = self.processor.flush();
        self.repacker.finish(&tail, pieces);
        self.done = true;
    }

    /// The next already-determined item, or `None` when more producer input is
    /// needed.
    fn next_item(&mut self) -> Option<Option<Result<String, ProcessError>>> {
        if let Some(piece) = self.ready.pop_front() {
            return Some(Some(Ok(piece)));
        }
        if let Some(error) = self.failure.take() {
            return Some(Some(Err(error)));
        }
        if self.done {
            return Some(None);
        }
        None
    }
}

/// Sanitizes a synchronous producer of string tokens.
///
/// Wraps any `Iterator` whose items deref to `str` and yields re-packed
/// sanitized pieces. The producer is not pulled again after a halt or a
/// handler failure.
///
/// ```
/// use std::sync::Arc;
///
/// use streamsieve::{
///     ActionContext, ActionDecision, KeywordRegistry, SanitizedTokens, StreamOptions,
/// };
///
/// let mut registry = KeywordRegistry::new();
/// registry
///     .register("secret", Arc::new(|_: &ActionContext| ActionDecision::Drop))
///     .unwrap();
/// let producer = ["se", "cret stays out"].into_iter();
/// let sanitized = SanitizedTokens::new(registry.snapshot(), producer, StreamOptions::default())
///     .unwrap();
/// let output: String = sanitized.map(|piece| piece.unwrap()).collect();
/// assert_eq!(output, " stays out");
/// ```
pub struct SanitizedTokens<I> {
    core: AdapterCore,
    producer: Option<I>,
}

impl<I> SanitizedTokens<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    /// Creates the adapter over a compiled keyword snapshot and a token
    /// producer.
    ///
    /// # Errors
    ///
    /// Returns [`CreateRepackerError::InvalidChunkSize`] when the options ask
    /// for zero-width chunks.
    pub fn new(
        keywords: Arc<KeywordAutomaton>,
        producer: I,
        options: StreamOptions,
    ) -> Result<Self, CreateRepackerError> {
        Ok(Self {
            core: AdapterCore::new(keywords, options)?,
            producer: Some(producer),
        })
    }
}

impl<I> Iterator for SanitizedTokens<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<String, ProcessError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.core.next_item() {
                return item;
            }
            match self.producer.as_mut().and_then(Iterator::next) {
                Some(token) => {
                    if !self.core.feed_token(token.as_ref()) {
                        self.producer = None;
                    }
                }
                None => {
                    self.producer = None;
                    self.core.finish_stream();
                }
            }
        }
    }
}

/// Sanitizes a suspension-capable producer of string tokens.
///
/// Wraps any `futures` [`Stream`] whose items deref to `str` and yields
/// re-packed sanitized pieces. Suspension happens only between tokens; each
/// character is still processed to completion by the synchronous core. The
/// producer is dropped, cancelling it, after a halt or a handler failure.
#[cfg(feature = "async")]
pub struct SanitizedStream<S> {
    core: AdapterCore,
    producer: Option<S>,
}

#[cfg(feature = "async")]
impl<S> SanitizedStream<S>
where
    S: Stream + Unpin,
    S::Item: AsRef<str>,
{
    /// Creates the adapter over a compiled keyword snapshot and a token
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`CreateRepackerError::InvalidChunkSize`] when the options ask
    /// for zero-width chunks.
    pub fn new(
        keywords: Arc<KeywordAutomaton>,
        producer: S,
        options: StreamOptions,
    ) -> Result<Self, CreateRepackerError> {
        Ok(Self {
            core: AdapterCore::new(keywords, options)?,
            producer: Some(producer),
        })
    }
}

#[cfg(feature = "async")]
impl<S> Stream for SanitizedStream<S>
where
    S: Stream + Unpin,
    S::Item: AsRef<str>,
{
    type Item = Result<String, ProcessError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.core.next_item() {
                return Poll::Ready(item);
            }
            match this.producer.as_mut() {
                Some(producer) => match Pin::new(producer).poll_next(cx) {
                    Poll::Ready(Some(token)) => {
                        if !this.core.feed_token(token.as_ref()) {
                            this.producer = None;
                        }
                    }
                    Poll::Ready(None) => {
                        this.producer = None;
                        this.core.finish_stream();
                    }
                    Poll::Pending => return Poll::Pending,
                },
                None => this.core.finish_stream(),
            }
        }
    }
}

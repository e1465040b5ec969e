/*!
# Streamsieve

This crate sanitizes a live character stream, typically produced token by
token by a language model, against a user-supplied set of literal keywords.
Each keyword carries one or more callbacks; when a keyword matches, the
callbacks decide what happens to it: pass it through, drop it, replace it,
halt the stream, or toggle a continuous drop segment. Output is released
lazily with a strict prefix-safety guarantee: no prefix of a registered
keyword reaches the consumer until the engine has proven it does not belong
to a match.

Here is a quick example of how this crate works:

```rust
use std::sync::Arc;

use streamsieve::{ActionContext, ActionDecision, KeywordRegistry, SanitizedTokens, StreamOptions};

let mut registry = KeywordRegistry::new();
registry
    .register(
        "secret",
        Arc::new(|_: &ActionContext| ActionDecision::Replace("[redacted]".to_string())),
    )
    .unwrap();
// Keyword boundaries need not line up with token boundaries.
let producer = ["My se", "cret plan."].into_iter();
let sanitized = SanitizedTokens::new(registry.snapshot(), producer, StreamOptions::default())
    .unwrap();
let output: String = sanitized.map(|piece| piece.unwrap()).collect();
assert_eq!(output, "My [redacted] plan.");
```

# Overview

The pipeline is a four-stage linear dataflow:

1. [`KeywordRegistry`] owns the mutable `(keyword, callback)` bindings and
   lazily compiles them into an immutable [`KeywordAutomaton`] snapshot
   (an Aho-Corasick trie with failure links and materialized output sets).
2. [`StreamProcessor`] is the synchronous core: it consumes one character at
   a time, holds a lookahead buffer bounded by the longest keyword, and
   applies the resolved callback decision to every committed match.
3. [`Repacker`] reshapes the released characters into pieces according to a
   [`YieldMode`]: individual characters, one piece per upstream token, or
   fixed-width chunks.
4. [`SanitizedTokens`] (and, with the `async` feature, `SanitizedStream`)
   wrap an upstream producer of string tokens, drive the processor and the
   re-packer, and flush at producer end.

The processor can be driven directly when no producer wrapper fits:

```rust
use std::sync::Arc;

use streamsieve::{ActionContext, ActionDecision, KeywordRegistry, StreamProcessor, StreamStatus};

let mut registry = KeywordRegistry::new();
registry
    .register("stop", Arc::new(|_: &ActionContext| ActionDecision::Halt))
    .unwrap();
let mut processor = StreamProcessor::new(registry.snapshot());
let mut output = String::new();
let mut halted = false;
for ch in "abstopxyz".chars() {
    let step = processor.push_char(ch).unwrap();
    output.push_str(&step.emitted);
    if step.status == StreamStatus::Halted {
        halted = true;
        break;
    }
}
if !halted {
    output.push_str(&processor.flush());
}
assert!(halted);
assert_eq!(output, "abstop");
```

# Matching semantics

- Matching is over exact code points; no Unicode normalization is applied
  and patterns are literal strings, never regular expressions.
- When several keywords end at the same input position, the longest one wins
  and its callbacks run once; the consumed match cannot contribute to a
  later overlapping match.
- When several callbacks are bound to the winning keyword, they run in
  registration order and the last decision wins, except that any
  [`ActionDecision::Halt`] among them takes priority regardless of order.
- Inside a dropped segment, emission is suppressed but consumption and
  matching continue, so a [`ActionDecision::ContinuePass`] keyword can
  re-open the stream.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod action;
pub mod adapter;
pub mod automaton;
pub mod config;
pub mod history;
pub mod processor;
pub mod registry;
pub mod repack;

pub use action::ActionContext;
pub use action::ActionDecision;
pub use action::ActionHandler;
pub use action::ActionKind;
pub use action::HandlerError;
#[cfg(feature = "async")]
pub use adapter::SanitizedStream;
pub use adapter::SanitizedTokens;
pub use automaton::KeywordAutomaton;
pub use config::StreamOptions;
pub use history::ActionRecord;
pub use history::History;
pub use history::Transcript;
pub use processor::ProcessError;
pub use processor::StepOutput;
pub use processor::StreamProcessor;
pub use processor::StreamStatus;
pub use registry::KeywordRegistry;
pub use registry::RegisterError;
pub use repack::CreateRepackerError;
pub use repack::Repacker;
pub use repack::YieldMode;

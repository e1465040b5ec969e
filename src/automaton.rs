//! This module contains the [`KeywordAutomaton`] struct, the compiled
//! Aho-Corasick matcher a [`StreamProcessor`](crate::processor::StreamProcessor)
//! captures at construction.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;

use ahash::AHashMap;
use tinyvec::TinyVec;

use crate::action::ActionHandler;
use crate::registry::Binding;

pub(crate) type StateId = u32;
pub(crate) const ROOT: StateId = 0;

/// One node of the automaton: goto transitions, the failure link, and the
/// materialized output set.
#[derive(Clone, Default)]
struct Node {
    children: AHashMap<char, StateId>,
    fail: StateId,
    // Pattern ids of every keyword ending at this node or reachable over the
    // failure chain, sorted by descending char length, ties by registration
    // order. Materialized at compile time so the per-character step never
    // walks failure links for reporting.
    outputs: TinyVec<[u32; 4]>,
}

struct Pattern {
    text: String,
    char_len: usize,
    handlers: Vec<Arc<dyn ActionHandler>>,
}

/// An immutable compiled keyword set: the Aho-Corasick automaton plus the
/// handler lists bound to each keyword.
///
/// Obtained from [`KeywordRegistry::snapshot`](crate::registry::KeywordRegistry::snapshot)
/// and shared via [`Arc`]; a processor holds its snapshot for the duration of
/// one stream, so later registry mutation never affects an in-flight stream.
/// The snapshot is freely shareable across threads for reading.
pub struct KeywordAutomaton {
    nodes: Vec<Node>,
    patterns: Vec<Pattern>,
    max_len: usize,
}

impl Debug for KeywordAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordAutomaton")
            .field(
                "keywords",
                &self
                    .patterns
                    .iter()
                    .map(|pattern| pattern.text.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("states", &self.nodes.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl KeywordAutomaton {
    /// Compiles the bindings into a goto trie with failure links and
    /// materialized output sets.
    ///
    /// Unique keywords become pattern ids in first-registration order; the
    /// handlers of repeated registrations of the same keyword are collected
    /// onto that keyword's pattern in registration order.
    pub(crate) fn compile(bindings: &[Binding]) -> Self {
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut pattern_ids: AHashMap<&str, u32> = AHashMap::default();
        for binding in bindings {
            let id = *pattern_ids
                .entry(binding.keyword.as_str())
                .or_insert_with(|| {
                    patterns.push(Pattern {
                        text: binding.keyword.clone(),
                        char_len: binding.keyword.chars().count(),
                        handlers: Vec::new(),
                    });
                    (patterns.len() - 1) as u32
                });
            patterns[id as usize].handlers.push(binding.handler.clone());
        }
        let max_len = patterns
            .iter()
            .map(|pattern| pattern.char_len)
            .max()
            .unwrap_or(0);

        // Goto trie. Terminal nodes are annotated with their pattern id.
        let mut nodes = vec![Node::default()];
        for (id, pattern) in patterns.iter().enumerate() {
            let mut state = ROOT;
            for ch in pattern.text.chars() {
                state = match nodes[state as usize].children.get(&ch) {
                    Some(&next) => next,
                    None => {
                        let next = nodes.len() as StateId;
                        nodes.push(Node::default());
                        nodes[state as usize].children.insert(ch, next);
                        next
                    }
                };
            }
            nodes[state as usize].outputs.push(id as u32);
        }

        // Failure links, breadth first. The root fails to itself and its
        // children fail to the root; every other node reached by `ch` from a
        // parent fails to the node its parent's failure chain reaches on `ch`.
        let mut order = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();
        let root_children: Vec<StateId> = nodes[ROOT as usize].children.values().copied().collect();
        for child in root_children {
            nodes[child as usize].fail = ROOT;
            queue.push_back(child);
        }
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let transitions: Vec<(char, StateId)> = nodes[id as usize]
                .children
                .iter()
                .map(|(&ch, &next)| (ch, next))
                .collect();
            for (ch, next) in transitions {
                queue.push_back(next);
                let mut fail = nodes[id as usize].fail;
                loop {
                    if let Some(&target) = nodes[fail as usize].children.get(&ch) {
                        fail = target;
                        break;
                    }
                    if fail == ROOT {
                        break;
                    }
                    fail = nodes[fail as usize].fail;
                }
                nodes[next as usize].fail = fail;
            }
        }

        // Materialize output sets in breadth-first order so each failure
        // target is complete before the nodes that inherit from it. Keywords
        // are unique per pattern id and terminate at exactly one node, so the
        // merged sets stay duplicate-free.
        for &id in &order {
            let fail = nodes[id as usize].fail;
            if fail != id {
                let inherited = nodes[fail as usize].outputs.clone();
                nodes[id as usize].outputs.extend_from_slice(&inherited);
            }
            let outputs = &mut nodes[id as usize].outputs;
            outputs.sort_by(|&a, &b| {
                patterns[b as usize]
                    .char_len
                    .cmp(&patterns[a as usize].char_len)
                    .then(a.cmp(&b))
            });
        }

        Self {
            nodes,
            patterns,
            max_len,
        }
    }

    /// The number of distinct keywords in this automaton.
    pub fn keyword_count(&self) -> usize {
        self.patterns.len()
    }

    /// The number of automaton states, including the root.
    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    /// The char length of the longest keyword, 0 when no keyword is registered.
    /// This bounds the processor's lookahead buffer.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The registered keywords, in first-registration order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|pattern| pattern.text.as_str())
    }

    /// Advances `state` on `ch`, following failure links until a goto
    /// transition exists or the root is reached.
    pub(crate) fn next_state(&self, mut state: StateId, ch: char) -> StateId {
        loop {
            if let Some(&next) = self.nodes[state as usize].children.get(&ch) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.nodes[state as usize].fail;
        }
    }

    /// The longest keyword ending at `state`, if any.
    pub(crate) fn leading_match(&self, state: StateId) -> Option<u32> {
        self.nodes[state as usize].outputs.first().copied()
    }

    pub(crate) fn pattern_text(&self, pattern: u32) -> &str {
        &self.patterns[pattern as usize].text
    }

    pub(crate) fn pattern_char_len(&self, pattern: u32) -> usize {
        self.patterns[pattern as usize].char_len
    }

    pub(crate) fn handlers(&self, pattern: u32) -> &[Arc<dyn ActionHandler>] {
        &self.patterns[pattern as usize].handlers
    }
}

#[cfg(test)]

mod tests {
    use std::sync::Arc;

    use insta::assert_snapshot;
    use streamsieve::{
        ActionContext, ActionDecision, ActionHandler, ActionKind, CreateRepackerError,
        KeywordRegistry, ProcessError, RegisterError, Repacker, SanitizedTokens, StreamOptions,
        StreamProcessor, StreamStatus, YieldMode,
    };

    fn handler<F>(f: F) -> Arc<dyn ActionHandler>
    where
        F: Fn(&ActionContext<'_>) -> ActionDecision + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    /// Feeds `input` one character at a time, concatenating everything the
    /// processor releases. Returns the output and whether the stream halted.
    fn run_chars(processor: &mut StreamProcessor, input: &str) -> (String, bool) {
        let mut output = String::new();
        for ch in input.chars() {
            let step = processor.push_char(ch).unwrap();
            output.push_str(&step.emitted);
            if step.status == StreamStatus::Halted {
                return (output, true);
            }
        }
        (output, false)
    }

    fn collect_pieces<I>(adapter: SanitizedTokens<I>) -> Vec<String>
    where
        I: Iterator,
        I::Item: AsRef<str>,
    {
        adapter.map(|piece| piece.unwrap()).collect()
    }

    #[test]
    fn replace_inside_sentence() {
        let mut registry = KeywordRegistry::new();
        registry
            .register(
                "secret",
                handler(|_| ActionDecision::Replace("[R]".to_string())),
            )
            .unwrap();
        let adapter = SanitizedTokens::new(
            registry.snapshot(),
            ["My secret data."].into_iter(),
            StreamOptions::default(),
        )
        .unwrap();
        let output: String = collect_pieces(adapter).concat();
        assert_snapshot!(output, @"My [R] data.");
    }

    #[test]
    fn drop_then_halt() {
        let mut registry = KeywordRegistry::new();
        registry.register("foo", handler(|_| ActionDecision::Drop)).unwrap();
        registry.register("stop", handler(|_| ActionDecision::Halt)).unwrap();
        let adapter = SanitizedTokens::new(
            registry.snapshot(),
            ["afoobstopxyz"].into_iter(),
            StreamOptions::default(),
        )
        .unwrap();
        let pieces = collect_pieces(adapter);
        assert_eq!(pieces, vec!["a", "b", "s", "t", "o", "p"]);
    }

    #[test]
    fn chunk_repacking_across_tokens() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("ab", handler(|_| ActionDecision::Replace("Z".to_string())))
            .unwrap();
        let options = StreamOptions {
            yield_mode: YieldMode::Chunk(2),
            ..Default::default()
        };
        let adapter =
            SanitizedTokens::new(registry.snapshot(), ["a", "bcd"].into_iter(), options).unwrap();
        assert_eq!(collect_pieces(adapter), vec!["Z", "cd"]);
    }

    #[test]
    fn segment_drop_toggles() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("<thought>", handler(|_| ActionDecision::ContinueDrop))
            .unwrap();
        registry
            .register("</thought>", handler(|_| ActionDecision::ContinuePass))
            .unwrap();
        let adapter = SanitizedTokens::new(
            registry.snapshot(),
            ["hi <thought>x</thought>!"].into_iter(),
            StreamOptions::default(),
        )
        .unwrap();
        let output: String = collect_pieces(adapter).concat();
        assert_snapshot!(output, @"hi </thought>!");
    }

    #[test]
    fn handler_reads_history() {
        let mut registry = KeywordRegistry::new();
        registry
            .register(
                "x",
                handler(|context| {
                    ActionDecision::Replace(format!("<{}>", context.history().inputs()))
                }),
            )
            .unwrap();
        let options = StreamOptions {
            record_history: true,
            ..Default::default()
        };
        let mut processor = StreamProcessor::with_options(registry.snapshot(), options);
        let (mut output, halted) = run_chars(&mut processor, "abcx");
        assert!(!halted);
        output.push_str(&processor.flush());
        assert_eq!(output, "abc<abcx>");
    }

    #[test]
    fn empty_registry_is_passthrough() {
        let mut registry = KeywordRegistry::new();
        assert_eq!(registry.max_len(), 0);
        let mut processor = StreamProcessor::new(registry.snapshot());
        for ch in "hello".chars() {
            let step = processor.push_char(ch).unwrap();
            // No keyword means no buffering delay at all.
            assert_eq!(step.emitted, ch.to_string());
        }
        assert_eq!(processor.flush(), "");
        assert_eq!(processor.absolute_pos(), 5);
    }

    #[test]
    fn longest_match_wins() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("ab", handler(|_| ActionDecision::Replace("X".to_string())))
            .unwrap();
        registry
            .register("b", handler(|_| ActionDecision::Replace("Y".to_string())))
            .unwrap();
        let snapshot = registry.snapshot();

        let mut processor = StreamProcessor::new(snapshot.clone());
        let (mut output, _) = run_chars(&mut processor, "zab");
        output.push_str(&processor.flush());
        assert_eq!(output, "zX");

        let mut processor = StreamProcessor::new(snapshot);
        let (mut output, _) = run_chars(&mut processor, "cb");
        output.push_str(&processor.flush());
        assert_eq!(output, "cY");
    }

    #[test]
    fn matches_found_over_failure_links() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("abcd", handler(|_| ActionDecision::Replace("!".to_string())))
            .unwrap();
        registry.register("bc", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        // "bc" commits as soon as it is complete, so "abcd" can never finish.
        let (mut output, _) = run_chars(&mut processor, "abce");
        output.push_str(&processor.flush());
        assert_eq!(output, "ae");
    }

    #[test]
    fn consumed_match_cannot_overlap() {
        let mut registry = KeywordRegistry::new();
        registry.register("aa", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let (mut output, _) = run_chars(&mut processor, "aaa");
        output.push_str(&processor.flush());
        // The first two characters commit as one match; the third starts over.
        assert_eq!(output, "a");
    }

    #[test]
    fn halt_overrides_later_decisions() {
        let mut registry = KeywordRegistry::new();
        registry.register("k", handler(|_| ActionDecision::Halt)).unwrap();
        registry.register("k", handler(|_| ActionDecision::Pass)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let step = processor.push_char('k').unwrap();
        assert_eq!(step.emitted, "k");
        assert_eq!(step.status, StreamStatus::Halted);
        assert!(processor.is_halted());
    }

    #[test]
    fn last_decision_wins_without_halt() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("k", handler(|_| ActionDecision::Replace("A".to_string())))
            .unwrap();
        registry
            .register("k", handler(|_| ActionDecision::Replace("B".to_string())))
            .unwrap();
        let options = StreamOptions {
            record_history: true,
            ..Default::default()
        };
        let mut processor = StreamProcessor::with_options(registry.snapshot(), options);
        let step = processor.push_char('k').unwrap();
        assert_eq!(step.emitted, "B");
        let actions = processor.history().actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Replace);
        assert_eq!(actions[0].replacement.as_deref(), Some("B"));
        assert_eq!(actions[0].keyword, "k");
        assert_eq!(actions[0].position, 1);
    }

    #[test]
    fn keyword_prefix_is_withheld_until_flush() {
        let mut registry = KeywordRegistry::new();
        registry.register("secret", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let (output, halted) = run_chars(&mut processor, "sec");
        assert_eq!(output, "");
        assert!(!halted);
        assert_eq!(processor.buffered_len(), 3);
        assert_eq!(processor.flush(), "sec");
        // Flushing again releases nothing.
        assert_eq!(processor.flush(), "");
    }

    #[test]
    fn buffer_stays_within_longest_keyword() {
        let mut registry = KeywordRegistry::new();
        registry.register("abcd", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        for ch in "xxxxxxxxxxxxxxxxxxxx".chars() {
            processor.push_char(ch).unwrap();
            assert!(processor.buffered_len() <= 4);
        }
    }

    #[test]
    fn halted_stream_absorbs_input() {
        let mut registry = KeywordRegistry::new();
        registry.register("stop", handler(|_| ActionDecision::Halt)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let (output, halted) = run_chars(&mut processor, "stop");
        assert_eq!(output, "stop");
        assert!(halted);
        for ch in "more input".chars() {
            let step = processor.push_char(ch).unwrap();
            assert_eq!(step.emitted, "");
            assert_eq!(step.status, StreamStatus::Halted);
        }
        assert_eq!(processor.flush(), "");
    }

    #[test]
    fn no_match_output_equals_input() {
        let mut registry = KeywordRegistry::new();
        registry.register("zebra", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let input = "the quick brown fox jumps over the lazy dog.";
        let (mut output, _) = run_chars(&mut processor, input);
        output.push_str(&processor.flush());
        assert_eq!(output, input);
    }

    #[test]
    fn history_stays_consistent() {
        let mut registry = KeywordRegistry::new();
        registry.register("foo", handler(|_| ActionDecision::Drop)).unwrap();
        let options = StreamOptions {
            record_history: true,
            ..Default::default()
        };
        let mut processor = StreamProcessor::with_options(registry.snapshot(), options);
        let (mut output, _) = run_chars(&mut processor, "afoob");
        output.push_str(&processor.flush());
        assert_eq!(output, "ab");
        assert_eq!(processor.history().inputs(), "afoob");
        assert_eq!(processor.history().inputs().len(), processor.absolute_pos());
        // Outputs mirror exactly what the calls returned.
        assert_eq!(processor.history().outputs(), output);
        let actions = processor.history().actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].position, 4);
        assert_eq!(actions[0].keyword, "foo");
        assert_eq!(actions[0].kind, ActionKind::Drop);
        assert_eq!(actions[0].replacement, None);
    }

    #[test]
    fn null_history_records_nothing() {
        let mut registry = KeywordRegistry::new();
        registry.register("foo", handler(|_| ActionDecision::Drop)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        run_chars(&mut processor, "afoob");
        assert!(!processor.history().is_recording());
        assert_eq!(processor.history().inputs(), "");
        assert_eq!(processor.history().outputs(), "");
        assert!(processor.history().actions().is_empty());
    }

    #[test]
    fn empty_keyword_is_rejected() {
        let mut registry = KeywordRegistry::new();
        let result = registry.register("", handler(|_| ActionDecision::Pass));
        assert!(matches!(result, Err(RegisterError::InvalidKeyword)));
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_removes_first_matching_binding() {
        let first = handler(|_| ActionDecision::Replace("A".to_string()));
        let second = handler(|_| ActionDecision::Replace("B".to_string()));
        let mut registry = KeywordRegistry::new();
        registry.register("k", first.clone()).unwrap();
        registry.register("k", second.clone()).unwrap();
        assert_eq!(registry.binding_count(), 2);

        let mut processor = StreamProcessor::new(registry.snapshot());
        assert_eq!(processor.push_char('k').unwrap().emitted, "B");

        registry.deregister("k", &second);
        assert_eq!(registry.binding_count(), 1);
        let mut processor = StreamProcessor::new(registry.snapshot());
        assert_eq!(processor.push_char('k').unwrap().emitted, "A");

        // Unknown pairs are a no-op.
        registry.deregister("k", &second);
        registry.deregister("other", &first);
        assert_eq!(registry.binding_count(), 1);
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let mut registry = KeywordRegistry::new();
        registry.register("foo", handler(|_| ActionDecision::Drop)).unwrap();
        let earlier = registry.snapshot();
        registry.register("bar", handler(|_| ActionDecision::Drop)).unwrap();

        let mut processor = StreamProcessor::new(earlier);
        let (mut output, _) = run_chars(&mut processor, "foobar");
        output.push_str(&processor.flush());
        assert_eq!(output, "bar");

        let mut processor = StreamProcessor::new(registry.snapshot());
        let (mut output, _) = run_chars(&mut processor, "foobar");
        output.push_str(&processor.flush());
        assert_eq!(output, "");
    }

    #[test]
    fn compiled_automaton_reports_shape() {
        let mut registry = KeywordRegistry::new();
        registry.register("foo", handler(|_| ActionDecision::Drop)).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.max_len(), 3);
        assert_eq!(snapshot.keyword_count(), 1);
        assert_eq!(snapshot.keywords().collect::<Vec<_>>(), vec!["foo"]);
        assert_snapshot!(
            format!("{:?}", snapshot),
            @r#"KeywordAutomaton { keywords: ["foo"], states: 4, max_len: 3 }"#
        );
    }

    struct ExplodingHandler;

    impl ActionHandler for ExplodingHandler {
        fn on_match(
            &self,
            _context: &ActionContext<'_>,
        ) -> Result<ActionDecision, streamsieve::HandlerError> {
            Err("handler exploded".into())
        }
    }

    #[test]
    fn failing_handler_halts_the_stream() {
        let mut registry = KeywordRegistry::new();
        registry.register("boom", Arc::new(ExplodingHandler)).unwrap();
        let options = StreamOptions {
            record_history: true,
            ..Default::default()
        };
        let mut processor = StreamProcessor::with_options(registry.snapshot(), options);
        for ch in "boo".chars() {
            processor.push_char(ch).unwrap();
        }
        let error = processor.push_char('m').unwrap_err();
        match &error {
            ProcessError::CallbackFailure { keyword, .. } => assert_eq!(keyword, "boom"),
        }
        assert!(error.to_string().contains("handler exploded"));
        assert!(processor.is_halted());
        let actions = processor.history().actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Fault);
        assert_eq!(actions[0].keyword, "boom");
        // The stream is terminal from here on.
        let step = processor.push_char('z').unwrap();
        assert_eq!(step.emitted, "");
        assert_eq!(step.status, StreamStatus::Halted);
        assert_eq!(processor.flush(), "");
    }

    #[test]
    fn adapter_surfaces_handler_failure_once() {
        let mut registry = KeywordRegistry::new();
        registry.register("boom", Arc::new(ExplodingHandler)).unwrap();
        let mut adapter = SanitizedTokens::new(
            registry.snapshot(),
            ["boom", "never pulled"].into_iter(),
            StreamOptions::default(),
        )
        .unwrap();
        let first = adapter.next();
        assert!(matches!(
            first,
            Some(Err(ProcessError::CallbackFailure { .. }))
        ));
        assert!(adapter.next().is_none());
    }

    #[test]
    fn zero_width_chunks_are_rejected() {
        assert!(matches!(
            Repacker::new(YieldMode::Chunk(0)),
            Err(CreateRepackerError::InvalidChunkSize(0))
        ));
        let mut registry = KeywordRegistry::new();
        let options = StreamOptions {
            yield_mode: YieldMode::Chunk(0),
            ..Default::default()
        };
        let result = SanitizedTokens::new(registry.snapshot(), ["a"].into_iter(), options);
        assert!(matches!(
            result,
            Err(CreateRepackerError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn token_mode_yields_one_piece_per_token() {
        let mut registry = KeywordRegistry::new();
        registry.register("b", handler(|_| ActionDecision::Drop)).unwrap();
        let options = StreamOptions {
            yield_mode: YieldMode::Token,
            ..Default::default()
        };
        let adapter =
            SanitizedTokens::new(registry.snapshot(), ["ab", "cd"].into_iter(), options).unwrap();
        assert_eq!(collect_pieces(adapter), vec!["a", "c", "d"]);
    }

    #[test]
    fn char_mode_yields_single_characters() {
        let mut registry = KeywordRegistry::new();
        registry.register("zz", handler(|_| ActionDecision::Drop)).unwrap();
        let adapter = SanitizedTokens::new(
            registry.snapshot(),
            ["abc"].into_iter(),
            StreamOptions::default(),
        )
        .unwrap();
        assert_eq!(collect_pieces(adapter), vec!["a", "b", "c"]);
    }

    #[test]
    fn replacement_may_be_empty() {
        let mut registry = KeywordRegistry::new();
        registry
            .register("x", handler(|_| ActionDecision::Replace(String::new())))
            .unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let (mut output, _) = run_chars(&mut processor, "axb");
        output.push_str(&processor.flush());
        assert_eq!(output, "ab");
    }

    #[test]
    fn continue_pass_outside_a_dropped_segment_is_harmless() {
        let mut registry = KeywordRegistry::new();
        registry.register("on", handler(|_| ActionDecision::ContinuePass)).unwrap();
        let mut processor = StreamProcessor::new(registry.snapshot());
        let (mut output, _) = run_chars(&mut processor, "xony");
        output.push_str(&processor.flush());
        assert_eq!(output, "xony");
    }

    #[test]
    fn options_serialize_round_trip() {
        let options = StreamOptions::default();
        let encoded = serde_json::to_string(&options).unwrap();
        assert_eq!(encoded, r#"{"record_history":false,"yield_mode":"Char"}"#);
        let decoded: StreamOptions = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, options);

        let chunked = StreamOptions {
            record_history: true,
            yield_mode: YieldMode::Chunk(3),
        };
        let encoded = serde_json::to_string(&chunked).unwrap();
        assert_eq!(encoded, r#"{"record_history":true,"yield_mode":{"Chunk":3}}"#);
        let decoded: StreamOptions = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, chunked);
    }

    #[test]
    fn action_kind_displays_variant_names() {
        assert_eq!(ActionKind::ContinueDrop.to_string(), "ContinueDrop");
        assert_eq!(
            ActionDecision::Replace("r".to_string()).kind(),
            ActionKind::Replace
        );
    }

    #[cfg(feature = "async")]
    mod async_adapter {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use futures::executor::block_on;
        use futures::{stream, StreamExt};
        use streamsieve::SanitizedStream;

        use super::*;

        #[test]
        fn async_stream_sanitizes_across_tokens() {
            let mut registry = KeywordRegistry::new();
            registry
                .register(
                    "secret",
                    handler(|_| ActionDecision::Replace("[R]".to_string())),
                )
                .unwrap();
            let producer = stream::iter(["My se", "cret data."]);
            let sanitized =
                SanitizedStream::new(registry.snapshot(), producer, StreamOptions::default())
                    .unwrap();
            let pieces: Vec<_> = block_on(sanitized.collect::<Vec<_>>());
            let output: String = pieces.into_iter().map(|piece| piece.unwrap()).collect();
            assert_eq!(output, "My [R] data.");
        }

        #[test]
        fn halt_stops_pulling_the_producer() {
            let mut registry = KeywordRegistry::new();
            registry.register("stop", handler(|_| ActionDecision::Halt)).unwrap();
            let pulled = AtomicUsize::new(0);
            let producer = stream::iter(["st", "op", "zz", "zz"]).inspect(|_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            });
            let sanitized =
                SanitizedStream::new(registry.snapshot(), producer, StreamOptions::default())
                    .unwrap();
            let pieces: Vec<_> = block_on(sanitized.collect::<Vec<_>>());
            let output: String = pieces.into_iter().map(|piece| piece.unwrap()).collect();
            assert_eq!(output, "stop");
            assert_eq!(pulled.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn async_chunk_repacking_matches_sync() {
            let mut registry = KeywordRegistry::new();
            registry
                .register("ab", handler(|_| ActionDecision::Replace("Z".to_string())))
                .unwrap();
            let options = StreamOptions {
                yield_mode: YieldMode::Chunk(2),
                ..Default::default()
            };
            let producer = stream::iter(["a", "bcd"]);
            let sanitized = SanitizedStream::new(registry.snapshot(), producer, options).unwrap();
            let pieces: Vec<_> = block_on(sanitized.collect::<Vec<_>>());
            let pieces: Vec<String> = pieces.into_iter().map(|piece| piece.unwrap()).collect();
            assert_eq!(pieces, vec!["Z", "cd"]);
        }
    }
}

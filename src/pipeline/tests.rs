#[cfg(test)]
mod tests {
    use crate::pipeline::accumulate::{part_channel, PartAccumulator, PartEvent, Step};
    use crate::pipeline::event_map::{adapt_stream, replay_turn, EventEmitter, StreamAdapter};
    use crate::types::events::{FinishReason, PartKind, StreamEvent, Usage};
    use crate::types::message::{ContentPart, Message};
    use crate::types::result::TurnResult;
    use futures::StreamExt;
    use serde_json::{json, Map};

    fn feed(acc: &mut PartAccumulator, events: Vec<StreamEvent>) -> Step {
        let mut last = Step::Pending;
        for ev in events {
            last = acc.push(ev).unwrap();
        }
        last
    }

    fn hello_world_turn() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Start,
            StreamEvent::TextStart { index: 0 },
            StreamEvent::TextDelta {
                index: 0,
                delta: "Hello".into(),
            },
            StreamEvent::TextDelta {
                index: 0,
                delta: " world".into(),
            },
            StreamEvent::TextComplete { index: 0 },
            StreamEvent::Complete {
                finish_reason: FinishReason::Stop,
                usage: Usage::new(10, 20),
            },
        ]
    }

    #[test]
    fn test_accumulator_builds_text_message() {
        let mut acc = PartAccumulator::new();
        match feed(&mut acc, hello_world_turn()) {
            Step::Complete(out) => {
                assert_eq!(
                    out.message,
                    Message::assistant(vec![ContentPart::text("Hello world")])
                );
                assert_eq!(out.finish_reason, FinishReason::Stop);
                assert_eq!(out.usage, Usage::new(10, 20));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_accumulator_callbacks_carry_global_indices_across_turns() {
        let (observer, mut rx) = part_channel();
        let mut acc = PartAccumulator::with_observer(observer);

        feed(&mut acc, hello_world_turn());
        acc.begin_turn();
        feed(&mut acc, hello_world_turn());
        assert_eq!(acc.next_index(), 2);

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert_eq!(
            events[0],
            PartEvent::Start {
                index: 0,
                kind: PartKind::Text
            }
        );
        assert_eq!(
            events[2],
            PartEvent::Update {
                index: 0,
                kind: PartKind::Text,
                delta: " world".into(),
                accumulated: "Hello world".into(),
            }
        );
        assert_eq!(
            events[4],
            PartEvent::Start {
                index: 1,
                kind: PartKind::Text
            }
        );
        assert!(matches!(events[7], PartEvent::End { index: 1, .. }));
    }

    #[test]
    fn test_accumulator_rejects_reused_or_unknown_indices() {
        let mut acc = PartAccumulator::new();
        acc.push(StreamEvent::TextStart { index: 0 }).unwrap();
        acc.push(StreamEvent::TextComplete { index: 0 }).unwrap();
        assert!(acc.push(StreamEvent::TextStart { index: 0 }).is_err());
        assert!(acc
            .push(StreamEvent::TextDelta {
                index: 7,
                delta: "x".into()
            })
            .is_err());

        acc.push(StreamEvent::ThinkingStart {
            index: 1,
            redacted: false,
        })
        .unwrap();
        assert!(acc.push(StreamEvent::TextComplete { index: 1 }).is_err());
    }

    #[test]
    fn test_accumulator_error_discards_buffers() {
        let mut acc = PartAccumulator::new();
        let step = feed(
            &mut acc,
            vec![
                StreamEvent::Start,
                StreamEvent::TextStart { index: 0 },
                StreamEvent::TextDelta {
                    index: 0,
                    delta: "partial".into(),
                },
                StreamEvent::error("overloaded"),
            ],
        );
        assert_eq!(
            step,
            Step::Failed {
                message: "overloaded".into(),
                code: None
            }
        );
        assert!(acc.partial().is_none());
    }

    #[test]
    fn test_partial_synthesizes_open_parts_after_completed_ones() {
        let mut acc = PartAccumulator::new();
        feed(
            &mut acc,
            vec![
                StreamEvent::Start,
                StreamEvent::ThinkingStart {
                    index: 0,
                    redacted: false,
                },
                StreamEvent::ThinkingDelta {
                    index: 0,
                    delta: "plan".into(),
                },
                StreamEvent::ThinkingComplete { index: 0 },
                StreamEvent::ToolCallStart {
                    index: 1,
                    id: "call_1".into(),
                    name: "web_search".into(),
                },
            ],
        );
        let partial = acc.partial().unwrap();
        assert_eq!(
            partial.parts(),
            &[
                ContentPart::thinking("plan"),
                ContentPart::tool_call("call_1", "web_search", Map::new()),
            ]
        );
    }

    #[test]
    fn test_emitter_closes_previous_kind_before_opening_next() {
        let mut em = EventEmitter::new();
        em.thinking_delta("let me think");
        em.text_delta("Answer");
        em.text_delta(" here");
        em.open_tool_call(0, Some("call_1".into()), Some("web_search".into()));
        em.tool_arguments(0, "{\"q\":");
        em.tool_arguments(0, "\"test\"}");
        em.complete(FinishReason::FunctionCall, Usage::new(1, 2));

        let mut params = Map::new();
        params.insert("q".into(), json!("test"));
        assert_eq!(
            em.take(),
            vec![
                StreamEvent::Start,
                StreamEvent::ThinkingStart {
                    index: 0,
                    redacted: false
                },
                StreamEvent::ThinkingDelta {
                    index: 0,
                    delta: "let me think".into()
                },
                StreamEvent::ThinkingComplete { index: 0 },
                StreamEvent::TextStart { index: 1 },
                StreamEvent::TextDelta {
                    index: 1,
                    delta: "Answer".into()
                },
                StreamEvent::TextDelta {
                    index: 1,
                    delta: " here".into()
                },
                StreamEvent::TextComplete { index: 1 },
                StreamEvent::ToolCallStart {
                    index: 2,
                    id: "call_1".into(),
                    name: "web_search".into()
                },
                StreamEvent::ToolCallComplete {
                    index: 2,
                    parameters: params
                },
                StreamEvent::Complete {
                    finish_reason: FinishReason::FunctionCall,
                    usage: Usage::new(1, 2)
                },
            ]
        );
        assert!(em.is_finished());
    }

    #[test]
    fn test_emitter_turns_bad_arguments_into_error_event() {
        let mut em = EventEmitter::new();
        em.open_tool_call(0, Some("call_1".into()), Some("web_search".into()));
        em.tool_arguments(0, "{\"q\": tru");
        em.complete(FinishReason::FunctionCall, Usage::default());

        let events = em.take();
        assert!(matches!(events.last(), Some(StreamEvent::Error { code: Some(c), .. }) if c == "invalid_tool_arguments"));
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::ToolCallComplete { .. } | StreamEvent::Complete { .. })));
    }

    #[test]
    fn test_replayed_turn_accumulates_back_to_the_same_message() {
        let mut params = Map::new();
        params.insert("q".into(), json!("test"));
        let message = Message::assistant(vec![
            ContentPart::text("Searching"),
            ContentPart::tool_call("call_1", "web_search", params),
        ]);
        let events = replay_turn(TurnResult::Success {
            message: message.clone(),
            finish_reason: FinishReason::FunctionCall,
            usage: Usage::new(3, 4),
        });

        let mut acc = PartAccumulator::new();
        match feed(&mut acc, events) {
            Step::Complete(out) => assert_eq!(out.message, message),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    struct WordAdapter {
        emitter: EventEmitter,
    }

    impl StreamAdapter for WordAdapter {
        type Chunk = Option<&'static str>;

        fn handle(&mut self, chunk: Self::Chunk) -> Vec<StreamEvent> {
            match chunk {
                Some(word) => self.emitter.text_delta(word),
                None => self.emitter.complete(FinishReason::Stop, Usage::default()),
            }
            self.emitter.take()
        }
    }

    #[tokio::test]
    async fn test_adapt_stream_flattens_adapter_output() {
        let chunks = futures::stream::iter(vec![Some("a"), Some("b"), None]).map(Ok::<_, crate::Error>);
        let adapter = WordAdapter {
            emitter: EventEmitter::new(),
        };
        let events: Vec<_> = adapt_stream(Box::pin(chunks), adapter)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 6);
        assert_eq!(events[0], StreamEvent::Start);
        assert!(matches!(events[5], StreamEvent::Complete { .. }));
    }

    #[tokio::test]
    async fn test_adapt_stream_without_completion_signal_just_ends() {
        let chunks = futures::stream::iter(vec![Some("a")]).map(Ok::<_, crate::Error>);
        let adapter = WordAdapter {
            emitter: EventEmitter::new(),
        };
        let events: Vec<_> = adapt_stream(Box::pin(chunks), adapter)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert!(!events.iter().any(StreamEvent::is_terminal));
    }
}

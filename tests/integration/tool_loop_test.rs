//! Tool Loop Integration Tests
//!
//! The chain builder's bounded research loop: tool events, turn budget,
//! and what the model is sent on each turn.

use std::time::Duration;

use symptom_trace::services::pipeline::{ChainBuilder, EventSink};
use symptom_trace_core::{ToolCallLog, ToolCallStatus, TraceStreamEvent, MAX_TOOL_TURNS};
use symptom_trace_llm::{MessageContent, ToolCallMode};
use symptom_trace_tools::SEARCH_TOOL;

use crate::support::*;

fn analysis() -> symptom_trace_core::SymptomAnalysis {
    let mut analysis: symptom_trace_core::SymptomAnalysis =
        serde_json::from_str(&symptoms_json()).unwrap();
    analysis.raw_input = COMPOUND_INPUT.to_string();
    analysis
}

async fn build_with(
    builder: ChainBuilder,
) -> (
    symptom_trace::AppResult<symptom_trace::services::pipeline::ChainBuildOutput>,
    Vec<TraceStreamEvent>,
) {
    let (sink, rx) = EventSink::channel(256);
    let handle = tokio::spawn(async move {
        let result = builder.build(&analysis(), &sink).await;
        drop(sink);
        result
    });
    let events = collect(rx).await;
    (handle.await.unwrap(), events)
}

#[tokio::test]
async fn test_tool_calls_pair_calling_and_done() {
    let provider = ScriptedProvider::new(vec![
        Step::Respond(search_turn(1, &["ferritin fatigue", "pica iron deficiency"])),
        Step::Respond(text_response(chains_json())),
    ]);
    let tools = StubTools::new();
    let builder = ChainBuilder::new(provider.clone(), tools.clone(), TEST_TIMEOUT, 5);

    let (result, events) = build_with(builder).await;
    let output = result.unwrap();
    assert_eq!(output.turns, 2);
    assert_eq!(tools.executed(), 2);

    let mut log = ToolCallLog::new();
    for event in &events {
        log.apply(event);
    }
    let entries = log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].input, "ferritin fatigue");
    assert_eq!(entries[1].input, "pica iron deficiency");
    assert!(entries.iter().all(|e| e.tool == SEARCH_TOOL));
    assert!(entries.iter().all(|e| e.status == ToolCallStatus::Done));
    assert!(!log.has_pending());

    // Each call's `done` follows its own `calling`.
    let tool_events: Vec<(String, ToolCallStatus)> = events
        .iter()
        .filter_map(|e| match e {
            TraceStreamEvent::ToolCall { input, status, .. } => Some((input.clone(), *status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        tool_events,
        vec![
            ("ferritin fatigue".to_string(), ToolCallStatus::Calling),
            ("ferritin fatigue".to_string(), ToolCallStatus::Done),
            ("pica iron deficiency".to_string(), ToolCallStatus::Calling),
            ("pica iron deficiency".to_string(), ToolCallStatus::Done),
        ]
    );

    // Second turn carries the assistant request and the tool results.
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].messages.len(), 3);
    let results = &calls[1].messages[2].content;
    assert_eq!(
        results
            .iter()
            .filter(|c| matches!(c, MessageContent::ToolResult { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_turn_budget_caps_model_calls() {
    let mut steps: Vec<Step> = (1..=4)
        .map(|turn| Step::Respond(search_turn(turn, &["more research"])))
        .collect();
    // The last turn still asks for tools; the request is ignored.
    let mut last = search_turn(5, &["even more"]);
    last.content = Some(chains_json());
    steps.push(Step::Respond(last));
    // Never reached.
    steps.push(Step::Respond(text_response(chains_json())));

    let provider = ScriptedProvider::new(steps);
    let tools = StubTools::new();
    let builder = ChainBuilder::new(provider.clone(), tools.clone(), TEST_TIMEOUT, 5);

    let (result, events) = build_with(builder).await;
    let output = result.unwrap();
    assert_eq!(output.turns, 5);
    assert_eq!(output.chains.len(), 2);

    let calls = provider.calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(tools.executed(), 4);

    let modes: Vec<ToolCallMode> = calls.iter().map(|c| c.tool_call_mode).collect();
    assert_eq!(&modes[..4], &[ToolCallMode::Auto; 4]);
    assert_eq!(modes[4], ToolCallMode::None);
    assert!(calls.iter().all(|c| c.tool_count == 2));

    // The final turn is told to answer with what it has.
    let final_turn = calls[4].messages.last().unwrap();
    assert!(final_turn
        .content
        .iter()
        .any(|c| matches!(c, MessageContent::Text { .. })));
    assert!(!calls[3]
        .messages
        .last()
        .unwrap()
        .content
        .iter()
        .any(|c| matches!(c, MessageContent::Text { .. })));

    // Thinking from every turn, in order.
    assert!(output.thinking.starts_with("turn 1 reasoning"));
    assert!(output.thinking.ends_with("turn 5 reasoning"));
    let thinking_events = events
        .iter()
        .filter(|e| matches!(e, TraceStreamEvent::Thinking { .. }))
        .count();
    assert_eq!(thinking_events, 5);
    assert!(!events
        .iter()
        .any(|e| matches!(e, TraceStreamEvent::ToolCall { input, .. } if input == "even more")));
}

#[tokio::test]
async fn test_budget_above_cap_still_stops_at_five_turns() {
    // A model that never stops asking for research.
    let steps: Vec<Step> = (1..=10)
        .map(|turn| {
            let mut response = search_turn(turn, &["keep digging"]);
            response.content = Some(chains_json());
            Step::Respond(response)
        })
        .collect();
    let provider = ScriptedProvider::new(steps);
    let tools = StubTools::new();
    let builder = ChainBuilder::new(provider.clone(), tools.clone(), TEST_TIMEOUT, 10);

    let (result, _) = build_with(builder).await;
    let output = result.unwrap();

    assert_eq!(output.turns, MAX_TOOL_TURNS);
    assert_eq!(provider.calls().len(), MAX_TOOL_TURNS as usize);
    assert_eq!(tools.executed(), (MAX_TOOL_TURNS - 1) as usize);
    assert_eq!(
        provider.calls().last().unwrap().tool_call_mode,
        ToolCallMode::None
    );
}

#[tokio::test]
async fn test_budget_of_one_never_offers_tools() {
    let provider = ScriptedProvider::text(chains_json());
    let builder = ChainBuilder::new(provider.clone(), StubTools::new(), TEST_TIMEOUT, 1);

    let (result, _) = build_with(builder).await;
    assert_eq!(result.unwrap().turns, 1);
    assert_eq!(provider.calls()[0].tool_call_mode, ToolCallMode::None);
}

#[tokio::test]
async fn test_slow_tool_becomes_error_result_and_loop_continues() {
    let provider = ScriptedProvider::new(vec![
        Step::Respond(search_turn(1, &["slow query"])),
        Step::Respond(text_response(chains_json())),
    ]);
    let tools = StubTools::slow(Duration::from_secs(10));
    let builder = ChainBuilder::new(provider.clone(), tools, Duration::from_millis(50), 5);

    let (result, events) = build_with(builder).await;
    assert!(result.is_ok());

    let mut log = ToolCallLog::new();
    for event in &events {
        log.apply(event);
    }
    assert!(!log.has_pending());

    let calls = provider.calls();
    let is_error = calls[1].messages[2].content.iter().any(|c| {
        matches!(
            c,
            MessageContent::ToolResult {
                is_error: Some(true),
                ..
            }
        )
    });
    assert!(is_error);
}

#[tokio::test]
async fn test_unparseable_final_answer_is_malformed() {
    let provider = ScriptedProvider::text("The chains are complicated; I cannot express them.");
    let builder = ChainBuilder::new(provider, StubTools::new(), TEST_TIMEOUT, 5);

    let (result, _) = build_with(builder).await;
    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().starts_with("chains stage returned malformed output"));
}

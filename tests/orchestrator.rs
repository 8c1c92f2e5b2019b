//! End-to-end turn scenarios with scripted collaborators

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use sotto::agent::SpeechSink;
use sotto::context::{CompactionConfig, Compactor, Role, ToolCall};
use sotto::llm::{ChatMessage, LanguageModel, TurnOutput};
use sotto::tools::{ExecutorConfig, ParamSpec, Tool, ToolExecutor, ToolRegistry};
use sotto::{Error, Orchestrator, OrchestratorConfig, Result};

/// Model that replays a fixed script of outputs, one per completion call
struct ScriptedModel {
    script: Mutex<VecDeque<Result<TurnOutput>>>,
}

impl ScriptedModel {
    fn new(outputs: Vec<Result<TurnOutput>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outputs.into()),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tool_schemas: &[Value],
    ) -> Result<TurnOutput> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Model("script exhausted".to_string())))
    }
}

/// Sink that records what it was asked to speak
#[derive(Default)]
struct CountingSink {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSink for CountingSink {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct CpuTool;

#[async_trait]
impl Tool for CpuTool {
    fn name(&self) -> &str {
        "system_info"
    }
    fn description(&self) -> &str {
        "Report system status"
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }
    async fn call(&self, _arguments: &Value) -> Result<String> {
        Ok("CPU: 12%".to_string())
    }
}

struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }
    async fn call(&self, _arguments: &Value) -> Result<String> {
        Err(Error::Tool("disk on fire".to_string()))
    }
}

fn harness(model: Arc<ScriptedModel>) -> (Orchestrator, Arc<CountingSink>) {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CpuTool)).unwrap();
    registry.register(Arc::new(BrokenTool)).unwrap();
    let registry = Arc::new(registry);

    let executor = ToolExecutor::new(Arc::clone(&registry), ExecutorConfig::default());
    let compactor = Compactor::new(
        CompactionConfig::default(),
        Arc::clone(&model) as Arc<dyn LanguageModel>,
    );
    let sink = Arc::new(CountingSink::default());

    let orchestrator = Orchestrator::new(
        registry,
        executor,
        model,
        compactor,
        Arc::clone(&sink) as Arc<dyn SpeechSink>,
        OrchestratorConfig::default(),
    );
    (orchestrator, sink)
}

fn tool_call(name: &str, args: Value) -> Result<TurnOutput> {
    Ok(TurnOutput::ToolCall(ToolCall {
        name: name.to_string(),
        arguments: args,
    }))
}

#[tokio::test]
async fn tool_round_trip_produces_expected_trace() {
    let model = ScriptedModel::new(vec![
        tool_call("system_info", json!({})),
        Ok(TurnOutput::Final("CPU usage is 12 percent.".to_string())),
    ]);
    let (mut orchestrator, sink) = harness(model);

    let answer = orchestrator.run_turn("how's my cpu").await.unwrap();
    assert_eq!(answer, "CPU usage is 12 percent.");

    let turns = orchestrator.memory().snapshot();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "how's my cpu");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].tool_call.as_ref().unwrap().name, "system_info");
    assert_eq!(turns[2].role, Role::Tool);
    assert_eq!(turns[2].content, "CPU: 12%");
    assert_eq!(turns[3].role, Role::Assistant);
    assert_eq!(turns[3].content, "CPU usage is 12 percent.");

    let spoken = sink.spoken.lock().unwrap();
    assert_eq!(spoken.as_slice(), ["CPU usage is 12 percent."]);
}

#[tokio::test]
async fn iteration_cap_closes_turn_with_fallback() {
    // More tool requests than the cap allows; the model never finalizes
    let script: Vec<Result<TurnOutput>> = (0..10)
        .map(|_| tool_call("system_info", json!({})))
        .collect();
    let (mut orchestrator, sink) = harness(ScriptedModel::new(script));

    let answer = orchestrator.run_turn("loop forever please").await.unwrap();
    assert_eq!(answer, "I wasn't able to complete that after 5 tool calls.");

    let turns = orchestrator.memory().snapshot();
    // 1 user + 5 tool rounds of 2 turns + the fallback assistant turn
    assert_eq!(turns.len(), 12);
    let last = turns.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.content.is_empty());

    assert_eq!(sink.spoken.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn model_failure_leaves_user_turn_and_stays_silent() {
    let model = ScriptedModel::new(vec![Err(Error::Model("backend down".to_string()))]);
    let (mut orchestrator, sink) = harness(model);

    let err = orchestrator.run_turn("hello?").await.unwrap_err();
    assert!(matches!(err, Error::Model(_)));

    // The user turn is committed; no dangling assistant turn follows it
    let turns = orchestrator.memory().snapshot();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);

    assert!(sink.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_fed_back_and_the_loop_continues() {
    let model = ScriptedModel::new(vec![
        tool_call("bogus_tool", json!({})),
        Ok(TurnOutput::Final("Sorry, I can't do that.".to_string())),
    ]);
    let (mut orchestrator, _sink) = harness(model);

    let answer = orchestrator.run_turn("do the thing").await.unwrap();
    assert_eq!(answer, "Sorry, I can't do that.");

    let turns = orchestrator.memory().snapshot();
    assert_eq!(turns[2].role, Role::Tool);
    assert!(turns[2].content.starts_with("Error: "));
    assert!(turns[2].content.contains("unknown tool"));
    assert!(turns[2].content.contains("bogus_tool"));
}

#[tokio::test]
async fn tool_fault_is_data_not_a_turn_failure() {
    let model = ScriptedModel::new(vec![
        tool_call("broken", json!({})),
        Ok(TurnOutput::Final("The check itself failed.".to_string())),
    ]);
    let (mut orchestrator, _sink) = harness(model);

    let answer = orchestrator.run_turn("check the disk").await.unwrap();
    assert_eq!(answer, "The check itself failed.");

    let turns = orchestrator.memory().snapshot();
    assert_eq!(turns[2].role, Role::Tool);
    assert!(turns[2].content.starts_with("Error: "));
    assert!(turns[2].content.contains("disk on fire"));
}

#[tokio::test]
async fn blank_final_answer_is_replaced() {
    let model = ScriptedModel::new(vec![Ok(TurnOutput::Final("   ".to_string()))]);
    let (mut orchestrator, sink) = harness(model);

    let answer = orchestrator.run_turn("say nothing").await.unwrap();
    assert_eq!(answer, "I don't have anything to say about that.");

    let last = orchestrator.memory().snapshot().last().unwrap().clone();
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.content.trim().is_empty());
    assert_eq!(sink.spoken.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn consecutive_turns_share_one_memory() {
    let model = ScriptedModel::new(vec![
        Ok(TurnOutput::Final("Hi there.".to_string())),
        Ok(TurnOutput::Final("Still here.".to_string())),
    ]);
    let (mut orchestrator, sink) = harness(model);

    orchestrator.run_turn("hello").await.unwrap();
    orchestrator.run_turn("you there?").await.unwrap();

    let turns = orchestrator.memory().snapshot();
    assert_eq!(turns.len(), 4);
    assert_eq!(
        turns.iter().map(|t| t.role).collect::<Vec<_>>(),
        [Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(sink.spoken.lock().unwrap().len(), 2);
}

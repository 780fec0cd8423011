// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn orchestration state machine.
//!
//! One [`Orchestrator::run_turn`] call drives a full request/response
//! cycle: classify intent, assemble context, stream the primary
//! completion, reassemble fragmented tool calls, run each call through
//! the validate/ground/dedupe/execute pipeline, optionally narrate
//! search results in a second pass, and fall back to a non-streaming
//! planner call when an action request produced no tool call at all.
//!
//! Turn phases: `AwaitingFirstToken -> StreamingContent ->
//! ToolsExecuting -> [SummaryPass] -> Done`, with `PlannerFallback` as
//! the side path. All LLM round-trips within a turn are sequential; the
//! orchestrator is the only writer on the outbound channel.

use std::fmt;
use std::mem;

use futures::StreamExt;
use kontor_config::model::AgentConfig;
use kontor_context::{AssembledContext, ContextAssembler};
use kontor_core::{
    KontorError, RequestContext, StreamChunk, ToolCall, ToolChoice, TranscriptMessage, new_id,
};
use kontor_guard::{IntentStrategy, SanitizedInput, check_arguments, corrective_message};
use kontor_ledger::{ActionLedger, ActionRecord, UsageRecord, record_usage};
use kontor_providers::{ChatBackend, ToolDef};
use kontor_storage::{Database, StoredMessage, queries};
use kontor_tools::{
    ToolExecutor, ToolKind, ToolRegistry, ToolSpec, dedupe_key_for, localized, validate_arguments,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::accumulate::ToolCallAccumulator;
use crate::memory_tag;
use crate::planner;

/// Phase of one orchestration pass, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    AwaitingFirstToken,
    StreamingContent,
    ToolsExecuting,
    SummaryPass,
    PlannerFallback,
    Done,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnPhase::AwaitingFirstToken => "awaiting_first_token",
            TurnPhase::StreamingContent => "streaming_content",
            TurnPhase::ToolsExecuting => "tools_executing",
            TurnPhase::SummaryPass => "summary_pass",
            TurnPhase::PlannerFallback => "planner_fallback",
            TurnPhase::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Why a turn stopped before reaching its normal end.
enum TurnAbort {
    /// The SSE consumer went away; the partial assistant message is
    /// discarded and nothing further is persisted.
    Disconnected,
    Fatal(KontorError),
}

impl From<KontorError> for TurnAbort {
    fn from(error: KontorError) -> Self {
        TurnAbort::Fatal(error)
    }
}

/// What one completed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant text as persisted, memory tag stripped. Empty when
    /// the consumer disconnected or the model produced nothing.
    pub content: String,
    /// Number of calls that reached the tool executor.
    pub tool_calls: u32,
    pub action_intent: bool,
}

/// Mutable state threaded through one turn.
struct TurnState {
    transcript: Vec<TranscriptMessage>,
    /// Consumer-visible assistant text in emission order; becomes the
    /// persisted message. Progress lines are deliberately absent.
    final_text: String,
    /// Corrective instructions queued by the hallucination guard, appended
    /// to the transcript after the tool results to keep result ordering
    /// valid for the wire format.
    corrections: Vec<String>,
    executed_read: bool,
    tool_calls_run: u32,
}

impl TurnState {
    fn needs_break(&self) -> bool {
        !self.final_text.is_empty() && !self.final_text.ends_with('\n')
    }
}

/// Drives one user turn end to end. Owned once per process and shared
/// behind an `Arc`; per-tenant state arrives via [`RequestContext`] and
/// the backend.
pub struct Orchestrator {
    assembler: ContextAssembler,
    registry: ToolRegistry,
    executor: ToolExecutor,
    ledger: ActionLedger,
    db: Database,
    intent: Box<dyn IntentStrategy>,
    agent: AgentConfig,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assembler: ContextAssembler,
        registry: ToolRegistry,
        executor: ToolExecutor,
        ledger: ActionLedger,
        db: Database,
        intent: Box<dyn IntentStrategy>,
        agent: AgentConfig,
    ) -> Self {
        Self {
            assembler,
            registry,
            executor,
            ledger,
            db,
            intent,
            agent,
        }
    }

    /// Runs one turn, emitting content deltas on `tx`. A closed channel
    /// means the consumer disconnected: the turn stops quietly and the
    /// partial assistant message is not persisted. Tool effects that
    /// already happened stand.
    pub async fn run_turn(
        &self,
        backend: &dyn ChatBackend,
        ctx: &RequestContext,
        input: SanitizedInput,
        tx: &mpsc::Sender<String>,
    ) -> Result<TurnOutcome, KontorError> {
        if input.is_flagged() {
            warn!(
                conversation_id = %ctx.conversation_id,
                flags = input.flags.len(),
                "injection patterns detected in user message"
            );
        }
        let decision = self.intent.classify(&input.text);
        debug!(
            conversation_id = %ctx.conversation_id,
            action_intent = decision.action_intent,
            reason = decision.reason,
            "classified turn intent"
        );

        let span = info_span!("turn", conversation_id = %ctx.conversation_id);
        match self
            .drive(backend, ctx, &input, decision.action_intent, tx)
            .instrument(span)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(TurnAbort::Disconnected) => {
                debug!(
                    conversation_id = %ctx.conversation_id,
                    "consumer disconnected; discarding partial turn"
                );
                Ok(TurnOutcome {
                    content: String::new(),
                    tool_calls: 0,
                    action_intent: decision.action_intent,
                })
            }
            Err(TurnAbort::Fatal(error)) => Err(error),
        }
    }

    async fn drive(
        &self,
        backend: &dyn ChatBackend,
        ctx: &RequestContext,
        input: &SanitizedInput,
        action_intent: bool,
        tx: &mpsc::Sender<String>,
    ) -> Result<TurnOutcome, TurnAbort> {
        // Assemble before persisting the user row so the history window
        // does not contain the message being answered.
        let AssembledContext {
            system_prompt,
            history,
            knowledge_entry_ids,
        } = self.assembler.assemble(ctx, &input.text).await?;
        if !knowledge_entry_ids.is_empty() {
            debug!(
                conversation_id = %ctx.conversation_id,
                entries = knowledge_entry_ids.len(),
                "knowledge entries attached to prompt"
            );
        }

        let recent_context: Vec<String> = history
            .iter()
            .filter_map(|message| match message {
                TranscriptMessage::User { content } => Some(content.clone()),
                _ => None,
            })
            .collect();

        let mut state = TurnState {
            transcript: history,
            final_text: String::new(),
            corrections: Vec::new(),
            executed_read: false,
            tool_calls_run: 0,
        };
        state.transcript.push(TranscriptMessage::user(&input.text));

        let user_row = StoredMessage::new(&ctx.conversation_id, "user", &input.text);
        queries::messages::insert_message(&self.db, &user_row).await?;

        let visible = self.registry.visible_for(ctx.industry, ctx.elevated);
        let tools: Vec<ToolDef> = visible
            .iter()
            .map(|spec| ToolDef {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                parameters: spec.parameters.clone(),
            })
            .collect();
        let tool_choice = if action_intent {
            ToolChoice::Required
        } else {
            ToolChoice::Auto
        };

        debug!(
            conversation_id = %ctx.conversation_id,
            phase = %TurnPhase::AwaitingFirstToken,
            tools = tools.len(),
            forced = action_intent,
            "requesting completion stream"
        );
        let mut stream = backend
            .stream(&system_prompt, &state.transcript, &tools, tool_choice)
            .await?;

        // Prose is withheld on action turns until we know whether the
        // model called a tool; it flushes after the tool results.
        let mut buffer = String::new();
        let mut prose = String::new();
        let mut accumulator = ToolCallAccumulator::new();
        let mut prompt_tokens = 0u64;
        let mut completion_tokens = 0u64;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::ContentDelta(delta) => {
                    prose.push_str(&delta);
                    if action_intent {
                        buffer.push_str(&delta);
                    } else {
                        state.final_text.push_str(&delta);
                        emit(tx, delta).await?;
                    }
                }
                StreamChunk::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    accumulator.push(index, id, name, &arguments);
                }
                StreamChunk::Usage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                } => {
                    prompt_tokens = prompt_tokens.max(prompt);
                    completion_tokens = completion_tokens.max(completion);
                }
                StreamChunk::Finish(reason) => {
                    debug!(
                        conversation_id = %ctx.conversation_id,
                        phase = %TurnPhase::StreamingContent,
                        ?reason,
                        "primary stream finished"
                    );
                }
            }
        }

        let calls = accumulator.finish();
        if !calls.is_empty() {
            debug!(
                conversation_id = %ctx.conversation_id,
                phase = %TurnPhase::ToolsExecuting,
                calls = calls.len(),
                "executing tool calls"
            );
            state
                .transcript
                .push(TranscriptMessage::assistant_with_tools(
                    prose.clone(),
                    calls.clone(),
                ));
            for call in &calls {
                self.run_tool_call(ctx, &input.text, &recent_context, &visible, call, &mut state, tx)
                    .await?;
            }
            for correction in mem::take(&mut state.corrections) {
                state.transcript.push(TranscriptMessage::system(correction));
            }
            if !buffer.is_empty() {
                emit(tx, buffer.clone()).await?;
                state.final_text.push_str(&buffer);
            }
        } else if action_intent {
            self.planner_fallback(
                backend,
                ctx,
                input,
                &recent_context,
                &system_prompt,
                &tools,
                &visible,
                buffer,
                &mut state,
                tx,
            )
            .await?;
        }

        if state.executed_read {
            self.summary_pass(backend, ctx, &system_prompt, &tools, &mut state, tx)
                .await?;
        }

        debug!(
            conversation_id = %ctx.conversation_id,
            phase = %TurnPhase::Done,
            prompt_tokens,
            completion_tokens,
            tool_calls = state.tool_calls_run,
            "turn complete"
        );

        self.persist_turn(backend, ctx, input, &state, action_intent)
            .await
            .map_err(TurnAbort::from)
    }

    /// One call through the validate -> ground -> dedupe -> execute
    /// pipeline. Storage faults are reported per call and never abort
    /// sibling calls.
    #[allow(clippy::too_many_arguments)]
    async fn run_tool_call(
        &self,
        ctx: &RequestContext,
        user_message: &str,
        recent_context: &[String],
        visible: &[&ToolSpec],
        call: &ToolCall,
        state: &mut TurnState,
        tx: &mpsc::Sender<String>,
    ) -> Result<(), TurnAbort> {
        let language = ctx.language;
        let label = call.name.replace('_', " ");

        let spec = match visible.iter().find(|spec| spec.name == call.name) {
            Some(spec) => *spec,
            None => {
                warn!(tool = call.name.as_str(), "model called a tool outside its catalogue");
                let line = localized(
                    language,
                    format!("❌ There is no tool called \"{}\" here.", call.name),
                    format!("❌ Es gibt hier kein Werkzeug namens \"{}\".", call.name),
                );
                let payload = json!({"success": false, "error": format!("unknown tool: {}", call.name)});
                return self.report(state, tx, &call.id, payload, &line).await;
            }
        };

        let args = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                warn!(tool = call.name.as_str(), "tool call arguments were not a JSON object");
                let line = localized(
                    language,
                    format!("❌ The arguments for {label} were malformed, so nothing ran."),
                    format!("❌ Die Argumente für {label} waren fehlerhaft, daher wurde nichts ausgeführt."),
                );
                let payload = json!({"success": false, "error": "arguments were not a JSON object"});
                return self.report(state, tx, &call.id, payload, &line).await;
            }
        };

        if let Err(reason) = validate_arguments(&call.name, &args) {
            debug!(tool = call.name.as_str(), %reason, "argument validation rejected the call");
            let line = localized(
                language,
                format!("❌ Skipped {label}: required details were missing."),
                format!("❌ {label} übersprungen: erforderliche Angaben fehlten."),
            );
            let payload = json!({"success": false, "error": reason});
            return self.report(state, tx, &call.id, payload, &line).await;
        }

        if spec.grounded {
            let report = check_arguments(&call.name, &args, user_message, recent_context);
            if !report.is_grounded() {
                let names: Vec<&str> = report
                    .ungrounded
                    .iter()
                    .map(|arg| arg.value.as_str())
                    .collect();
                info!(
                    tool = call.name.as_str(),
                    ungrounded = names.join(", "),
                    "hallucination guard blocked the call"
                );
                let line = localized(
                    language,
                    format!(
                        "❌ Skipped {label}: \"{}\" does not appear in your message.",
                        names.join(", ")
                    ),
                    format!(
                        "❌ {label} übersprungen: \"{}\" kommt in Ihrer Nachricht nicht vor.",
                        names.join(", ")
                    ),
                );
                let payload = json!({"success": false, "error": "name arguments not present in the user message"});
                self.report(state, tx, &call.id, payload, &line).await?;
                state.corrections.push(corrective_message(language, &report));
                return Ok(());
            }
        }

        if let Some(key) = dedupe_key_for(&call.name, &args) {
            match self
                .ledger
                .find_duplicate(&ctx.user_id, &key, self.agent.duplicate_window_secs)
                .await
            {
                Ok(Some(prior)) => {
                    info!(
                        tool = call.name.as_str(),
                        dedupe_key = key.as_str(),
                        "duplicate action suppressed"
                    );
                    let line = localized(
                        language,
                        format!("ℹ️ Already done a moment ago: {}. I did not repeat it.", prior.summary),
                        format!("ℹ️ Bereits vor Kurzem erledigt: {}. Ich habe es nicht wiederholt.", prior.summary),
                    );
                    let payload = json!({
                        "success": true,
                        "duplicate": true,
                        "message": prior.summary,
                    });
                    return self.report(state, tx, &call.id, payload, &line).await;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, tool = call.name.as_str(), "duplicate check failed; proceeding");
                }
            }
        }

        let progress = localized(
            language,
            format!("⏳ Working on {label}…"),
            format!("⏳ Bearbeite {label}…"),
        );
        emit(tx, framed(&progress, state.needs_break())).await?;

        match self.executor.execute(ctx, &call.name, &args).await {
            Ok(outcome) => {
                state.tool_calls_run += 1;
                if spec.is_read() {
                    state.executed_read = true;
                }
                let marker = if outcome.is_disambiguation() {
                    "🤔"
                } else if outcome.success {
                    "✅"
                } else {
                    "❌"
                };
                let line = format!("{marker} {}", outcome.message);
                let payload = outcome.payload();
                if spec.kind == ToolKind::Mutating {
                    let mut record = ActionRecord::new(
                        &ctx.conversation_id,
                        &ctx.user_id,
                        &ctx.company_id,
                        &call.name,
                        args.clone(),
                        payload.clone(),
                        outcome.success,
                        outcome.summary_line(),
                    );
                    record.entity_type = outcome.entity_type.clone();
                    record.entity_id = outcome.entity_id.clone();
                    record.dedupe_key = dedupe_key_for(&call.name, &args);
                    if !outcome.success {
                        record.error_message = Some(outcome.message.clone());
                    }
                    if let Err(error) = self.ledger.record(&record).await {
                        warn!(%error, tool = call.name.as_str(), "failed to write action ledger row");
                    }
                }
                self.report(state, tx, &call.id, payload, &line).await
            }
            Err(error) => {
                error!(%error, tool = call.name.as_str(), "tool execution hit a storage fault");
                state.tool_calls_run += 1;
                if spec.kind == ToolKind::Mutating {
                    let mut record = ActionRecord::new(
                        &ctx.conversation_id,
                        &ctx.user_id,
                        &ctx.company_id,
                        &call.name,
                        args.clone(),
                        json!({"success": false}),
                        false,
                        format!("{label} failed"),
                    );
                    record.error_message = Some(error.to_string());
                    record.dedupe_key = dedupe_key_for(&call.name, &args);
                    if let Err(error) = self.ledger.record(&record).await {
                        warn!(%error, tool = call.name.as_str(), "failed to write action ledger row");
                    }
                }
                let line = localized(
                    language,
                    format!("❌ Something went wrong while running {label}. Please try again."),
                    format!("❌ Beim Ausführen von {label} ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut."),
                );
                let payload = json!({"success": false, "error": "internal error"});
                self.report(state, tx, &call.id, payload, &line).await
            }
        }
    }

    /// Emits one result line, records it in the final text and appends
    /// the tool-result message for the model.
    async fn report(
        &self,
        state: &mut TurnState,
        tx: &mpsc::Sender<String>,
        call_id: &str,
        payload: Value,
        line: &str,
    ) -> Result<(), TurnAbort> {
        let text = framed(line, state.needs_break());
        emit(tx, text.clone()).await?;
        state.final_text.push_str(&text);
        state
            .transcript
            .push(TranscriptMessage::tool_result(call_id, payload));
        Ok(())
    }

    /// Second, non-forced call so the model narrates search results in
    /// prose. A failed call degrades to a generic confirmation.
    async fn summary_pass(
        &self,
        backend: &dyn ChatBackend,
        ctx: &RequestContext,
        system_prompt: &str,
        tools: &[ToolDef],
        state: &mut TurnState,
        tx: &mpsc::Sender<String>,
    ) -> Result<(), TurnAbort> {
        debug!(
            conversation_id = %ctx.conversation_id,
            phase = %TurnPhase::SummaryPass,
            "narrating tool results"
        );
        let mut narrated = String::new();
        match backend
            .stream(system_prompt, &state.transcript, tools, ToolChoice::Auto)
            .await
        {
            Ok(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(StreamChunk::ContentDelta(delta)) => {
                            narrated.push_str(&delta);
                            state.final_text.push_str(&delta);
                            emit(tx, delta).await?;
                        }
                        Ok(_) => {}
                        Err(error) => {
                            warn!(%error, "summary stream failed midway");
                            break;
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%error, "summary call failed");
            }
        }
        if narrated.is_empty() {
            let line = localized(
                ctx.language,
                "Here are the results.",
                "Hier sind die Ergebnisse.",
            );
            let text = framed(&line, state.needs_break());
            emit(tx, text.clone()).await?;
            state.final_text.push_str(&text);
        }
        Ok(())
    }

    /// Non-streaming recovery when an action request produced zero tool
    /// calls: ask the model to name exactly one call as JSON and run it
    /// through the identical pipeline. Without a usable call the turn
    /// ends with an explicit not-verified message, never a silent claim
    /// of success.
    #[allow(clippy::too_many_arguments)]
    async fn planner_fallback(
        &self,
        backend: &dyn ChatBackend,
        ctx: &RequestContext,
        input: &SanitizedInput,
        recent_context: &[String],
        system_prompt: &str,
        tools: &[ToolDef],
        visible: &[&ToolSpec],
        buffer: String,
        state: &mut TurnState,
        tx: &mpsc::Sender<String>,
    ) -> Result<(), TurnAbort> {
        debug!(
            conversation_id = %ctx.conversation_id,
            phase = %TurnPhase::PlannerFallback,
            "action request produced no tool call"
        );
        if !buffer.is_empty() {
            state
                .transcript
                .push(TranscriptMessage::assistant(buffer.clone()));
        }
        state
            .transcript
            .push(TranscriptMessage::system(planner::PLANNER_INSTRUCTION));

        let call = match backend
            .complete(system_prompt, &state.transcript, tools, ToolChoice::Auto)
            .await
        {
            Ok(completion) => completion.tool_calls.into_iter().next().or_else(|| {
                planner::parse(&completion.content).map(|(tool, args)| ToolCall {
                    id: new_id(),
                    name: tool,
                    arguments: args.to_string(),
                })
            }),
            Err(error) => {
                warn!(%error, "planner call failed");
                None
            }
        };

        match call {
            Some(call) => {
                info!(
                    conversation_id = %ctx.conversation_id,
                    tool = call.name.as_str(),
                    "planner fallback recovered a tool call"
                );
                state
                    .transcript
                    .push(TranscriptMessage::assistant_with_tools(
                        String::new(),
                        vec![call.clone()],
                    ));
                self.run_tool_call(ctx, &input.text, recent_context, visible, &call, state, tx)
                    .await?;
                for correction in mem::take(&mut state.corrections) {
                    state.transcript.push(TranscriptMessage::system(correction));
                }
                // The withheld prose only flushes once its claims had a
                // chance to become true.
                if !buffer.is_empty() {
                    emit(tx, buffer.clone()).await?;
                    state.final_text.push_str(&buffer);
                }
            }
            None => {
                let line = localized(
                    ctx.language,
                    "❌ I could not verify that this action was performed, so I have not made any changes.",
                    "❌ Ich konnte nicht überprüfen, ob diese Aktion ausgeführt wurde, daher wurden keine Änderungen vorgenommen.",
                );
                let text = framed(&line, state.needs_break());
                emit(tx, text.clone()).await?;
                state.final_text.push_str(&text);
            }
        }
        Ok(())
    }

    /// Persists the assistant message and the usage row, both only when
    /// the final content is non-empty.
    async fn persist_turn(
        &self,
        backend: &dyn ChatBackend,
        ctx: &RequestContext,
        input: &SanitizedInput,
        state: &TurnState,
        action_intent: bool,
    ) -> Result<TurnOutcome, KontorError> {
        let (content, tag) = memory_tag::extract(&state.final_text);
        if content.is_empty() {
            return Ok(TurnOutcome {
                content,
                tool_calls: state.tool_calls_run,
                action_intent,
            });
        }

        let mut row = StoredMessage::new(&ctx.conversation_id, "assistant", &content);
        row.model = Some(backend.model().to_string());
        if let Some(tag) = &tag {
            row.metadata = Some(
                json!({"memory_worthy": tag.worthy, "memory_reason": tag.reason}).to_string(),
            );
        }
        queries::messages::insert_message(&self.db, &row).await?;

        let mut usage = UsageRecord::new(
            &ctx.conversation_id,
            &ctx.user_id,
            &ctx.company_id,
            backend.provider(),
            backend.model(),
        );
        usage.input_chars = input.text.chars().count() as u64;
        usage.output_chars = content.chars().count() as u64;
        usage.tool_calls = state.tool_calls_run;
        if let Err(error) = record_usage(&self.db, &usage).await {
            warn!(%error, "failed to record usage row");
        }
        if let Err(error) =
            queries::conversations::touch_conversation(&self.db, &ctx.company_id, &ctx.conversation_id)
                .await
        {
            warn!(%error, "failed to touch conversation");
        }

        Ok(TurnOutcome {
            content,
            tool_calls: state.tool_calls_run,
            action_intent,
        })
    }
}

/// Derives a conversation title from the first user message.
pub fn derive_title(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    let mut title: String = first_line.chars().take(60).collect();
    if first_line.chars().count() > 60 {
        title.push('…');
    }
    if title.is_empty() {
        "New conversation".to_string()
    } else {
        title
    }
}

async fn emit(tx: &mpsc::Sender<String>, text: impl Into<String>) -> Result<(), TurnAbort> {
    tx.send(text.into()).await.map_err(|_| TurnAbort::Disconnected)
}

fn framed(line: &str, needs_break: bool) -> String {
    if needs_break {
        format!("\n{line}\n")
    } else {
        format!("{line}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontor_config::model::KnowledgeConfig;
    use kontor_core::{FinishReason, StreamChunk};
    use kontor_guard::{KeywordIntentClassifier, sanitize_message};
    use kontor_storage::Conversation;
    use kontor_storage::queries::contacts::{self, ContactFilter};
    use kontor_storage::queries::tasks;
    use kontor_test_utils::ScriptedBackend;

    async fn orchestrator() -> (Orchestrator, Database) {
        let db = Database::open_in_memory().await.unwrap();
        let orch = Orchestrator::new(
            ContextAssembler::new(
                db.clone(),
                AgentConfig::default(),
                KnowledgeConfig::default(),
                None,
            ),
            ToolRegistry::new(),
            ToolExecutor::new(db.clone()),
            ActionLedger::new(db.clone()),
            db.clone(),
            Box::new(KeywordIntentClassifier::new()),
            AgentConfig::default(),
        );
        (orch, db)
    }

    async fn seeded_ctx(db: &Database) -> RequestContext {
        let ctx = RequestContext {
            conversation_id: new_id(),
            user_id: "user-1".to_string(),
            company_id: "co-1".to_string(),
            ..RequestContext::default()
        };
        let conv = Conversation::new(&ctx.conversation_id, &ctx.company_id, &ctx.user_id, "test");
        queries::conversations::insert_conversation(db, &conv)
            .await
            .unwrap();
        ctx
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> String {
        let mut joined = String::new();
        while let Ok(chunk) = rx.try_recv() {
            joined.push_str(&chunk);
        }
        joined
    }

    #[tokio::test]
    async fn conversational_turn_streams_live_and_persists() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend.push_text("Hello! How can I help you today?").await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("good morning").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();

        assert!(!outcome.action_intent);
        assert_eq!(outcome.tool_calls, 0);
        assert_eq!(outcome.content, "Hello! How can I help you today?");
        assert_eq!(drain(&mut rx), "Hello! How can I help you today?");

        let messages = queries::messages::get_messages(&db, &ctx.conversation_id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].model.as_deref(), Some("scripted-model"));

        let totals = kontor_ledger::usage_totals(&db, &ctx.company_id).await.unwrap();
        assert_eq!(totals.turns, 1);
        assert_eq!(totals.tool_calls, 0);
    }

    #[tokio::test]
    async fn action_turn_buffers_prose_until_after_the_result() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend
            .push_stream(vec![
                Ok(StreamChunk::ContentDelta("Adding Amanda Lopez now.".to_string())),
                Ok(StreamChunk::ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some("create_contact".to_string()),
                    arguments: r#"{"first_name":"Amanda","#.to_string(),
                }),
                Ok(StreamChunk::ToolCallDelta {
                    index: 0,
                    id: None,
                    name: None,
                    arguments: r#""last_name":"Lopez"}"#.to_string(),
                }),
                Ok(StreamChunk::Finish(FinishReason::ToolCalls)),
            ])
            .await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("please create a contact for Amanda Lopez").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let emitted = drain(&mut rx);

        assert!(outcome.action_intent);
        assert_eq!(outcome.tool_calls, 1);
        let result_at = emitted.find("✅").unwrap();
        let prose_at = emitted.find("Adding Amanda Lopez now.").unwrap();
        assert!(result_at < prose_at, "buffered prose must flush after the result");
        assert!(emitted.contains("Amanda Lopez"));

        let found = contacts::search_contacts(
            &db,
            &ctx.company_id,
            &ContactFilter {
                query: Some("Amanda".to_string()),
                ..ContactFilter::default()
            },
            10,
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);

        let actions = orch.ledger.recent_actions(&ctx.company_id, 10).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].success);
        assert_eq!(actions[0].tool_name, "create_contact");
    }

    #[tokio::test]
    async fn duplicate_create_is_suppressed_within_the_window() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        for _ in 0..2 {
            backend
                .push_tool_call(
                    "call_1",
                    "create_contact",
                    r#"{"first_name":"Amanda","last_name":"Lopez"}"#,
                )
                .await;
        }

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("create a contact for Amanda Lopez").unwrap();
        orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        drain(&mut rx);

        let input = sanitize_message("create a contact for Amanda Lopez").unwrap();
        orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let second = drain(&mut rx);
        assert!(second.contains("ℹ️"), "second attempt must be suppressed: {second}");

        let found = contacts::search_contacts(
            &db,
            &ctx.company_id,
            &ContactFilter {
                query: Some("Amanda".to_string()),
                ..ContactFilter::default()
            },
            10,
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1, "the contact must not be created twice");

        let successes = orch
            .ledger
            .recent_actions(&ctx.company_id, 10)
            .await
            .unwrap()
            .into_iter()
            .filter(|action| action.success)
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn validator_blocks_execution_and_leaves_no_ledger_row() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend.push_tool_call("call_1", "create_contact", "{}").await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("add a new contact").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let emitted = drain(&mut rx);

        assert_eq!(outcome.tool_calls, 0);
        assert!(emitted.contains("❌"));
        let count = contacts::count_contacts(&db, &ctx.company_id, &ContactFilter::default())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(
            orch.ledger
                .recent_actions(&ctx.company_id, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn planner_fallback_runs_the_parsed_call() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend.push_text("Sure, I will set that up.").await;
        backend
            .push_completion(kontor_providers::Completion {
                content: r#"{"tool": "create_task", "args": {"title": "Call Jana"}}"#.to_string(),
                ..kontor_providers::Completion::default()
            })
            .await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("add a task to call Jana tomorrow").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let emitted = drain(&mut rx);

        assert!(outcome.action_intent);
        assert_eq!(outcome.tool_calls, 1);
        assert!(emitted.contains("✅"), "planner call must execute: {emitted}");
        assert!(emitted.contains("Sure, I will set that up."));

        let tasks = tasks::search_tasks(&db, &ctx.company_id, &Default::default(), 10)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Call Jana");
    }

    #[tokio::test]
    async fn unverified_action_is_reported_and_buffer_discarded() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend.push_text("Done! I created the invoice for you.").await;
        backend
            .push_completion(kontor_providers::Completion {
                content: "I cannot determine which tool to use.".to_string(),
                ..kontor_providers::Completion::default()
            })
            .await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("create an invoice for the spring campaign").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let emitted = drain(&mut rx);

        assert!(emitted.contains("could not verify"));
        assert!(
            !emitted.contains("Done! I created the invoice"),
            "the unverified claim must not reach the user"
        );
        assert!(outcome.content.contains("could not verify"));
        assert_eq!(outcome.tool_calls, 0);
    }

    #[tokio::test]
    async fn read_call_triggers_the_summary_pass() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend
            .push_stream(vec![
                Ok(StreamChunk::ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some("search_leads".to_string()),
                    arguments: r#"{"source":"Website"}"#.to_string(),
                }),
                Ok(StreamChunk::Finish(FinishReason::ToolCalls)),
            ])
            .await;
        backend.push_text("No website leads yet.").await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("how many leads came from the website?").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        let emitted = drain(&mut rx);

        assert!(!outcome.action_intent);
        assert!(emitted.contains("✅"));
        let summary_at = emitted.find("No website leads yet.").unwrap();
        let result_at = emitted.find("✅").unwrap();
        assert!(result_at < summary_at);
        assert!(outcome.content.ends_with("No website leads yet."));
    }

    #[tokio::test]
    async fn memory_tag_is_stripped_into_metadata() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend
            .push_text("Noted. [MEMORY: worthy=true; reason=\"client prefers phone calls\"]")
            .await;

        let (tx, mut rx) = mpsc::channel(256);
        let input = sanitize_message("our client prefers phone calls over email").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();
        drain(&mut rx);

        assert_eq!(outcome.content, "Noted.");
        let messages = queries::messages::get_messages(&db, &ctx.conversation_id)
            .await
            .unwrap();
        let assistant = messages.last().unwrap();
        assert_eq!(assistant.content, "Noted.");
        let metadata: Value = serde_json::from_str(assistant.metadata.as_ref().unwrap()).unwrap();
        assert_eq!(metadata["memory_worthy"], true);
        assert_eq!(metadata["memory_reason"], "client prefers phone calls");
    }

    #[tokio::test]
    async fn disconnected_consumer_skips_persistence() {
        let (orch, db) = orchestrator().await;
        let ctx = seeded_ctx(&db).await;
        let backend = ScriptedBackend::new();
        backend.push_text("A reply nobody is waiting for.").await;

        let (tx, rx) = mpsc::channel(256);
        drop(rx);
        let input = sanitize_message("hello?").unwrap();
        let outcome = orch.run_turn(&backend, &ctx, input, &tx).await.unwrap();

        assert!(outcome.content.is_empty());
        let messages = queries::messages::get_messages(&db, &ctx.conversation_id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1, "only the user message is persisted");
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn titles_are_trimmed_to_the_first_line() {
        assert_eq!(derive_title("Create a contact\nfor Amanda"), "Create a contact");
        assert_eq!(derive_title(""), "New conversation");
        let long = "x".repeat(80);
        assert_eq!(derive_title(&long).chars().count(), 61);
    }
}

//! services/api/src/adapters/placement_llm.rs
//!
//! This module contains the adapter for the session-placement LLM.
//! It implements the `PlacementService` port from the `core` crate.
//!
//! The model only chooses dates and methods and must answer through the
//! forced `create_study_schedule` function tool. The orchestrator in the core
//! crate validates every reply and enforces the call timeout.

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use study_planner_core::{
    domain::ProposedSession,
    placement::PlacementRequest,
    ports::{PlacementService, PortError, PortResult},
};
use tracing::debug;

pub const SCHEDULE_TOOL_NAME: &str = "create_study_schedule";

const SYSTEM_PROMPT: &str = "You are a study planner. You place study sessions for one exam on \
concrete calendar dates. The request JSON holds LOCKED values you must never change: \
locked.totalSessionCount is the exact number of sessions, locked.sessionDurationMinutes is the \
duration of every session. HARD RULES: use only dates listed in constraints.availableDates; \
use only methods listed in exam.studyMethods; for every entry in constraints.weekBreakdown place \
exactly sessionCount sessions on that entry's studyDays; place a session on the first and on the \
last available date. SOFT PREFERENCES: avoid dates with high constraints.existingMinutesByDate, \
spread sessions evenly inside each week, rotate methods, honour exam.preferences when possible. \
Return the schedule by calling the create_study_schedule tool.";

//=========================================================================================
// Wire Format
//=========================================================================================

/// JSON schema of the tool arguments: `{"sessions":[{date, durationMinutes, method}]}`.
fn schedule_tool_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sessions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": { "type": "string", "description": "Study date as YYYY-MM-DD" },
                        "durationMinutes": { "type": "integer" },
                        "method": { "type": "string" }
                    },
                    "required": ["date", "durationMinutes", "method"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["sessions"],
        "additionalProperties": false
    })
}

/// A chat completion request that forces the model to call the schedule tool.
pub fn build_chat_request(model: &str, request_json: &str) -> Value {
    json!({
        "model": model,
        "n": 1,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": request_json }
        ],
        "tools": [{
            "type": "function",
            "function": {
                "name": SCHEDULE_TOOL_NAME,
                "description": "Create the complete study schedule for the exam.",
                "parameters": schedule_tool_parameters(),
                "strict": true
            }
        }],
        "tool_choice": { "type": "function", "function": { "name": SCHEDULE_TOOL_NAME } }
    })
}

/// The parts of a chat completion response this adapter reads.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    choices: Vec<ReplyChoice>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Debug, Deserialize)]
struct ToolFunction {
    name: String,
    /// JSON-encoded tool arguments.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct PlacementReply {
    sessions: Vec<ReplySession>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplySession {
    date: NaiveDate,
    duration_minutes: u32,
    method: String,
}

impl From<ReplySession> for ProposedSession {
    fn from(s: ReplySession) -> Self {
        ProposedSession {
            date: s.date,
            duration_minutes: s.duration_minutes,
            method: s.method,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PlacementService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiPlacementAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiPlacementAdapter {
    /// Creates a new `OpenAiPlacementAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `PlacementService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlacementService for OpenAiPlacementAdapter {
    async fn propose(&self, request: &PlacementRequest) -> PortResult<Vec<ProposedSession>> {
        let request_json = serde_json::to_string(request)
            .map_err(|e| PortError::Unexpected(format!("Failed to serialize request: {}", e)))?;

        let chat_request = build_chat_request(&self.model, &request_json);
        let reply: ChatReply = self
            .client
            .chat()
            .create_byot(chat_request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let sessions = parse_tool_reply(reply)?;
        debug!(count = sessions.len(), "Placement LLM proposed sessions");
        Ok(sessions)
    }
}

//=========================================================================================
// Reply Parsing
//=========================================================================================

/// Reads the proposed sessions from the schedule tool call of the first choice.
pub fn parse_tool_reply(reply: ChatReply) -> PortResult<Vec<ProposedSession>> {
    let call = reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .unwrap_or_default()
        .into_iter()
        .find(|call| call.function.name == SCHEDULE_TOOL_NAME)
        .ok_or_else(|| {
            PortError::Unexpected(format!(
                "Placement LLM response contained no {} tool call.",
                SCHEDULE_TOOL_NAME
            ))
        })?;

    let arguments: PlacementReply = serde_json::from_str(&call.function.arguments)
        .map_err(|e| PortError::Unexpected(format!("Malformed placement reply: {}", e)))?;
    Ok(arguments.sessions.into_iter().map(ProposedSession::from).collect())
}

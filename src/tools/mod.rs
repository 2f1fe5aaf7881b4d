//! Tool operations exposed to a function-calling chat assistant.
//!
//! The set of tools is closed: [`ToolCall::parse`] turns a tool name and its
//! JSON arguments into a typed call, and [`ToolContext::execute`] always
//! produces a JSON value. Failures are reported in-band as
//! `{"success": false, "error": ...}` so the assistant can always render a
//! reply.

pub mod activities;
pub mod time;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

pub use activities::{ActivityEnvelope, ActivityView, PastActivitiesArgs, RecentActivitiesArgs};
pub use time::{CurrentTimeInfo, DateRange, DateRangeArgs};

use crate::services::query::{TemporalQueryEngine, DEFAULT_PREVIEW_CHARS};

/// Errors turning a tool invocation into a [`ToolCall`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool function: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: ToolName,
        #[source]
        source: serde_json::Error,
    },
}

/// Names of the supported tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetPastActivities,
    GetRecentActivities,
    GetCurrentTimeInfo,
    CalculateDateRange,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::GetPastActivities,
        ToolName::GetRecentActivities,
        ToolName::GetCurrentTimeInfo,
        ToolName::CalculateDateRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetPastActivities => "get_past_activities",
            ToolName::GetRecentActivities => "get_recent_activities",
            ToolName::GetCurrentTimeInfo => "get_current_time_info",
            ToolName::CalculateDateRange => "calculate_date_range",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    PastActivities(PastActivitiesArgs),
    RecentActivities(RecentActivitiesArgs),
    CurrentTimeInfo,
    CalculateDateRange(DateRangeArgs),
}

impl ToolCall {
    /// Build a call from a tool name and its JSON-encoded arguments.
    ///
    /// Empty or `null` arguments mean "all defaults".
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let tool: ToolName = name.trim().parse()?;
        let arguments = match arguments.trim() {
            "" | "null" => "{}",
            other => other,
        };
        let invalid = |source| ToolError::InvalidArguments { tool, source };

        Ok(match tool {
            ToolName::GetPastActivities => {
                ToolCall::PastActivities(serde_json::from_str(arguments).map_err(invalid)?)
            }
            ToolName::GetRecentActivities => {
                ToolCall::RecentActivities(serde_json::from_str(arguments).map_err(invalid)?)
            }
            ToolName::GetCurrentTimeInfo => {
                // Arguments are ignored but must still be JSON.
                serde_json::from_str::<Value>(arguments).map_err(invalid)?;
                ToolCall::CurrentTimeInfo
            }
            ToolName::CalculateDateRange => {
                ToolCall::CalculateDateRange(serde_json::from_str(arguments).map_err(invalid)?)
            }
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::PastActivities(_) => ToolName::GetPastActivities,
            ToolCall::RecentActivities(_) => ToolName::GetRecentActivities,
            ToolCall::CurrentTimeInfo => ToolName::GetCurrentTimeInfo,
            ToolCall::CalculateDateRange(_) => ToolName::CalculateDateRange,
        }
    }
}

/// Everything a tool needs to run.
#[derive(Debug, Clone)]
pub struct ToolContext {
    engine: TemporalQueryEngine,
    preview_chars: usize,
    now: DateTime<Utc>,
}

impl ToolContext {
    pub fn new(engine: TemporalQueryEngine) -> Self {
        Self {
            engine,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            now: Utc::now(),
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Pin the wall-clock instant reported by the time tools.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn engine(&self) -> &TemporalQueryEngine {
        &self.engine
    }

    /// Run a parsed call.
    pub async fn execute(&self, call: &ToolCall) -> Value {
        let name = call.name();
        let result = match call {
            ToolCall::PastActivities(args) => {
                activities::past_activities(&self.engine, args, self.preview_chars).await
            }
            ToolCall::RecentActivities(args) => {
                activities::recent_activities(&self.engine, args, self.preview_chars).await
            }
            ToolCall::CurrentTimeInfo => time::current_time_info(self.engine.today(), &self.now),
            ToolCall::CalculateDateRange(args) => {
                time::calculate_date_range(self.engine.today(), args)
            }
        };

        match result.get("success").and_then(Value::as_bool) {
            Some(false) => error!(tool = %name, "tool call failed"),
            _ => info!(tool = %name, "tool call succeeded"),
        }
        result
    }

    /// Parse and run a call by name. Parse failures are reported in-band.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Value {
        match ToolCall::parse(name, arguments) {
            Ok(call) => self.execute(&call).await,
            Err(e) => {
                error!(tool = %name, error = %e, "rejected tool call");
                serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "function_name": name,
                    "arguments": arguments,
                })
            }
        }
    }
}

/// Function-calling definitions of every tool.
pub fn definitions() -> Value {
    Value::Array(vec![
        serde_json::json!({
            "type": "function",
            "function": {
                "name": ToolName::GetPastActivities.as_str(),
                "description": "List activities that already took place, most recent first. \
                    Use for questions about past or finished events.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "days_back": {
                            "type": "integer",
                            "description": "How many days to look back, e.g. 30 for the past month",
                            "default": activities::DEFAULT_DAYS_BACK,
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of activities to return",
                            "default": activities::DEFAULT_LIMIT,
                        },
                    },
                    "required": [],
                },
            },
        }),
        serde_json::json!({
            "type": "function",
            "function": {
                "name": ToolName::GetRecentActivities.as_str(),
                "description": "List activities happening from today onwards, soonest first. \
                    Use for questions about upcoming or recent events.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "days_ahead": {
                            "type": "integer",
                            "description": "How many days to look ahead, e.g. 90 for the next 3 months",
                            "default": activities::DEFAULT_DAYS_AHEAD,
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of activities to return",
                            "default": activities::DEFAULT_LIMIT,
                        },
                    },
                    "required": [],
                },
            },
        }),
        serde_json::json!({
            "type": "function",
            "function": {
                "name": ToolName::GetCurrentTimeInfo.as_str(),
                "description": "Get the current date and time in the configured timezone, \
                    with yesterday, tomorrow and common date offsets.",
                "parameters": {"type": "object", "properties": {}, "required": []},
            },
        }),
        serde_json::json!({
            "type": "function",
            "function": {
                "name": ToolName::CalculateDateRange.as_str(),
                "description": "Calculate a date range from a base date and day offsets. \
                    Examples: 'next 3 months' = (0, 90), 'past week' = (-7, 0).",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "base_date": {
                            "type": "string",
                            "description": "Base date: 'today', 'yesterday', or 'YYYY/MM/DD'",
                            "default": "today",
                        },
                        "start_offset_days": {
                            "type": "integer",
                            "description": "Start offset in days (negative = past, positive = future)",
                            "default": 0,
                        },
                        "end_offset_days": {
                            "type": "integer",
                            "description": "End offset in days (same convention)",
                            "default": 0,
                        },
                    },
                    "required": [],
                },
            },
        }),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        assert_eq!(
            ToolCall::parse("get_past_activities", "").unwrap(),
            ToolCall::PastActivities(PastActivitiesArgs::default())
        );
        assert_eq!(
            ToolCall::parse("get_current_time_info", "null").unwrap(),
            ToolCall::CurrentTimeInfo
        );
    }

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::parse("get_recent_activities", r#"{"days_ahead": 7, "limit": 5}"#)
            .unwrap();
        assert_eq!(
            call,
            ToolCall::RecentActivities(RecentActivitiesArgs {
                days_ahead: Some(7),
                limit: Some(5),
            })
        );
        assert_eq!(call.name(), ToolName::GetRecentActivities);
    }

    #[test]
    fn test_unknown_tool() {
        assert!(matches!(
            ToolCall::parse("delete_everything", "{}"),
            Err(ToolError::UnknownTool(name)) if name == "delete_everything"
        ));
    }

    #[test]
    fn test_ill_typed_arguments() {
        let err = ToolCall::parse("get_past_activities", r#"{"days_back": "thirty"}"#).unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidArguments {
                tool: ToolName::GetPastActivities,
                ..
            }
        ));
        assert!(ToolCall::parse("get_current_time_info", "{oops").is_err());
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let defs = definitions();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["function"]["name"].as_str().unwrap())
            .collect();
        let expected: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
        assert_eq!(names, expected);
        for name in names {
            assert!(name.parse::<ToolName>().is_ok());
        }
    }
}

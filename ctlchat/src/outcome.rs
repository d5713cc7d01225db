//! What a finished turn reports back to its caller.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    Cancelled,
}

impl TurnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallStatus {
    Succeeded,
    Failed { code: i64, message: String },
    /// Not attempted because an earlier call in the same batch failed.
    Skipped,
}

impl ToolCallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    /// Parsed arguments, or the raw text when it was not valid JSON.
    pub arguments: Value,
    pub status: ToolCallStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// Last assistant text appended during the turn.
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TurnOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.status == TurnStatus::Cancelled
    }

    pub fn failed_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls
            .iter()
            .filter(|record| matches!(record.status, ToolCallStatus::Failed { .. }))
    }
}

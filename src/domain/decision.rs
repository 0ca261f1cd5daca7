//! Decisions and the append-only ledger attached to projects and
//! interventions.

use serde::{Deserialize, Serialize};

use crate::core::time::{self, Audit};

/// Every audited action that can drive a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionKind {
    Accepted,
    Refused,
    Returned,
    RevisionRequest,
    Canceled,
    Postponed,
    Replanned,
    RemoveFromProgramBook,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Accepted => "accepted",
            DecisionKind::Refused => "refused",
            DecisionKind::Returned => "returned",
            DecisionKind::RevisionRequest => "revisionRequest",
            DecisionKind::Canceled => "canceled",
            DecisionKind::Postponed => "postponed",
            DecisionKind::Replanned => "replanned",
            DecisionKind::RemoveFromProgramBook => "removeFromProgramBook",
        }
    }
}

/// A recorded decision. Never mutated once appended; later decisions
/// supersede it by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    #[serde(rename = "typeId")]
    pub kind: DecisionKind,
    #[serde(default)]
    pub text: String,
    pub audit: Audit,
    /// Year the decision moves work into (absent for refusals/cancels).
    #[serde(rename = "targetYear", skip_serializing_if = "Option::is_none", default)]
    pub target_year: Option<i32>,
    /// Requested range for postponements and replans.
    #[serde(rename = "startYear", skip_serializing_if = "Option::is_none", default)]
    pub start_year: Option<i32>,
    #[serde(rename = "endYear", skip_serializing_if = "Option::is_none", default)]
    pub end_year: Option<i32>,
    /// Book targeted by a remove-from-program-book decision.
    #[serde(
        rename = "programBookId",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub program_book_id: Option<String>,
    /// Audit copies of the values the decision replaced.
    #[serde(
        rename = "previousPlanificationYear",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub previous_planification_year: Option<i32>,
    #[serde(
        rename = "previousStartYear",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub previous_start_year: Option<i32>,
    #[serde(
        rename = "previousEndYear",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub previous_end_year: Option<i32>,
}

impl Decision {
    pub fn new(kind: DecisionKind, actor: &str) -> Self {
        Self {
            id: time::new_id(),
            kind,
            text: String::new(),
            audit: Audit::stamp(actor),
            target_year: None,
            start_year: None,
            end_year: None,
            program_book_id: None,
            previous_planification_year: None,
            previous_start_year: None,
            previous_end_year: None,
        }
    }

    pub fn with_target_year(mut self, year: i32) -> Self {
        self.target_year = Some(year);
        self
    }

    pub fn with_range(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = Some(start_year);
        self.end_year = Some(end_year);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_program_book(mut self, program_book_id: impl Into<String>) -> Self {
        self.program_book_id = Some(program_book_id.into());
        self
    }
}

/// Newest-first, append-only decision list.
///
/// Position 0 is always the most recent decision; that ordering is a
/// consumer-visible contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionLedger(Vec<Decision>);

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a decision at index 0.
    pub fn record(&mut self, decision: Decision) {
        self.0.insert(0, decision);
    }

    /// The most recent decision, if any.
    pub fn latest(&self) -> Option<&Decision> {
        self.0.first()
    }

    pub fn has_kind(&self, kind: DecisionKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    /// Decisions newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//! Intervention aggregate: a single physical work item.

use serde::{Deserialize, Serialize};

use crate::core::config::PlanningConfig;
use crate::core::error::CapworksError;
use crate::domain::decision::{DecisionKind, DecisionLedger};
use crate::domain::project::ProjectType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterventionStatus {
    Wished,
    Waiting,
    Refused,
    Accepted,
    Integrated,
    Canceled,
}

impl InterventionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionStatus::Wished => "wished",
            InterventionStatus::Waiting => "waiting",
            InterventionStatus::Refused => "refused",
            InterventionStatus::Accepted => "accepted",
            InterventionStatus::Integrated => "integrated",
            InterventionStatus::Canceled => "canceled",
        }
    }
}

/// Monetary estimate in thousands of dollars.
///
/// Invariant: `balance = allowance - burned_down`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub allowance: f64,
    #[serde(rename = "burnedDown")]
    pub burned_down: f64,
    pub balance: f64,
}

impl Estimate {
    pub fn of_allowance(allowance: f64) -> Self {
        Self {
            allowance,
            burned_down: 0.0,
            balance: allowance,
        }
    }

    pub fn set_allowance(&mut self, allowance: f64) {
        self.allowance = allowance;
        self.balance = self.allowance - self.burned_down;
    }

    pub fn burn(&mut self, amount: f64) {
        self.burned_down += amount;
        self.balance = self.allowance - self.burned_down;
    }

    pub fn is_consistent(&self) -> bool {
        (self.balance - (self.allowance - self.burned_down)).abs() < 1e-9
    }
}

/// Physical asset worked on by an intervention (street segment, conduit...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
    /// Linear length in meters.
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionAnnualPeriod {
    pub year: i32,
    /// 0-based offset from the owning project's start year.
    pub rank: usize,
    #[serde(rename = "annualAllowance")]
    pub annual_allowance: f64,
    #[serde(rename = "accountId", skip_serializing_if = "Option::is_none", default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterventionAnnualDistribution {
    #[serde(rename = "annualPeriods")]
    pub annual_periods: Vec<InterventionAnnualPeriod>,
}

/// Weak back-reference to the owning project.
///
/// The project remains the authoritative owner of the association through
/// its `intervention_ids`; this link only carries what intervention-side
/// rules need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub id: String,
    #[serde(rename = "typeId")]
    pub type_id: ProjectType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: InterventionStatus,
    pub decisions: DecisionLedger,
    #[serde(rename = "planificationYear")]
    pub planification_year: i32,
    #[serde(rename = "interventionYear")]
    pub intervention_year: i32,
    pub estimate: Estimate,
    #[serde(rename = "annualDistribution", default)]
    pub annual_distribution: InterventionAnnualDistribution,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project: Option<ProjectLink>,
    #[serde(rename = "programId", skip_serializing_if = "Option::is_none", default)]
    pub program_id: Option<String>,
    #[serde(rename = "decisionRequired", default)]
    pub decision_required: bool,
    #[serde(rename = "requestorId", default)]
    pub requestor_id: String,
    #[serde(rename = "workTypeId", default)]
    pub work_type_id: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Intervention {
    /// Creates a standalone intervention in its initial `wished` status.
    pub fn new(id: impl Into<String>, planification_year: i32, allowance: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            status: InterventionStatus::Wished,
            decisions: DecisionLedger::new(),
            planification_year,
            intervention_year: planification_year,
            estimate: Estimate::of_allowance(allowance),
            annual_distribution: InterventionAnnualDistribution::default(),
            project: None,
            program_id: None,
            decision_required: false,
            requestor_id: String::new(),
            work_type_id: String::new(),
            assets: Vec::new(),
        }
    }

    /// Total asset length, the intervention's contribution to project length.
    pub fn asset_length(&self) -> f64 {
        self.assets.iter().map(|a| a.length).sum()
    }

    /// Recomputes the `decision_required` flag.
    ///
    /// True only while the intervention is waiting inside a program and the
    /// most recent decision (if any) has not already settled it.
    pub fn recompute_decision_required(&mut self) {
        self.decision_required = self.status == InterventionStatus::Waiting
            && self.program_id.is_some()
            && !matches!(
                self.decisions.latest().map(|d| d.kind),
                Some(DecisionKind::Refused) | Some(DecisionKind::Accepted)
            );
    }

    /// Boundary validation for created or imported interventions.
    pub fn validate(&self, config: &PlanningConfig) -> Result<(), CapworksError> {
        if self.id.trim().is_empty() {
            return Err(CapworksError::validation("id", "id cannot be empty"));
        }
        if !config.year_in_bounds(self.planification_year) {
            return Err(CapworksError::validation(
                "planificationYear",
                format!(
                    "year {} outside [{}, {}]",
                    self.planification_year, config.min_year, config.max_year
                ),
            ));
        }
        if !self.estimate.is_consistent() {
            return Err(CapworksError::validation(
                "estimate",
                "balance must equal allowance - burnedDown",
            ));
        }
        Ok(())
    }
}

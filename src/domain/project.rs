//! Project aggregate: a grouping of interventions sharing execution.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::config::PlanningConfig;
use crate::core::error::CapworksError;
use crate::domain::decision::DecisionLedger;
use crate::domain::intervention::Intervention;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    Planned,
    Programmed,
    PreliminaryOrdered,
    FinalOrdered,
    Postponed,
    Replanned,
    Canceled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::Programmed => "programmed",
            ProjectStatus::PreliminaryOrdered => "preliminaryOrdered",
            ProjectStatus::FinalOrdered => "finalOrdered",
            ProjectStatus::Postponed => "postponed",
            ProjectStatus::Replanned => "replanned",
            ProjectStatus::Canceled => "canceled",
        }
    }

    /// Statuses that mean "currently placed in some program book ordering".
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Programmed
                | ProjectStatus::PreliminaryOrdered
                | ProjectStatus::FinalOrdered
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "integrated")]
    Integrated,
    #[serde(rename = "integratedgp")]
    IntegratedGp,
    #[serde(rename = "nonIntegrated")]
    NonIntegrated,
    #[serde(rename = "other")]
    Other,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Integrated => "integrated",
            ProjectType::IntegratedGp => "integratedgp",
            ProjectType::NonIntegrated => "nonIntegrated",
            ProjectType::Other => "other",
        }
    }

    /// Project types whose interventions integrate instead of being accepted.
    pub fn integrates_interventions(&self) -> bool {
        matches!(self, ProjectType::Integrated | ProjectType::IntegratedGp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnnualPeriod {
    pub year: i32,
    /// 0-based offset from the project's start year.
    pub rank: usize,
    #[serde(rename = "annualAllowance")]
    pub annual_allowance: f64,
    #[serde(
        rename = "programBookId",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub program_book_id: Option<String>,
    #[serde(rename = "accountId", skip_serializing_if = "Option::is_none", default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnnualDistribution {
    #[serde(rename = "annualPeriods")]
    pub annual_periods: Vec<ProjectAnnualPeriod>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalBudget {
    pub allowance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePriority {
    pub service: String,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "typeId")]
    pub type_id: ProjectType,
    pub status: ProjectStatus,
    #[serde(rename = "startYear")]
    pub start_year: i32,
    #[serde(rename = "endYear")]
    pub end_year: i32,
    /// Ordered, duplicate-free. The project owns the association.
    #[serde(rename = "interventionIds", default)]
    pub intervention_ids: Vec<String>,
    /// Hydrated working view, never persisted.
    #[serde(skip)]
    pub interventions: Vec<Intervention>,
    #[serde(rename = "annualDistribution", default)]
    pub annual_distribution: ProjectAnnualDistribution,
    #[serde(rename = "globalBudget", default)]
    pub global_budget: GlobalBudget,
    /// Total linear length in meters, derived from intervention assets.
    #[serde(default)]
    pub length: f64,
    pub decisions: DecisionLedger,
    /// Work-area geometry. Absence (with type `other`) makes the project
    /// non-geolocated.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub geometry: Option<JsonValue>,
    #[serde(rename = "subCategoryIds", default)]
    pub sub_category_ids: Vec<String>,
    #[serde(rename = "servicePriorities", default)]
    pub service_priorities: Vec<ServicePriority>,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        type_id: ProjectType,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            type_id,
            status: ProjectStatus::Planned,
            start_year,
            end_year,
            intervention_ids: Vec::new(),
            interventions: Vec::new(),
            annual_distribution: ProjectAnnualDistribution::default(),
            global_budget: GlobalBudget::default(),
            length: 0.0,
            decisions: DecisionLedger::new(),
            geometry: None,
            sub_category_ids: Vec::new(),
            service_priorities: Vec::new(),
        }
    }

    pub fn contains_intervention(&self, intervention_id: &str) -> bool {
        self.intervention_ids.iter().any(|id| id == intervention_id)
    }

    /// Appends an intervention id, preserving ordered-unique semantics.
    pub fn link_intervention(&mut self, intervention_id: impl Into<String>) {
        let intervention_id = intervention_id.into();
        if !self.contains_intervention(&intervention_id) {
            self.intervention_ids.push(intervention_id);
        }
    }

    pub fn unlink_intervention(&mut self, intervention_id: &str) {
        self.intervention_ids.retain(|id| id != intervention_id);
        self.interventions.retain(|iv| iv.id != intervention_id);
    }

    /// Distinct program book ids across annual periods, in period order.
    pub fn program_book_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for period in &self.annual_distribution.annual_periods {
            if let Some(book_id) = &period.program_book_id {
                if !ids.iter().any(|id| id == book_id) {
                    ids.push(book_id.clone());
                }
            }
        }
        ids
    }

    pub fn clear_program_book_links(&mut self) {
        for period in &mut self.annual_distribution.annual_periods {
            period.program_book_id = None;
        }
    }

    /// Detaches one annual period from the given book, if linked.
    pub fn detach_period_from_book(&mut self, year: i32, program_book_id: &str) {
        for period in &mut self.annual_distribution.annual_periods {
            if period.year == year && period.program_book_id.as_deref() == Some(program_book_id) {
                period.program_book_id = None;
            }
        }
    }

    /// Boundary validation for created or imported projects.
    pub fn validate(&self, config: &PlanningConfig) -> Result<(), CapworksError> {
        if self.id.trim().is_empty() {
            return Err(CapworksError::validation("id", "id cannot be empty"));
        }
        if self.start_year > self.end_year {
            return Err(CapworksError::validation(
                "startYear",
                format!("startYear {} exceeds endYear {}", self.start_year, self.end_year),
            ));
        }
        for (field, year) in [("startYear", self.start_year), ("endYear", self.end_year)] {
            if !config.year_in_bounds(year) {
                return Err(CapworksError::validation(
                    field,
                    format!("year {} outside [{}, {}]", year, config.min_year, config.max_year),
                ));
            }
        }
        if self.type_id == ProjectType::Other
            && self.geometry.is_none()
            && !self.intervention_ids.is_empty()
        {
            return Err(CapworksError::validation(
                "interventionIds",
                "a non-geolocated project cannot carry interventions",
            ));
        }
        self.validate_program_book_prefix()?;
        Ok(())
    }

    /// Program book links may only occupy a prefix of consecutive annual
    /// periods: once period i holds a link, period i-1 must hold one too.
    pub fn validate_program_book_prefix(&self) -> Result<(), CapworksError> {
        let periods = &self.annual_distribution.annual_periods;
        for i in 1..periods.len() {
            if periods[i].program_book_id.is_some() && periods[i - 1].program_book_id.is_none() {
                return Err(CapworksError::validation(
                    "annualDistribution",
                    format!(
                        "program book link on period {} without one on period {}",
                        periods[i].year,
                        periods[i - 1].year
                    ),
                ));
            }
        }
        Ok(())
    }
}

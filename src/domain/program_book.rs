//! Program book aggregate: an annual planning batch ranking candidate
//! projects through priority scenarios.

use serde::{Deserialize, Serialize};

use crate::domain::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgramBookStatus {
    New,
    Programming,
    SubmittedPreliminary,
    SubmittedFinal,
}

impl ProgramBookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramBookStatus::New => "new",
            ProgramBookStatus::Programming => "programming",
            ProgramBookStatus::SubmittedPreliminary => "submittedPreliminary",
            ProgramBookStatus::SubmittedFinal => "submittedFinal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedProject {
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityLevel {
    pub rank: usize,
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// A ranking configuration. Goes stale (`is_outdated`) whenever underlying
/// project or intervention data changes under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityScenario {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "priorityLevels", default)]
    pub priority_levels: Vec<PriorityLevel>,
    #[serde(rename = "orderedProjects", default)]
    pub ordered_projects: Vec<OrderedProject>,
    #[serde(rename = "isOutdated", default)]
    pub is_outdated: bool,
}

impl PriorityScenario {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            priority_levels: Vec::new(),
            ordered_projects: Vec::new(),
            is_outdated: false,
        }
    }

    fn rerank(&mut self) {
        for (index, entry) in self.ordered_projects.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
    }

    fn append_project(&mut self, project_id: &str) {
        if !self.ordered_projects.iter().any(|o| o.project_id == project_id) {
            self.ordered_projects.push(OrderedProject {
                project_id: project_id.to_string(),
                rank: self.ordered_projects.len() + 1,
            });
        }
    }

    fn remove_project(&mut self, project_id: &str) {
        self.ordered_projects.retain(|o| o.project_id != project_id);
        self.rerank();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveKind {
    Budget,
    Length,
}

/// Target tracked by a program book, recomputed from member projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ObjectiveKind,
    #[serde(rename = "referenceValue")]
    pub reference_value: f64,
    #[serde(rename = "calculatedValue", default)]
    pub calculated_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramBook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "annualProgramId")]
    pub annual_program_id: String,
    pub status: ProgramBookStatus,
    #[serde(rename = "projectIds", default)]
    pub project_ids: Vec<String>,
    #[serde(rename = "removedProjectIds", default)]
    pub removed_project_ids: Vec<String>,
    #[serde(rename = "priorityScenarios", default)]
    pub priority_scenarios: Vec<PriorityScenario>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

impl ProgramBook {
    pub fn new(id: impl Into<String>, annual_program_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            annual_program_id: annual_program_id.into(),
            status: ProgramBookStatus::New,
            project_ids: Vec::new(),
            removed_project_ids: Vec::new(),
            priority_scenarios: vec![PriorityScenario::new("default")],
            objectives: Vec::new(),
        }
    }

    pub fn contains_project(&self, project_id: &str) -> bool {
        self.project_ids.iter().any(|id| id == project_id)
    }

    /// Admits a project into the book: membership plus a tail slot in every
    /// priority scenario.
    pub fn admit_project(&mut self, project_id: &str) {
        if !self.contains_project(project_id) {
            self.project_ids.push(project_id.to_string());
        }
        self.removed_project_ids.retain(|id| id != project_id);
        for scenario in &mut self.priority_scenarios {
            scenario.append_project(project_id);
            scenario.is_outdated = true;
        }
    }

    /// Applies a removal outcome: the project leaves membership and every
    /// ordering, and is remembered in `removed_project_ids`.
    pub fn apply_removal(&mut self, project_id: &str) {
        self.project_ids.retain(|id| id != project_id);
        if !self.removed_project_ids.iter().any(|id| id == project_id) {
            self.removed_project_ids.push(project_id.to_string());
        }
        for scenario in &mut self.priority_scenarios {
            scenario.remove_project(project_id);
            scenario.is_outdated = true;
        }
    }

    pub fn mark_outdated(&mut self) {
        for scenario in &mut self.priority_scenarios {
            scenario.is_outdated = true;
        }
    }

    pub fn is_outdated(&self) -> bool {
        self.priority_scenarios.iter().any(|s| s.is_outdated)
    }

    /// Recomputes every objective's calculated value from the member
    /// projects. The caller supplies exactly the hydrated members.
    pub fn recompute_objectives(&mut self, members: &[Project]) {
        let budget_total: f64 = members.iter().map(|p| p.global_budget.allowance).sum();
        let length_total: f64 = members.iter().map(|p| p.length).sum();
        for objective in &mut self.objectives {
            objective.calculated_value = match objective.kind {
                ObjectiveKind::Budget => budget_total,
                ObjectiveKind::Length => length_total,
            };
        }
    }
}

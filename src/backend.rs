use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::BackendError;
use crate::graph::InsertionPoint;
use crate::step::{self, Step, StepType};

/// Payload of a step created from an insertion point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStep {
    #[serde(default)]
    pub type_field: StepType,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl NewStep {
    pub fn of(type_field: StepType) -> Self {
        Self {
            type_field,
            ..Self::default()
        }
    }
}

/// One entry of a bulk top-level update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub type_field: StepType,
    pub execution_order: i32,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Outcome of executing a case without recording a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRun {
    pub case_id: String,
    /// Step ids in execution order.
    pub visited: Vec<String>,
    /// Action steps that have no action group assigned yet.
    pub unconfigured: Vec<String>,
}

impl DryRun {
    pub fn is_ready(&self) -> bool {
        self.unconfigured.is_empty()
    }
}

pub trait StepSource {
    fn fetch_steps(&self, case_id: &str) -> Result<Vec<Step>, BackendError>;

    fn insert_step(&mut self, case_id: &str, at: &InsertionPoint, new_step: NewStep) -> Result<Step, BackendError>;

    fn delete_step(&mut self, case_id: &str, step_id: &str) -> Result<(), BackendError>;

    /// Moves a step to the 1-based `location` among its siblings.
    fn reorder_step(&mut self, case_id: &str, step_id: &str, location: i32) -> Result<(), BackendError>;

    fn batch_replace(&mut self, case_id: &str, items: Vec<BatchItem>) -> Result<(), BackendError>;

    fn dry_run(&self, case_id: &str) -> Result<DryRun, BackendError>;
}

/// In-process cases. Inserts shift later siblings down, deletes leave gaps.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    cases: BTreeMap<String, Vec<Step>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, case_id: impl Into<String>, steps: Vec<Step>) -> Self {
        self.cases.insert(case_id.into(), steps);
        self
    }

    pub fn case_ids(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    fn case_mut(&mut self, case_id: &str) -> Result<&mut Vec<Step>, BackendError> {
        self.cases
            .get_mut(case_id)
            .ok_or_else(|| BackendError::CaseNotFound(case_id.to_string()))
    }

    fn case(&self, case_id: &str) -> Result<&Vec<Step>, BackendError> {
        self.cases
            .get(case_id)
            .ok_or_else(|| BackendError::CaseNotFound(case_id.to_string()))
    }
}

impl StepSource for MemoryBackend {
    fn fetch_steps(&self, case_id: &str) -> Result<Vec<Step>, BackendError> {
        self.case(case_id).cloned()
    }

    fn insert_step(&mut self, case_id: &str, at: &InsertionPoint, new_step: NewStep) -> Result<Step, BackendError> {
        if at.execution_order < 1 {
            return Err(BackendError::InvalidLocation(at.execution_order));
        }
        let steps = self.case_mut(case_id)?;
        let siblings = match &at.parent_id {
            None => steps,
            Some(parent_id) => {
                &mut step::find_step_mut(steps, parent_id)
                    .ok_or_else(|| BackendError::StepNotFound {
                        case_id: case_id.to_string(),
                        step_id: parent_id.clone(),
                    })?
                    .children
            }
        };

        let next = siblings
            .iter()
            .map(|sibling| sibling.execution_order)
            .max()
            .map_or(1, |last| last.saturating_add(1));
        let location = at.execution_order.min(next);
        for sibling in siblings.iter_mut() {
            if sibling.execution_order >= location {
                sibling.execution_order = sibling.execution_order.saturating_add(1);
            }
        }

        let created = Step {
            id: Uuid::new_v4().to_string(),
            type_field: new_step.type_field,
            execution_order: location,
            reference: new_step.reference,
            name: new_step.name,
            children: Vec::new(),
            parent_id: at.parent_id.clone(),
            case_id: Some(case_id.to_string()),
        };
        debug!(case_id, step_id = %created.id, location, "step inserted");
        siblings.push(created.clone());
        siblings.sort_by_key(|sibling| sibling.execution_order);
        Ok(created)
    }

    fn delete_step(&mut self, case_id: &str, step_id: &str) -> Result<(), BackendError> {
        let steps = self.case_mut(case_id)?;
        if step::find_step(steps, step_id).is_none() {
            return Err(BackendError::StepNotFound {
                case_id: case_id.to_string(),
                step_id: step_id.to_string(),
            });
        }
        *steps = step::without_step(steps, step_id);
        Ok(())
    }

    fn reorder_step(&mut self, case_id: &str, step_id: &str, location: i32) -> Result<(), BackendError> {
        if location < 1 {
            return Err(BackendError::InvalidLocation(location));
        }
        let steps = self.case_mut(case_id)?;
        let siblings = siblings_of(steps, step_id).ok_or_else(|| BackendError::StepNotFound {
            case_id: case_id.to_string(),
            step_id: step_id.to_string(),
        })?;

        let Some(old) = siblings
            .iter()
            .find(|sibling| sibling.id == step_id)
            .map(|sibling| sibling.execution_order)
        else {
            return Ok(());
        };
        for sibling in siblings.iter_mut() {
            let order = sibling.execution_order;
            if sibling.id == step_id {
                sibling.execution_order = location;
            } else if location > old && order > old && order <= location {
                sibling.execution_order -= 1;
            } else if location < old && order >= location && order < old {
                sibling.execution_order = sibling.execution_order.saturating_add(1);
            }
        }
        siblings.sort_by_key(|sibling| sibling.execution_order);
        debug!(case_id, step_id, from = old, to = location, "step reordered");
        Ok(())
    }

    fn batch_replace(&mut self, case_id: &str, items: Vec<BatchItem>) -> Result<(), BackendError> {
        let steps = self.case_mut(case_id)?;
        let mut replaced: Vec<Step> = items
            .into_iter()
            .map(|item| {
                // Existing steps keep their nested blocks.
                let children = item
                    .id
                    .as_deref()
                    .and_then(|id| steps.iter().find(|step| step.id == id))
                    .map(|step| step.children.clone())
                    .unwrap_or_default();
                Step {
                    id: item.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    type_field: item.type_field,
                    execution_order: item.execution_order,
                    reference: item.reference,
                    name: item.name,
                    children,
                    parent_id: None,
                    case_id: Some(case_id.to_string()),
                }
            })
            .collect();
        replaced.sort_by_key(|step| step.execution_order);
        debug!(case_id, steps = replaced.len(), "sequence replaced");
        *steps = replaced;
        Ok(())
    }

    fn dry_run(&self, case_id: &str) -> Result<DryRun, BackendError> {
        let steps = self.case(case_id)?;
        let mut report = DryRun {
            case_id: case_id.to_string(),
            visited: Vec::new(),
            unconfigured: Vec::new(),
        };
        step::walk(steps, &mut |step: &Step| {
            report.visited.push(step.id.clone());
            if step.type_field.is_action_like() && !step.is_configured() {
                report.unconfigured.push(step.id.clone());
            }
        });
        Ok(report)
    }
}

/// Sibling list that directly contains `step_id`.
fn siblings_of<'a>(steps: &'a mut Vec<Step>, step_id: &str) -> Option<&'a mut Vec<Step>> {
    if steps.iter().any(|step| step.id == step_id) {
        return Some(steps);
    }
    steps
        .iter_mut()
        .find_map(|step| siblings_of(&mut step.children, step_id))
}

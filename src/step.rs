use serde::{Deserialize, Serialize};

/// Block tag carried by a step in `type_field`.
///
/// Unrecognised tags are preserved verbatim and treated like actions when the
/// workflow graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepType {
    #[default]
    Assertion,
    ActionGroup,
    Condition,
    Loop,
    YesCase,
    NoCase,
    Unknown(String),
}

impl StepType {
    pub fn from_token(token: &str) -> Self {
        match token {
            "Assertion" => Self::Assertion,
            "ActionGroup" => Self::ActionGroup,
            "Condition" => Self::Condition,
            "Loop" => Self::Loop,
            "YesCase" => Self::YesCase,
            "NoCase" => Self::NoCase,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Assertion => "Assertion",
            Self::ActionGroup => "ActionGroup",
            Self::Condition => "Condition",
            Self::Loop => "Loop",
            Self::YesCase => "YesCase",
            Self::NoCase => "NoCase",
            Self::Unknown(token) => token,
        }
    }

    /// Steps that run a single action group (everything except the
    /// structural Condition/Loop blocks and branch entries).
    pub fn is_action_like(&self) -> bool {
        !matches!(
            self,
            Self::Condition | Self::Loop | Self::YesCase | Self::NoCase
        )
    }
}

impl From<String> for StepType {
    fn from(value: String) -> Self {
        Self::from_token(&value)
    }
}

impl From<StepType> for String {
    fn from(value: StepType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of test execution in a test case's nested execution tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub type_field: StepType,
    #[serde(default)]
    pub execution_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, type_field: StepType, execution_order: i32) -> Self {
        Self {
            id: id.into(),
            type_field,
            execution_order,
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<Step>) -> Self {
        self.children = children;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.reference.is_some()
    }

    /// Text shown on the node: the action group name, or a prompt to
    /// configure the step.
    pub fn display_label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Configure [{}]", self.type_field),
        }
    }
}

/// Parses a step sequence from backend JSON: either a bare array or an
/// object carrying a `steps` array.
pub fn parse_steps(input: &str) -> anyhow::Result<Vec<Step>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Bare(Vec<Step>),
        Wrapped { steps: Vec<Step> },
    }

    let payload: Payload = serde_json::from_str(input)?;
    Ok(match payload {
        Payload::Bare(steps) => steps,
        Payload::Wrapped { steps } => steps,
    })
}

pub fn find_step<'a>(steps: &'a [Step], id: &str) -> Option<&'a Step> {
    for step in steps {
        if step.id == id {
            return Some(step);
        }
        if let Some(found) = find_step(&step.children, id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn find_step_mut<'a>(steps: &'a mut [Step], id: &str) -> Option<&'a mut Step> {
    for step in steps.iter_mut() {
        if step.id == id {
            return Some(step);
        }
        if let Some(found) = find_step_mut(&mut step.children, id) {
            return Some(found);
        }
    }
    None
}

/// Returns a copy of the tree without the step `id` (and its subtree).
pub fn without_step(steps: &[Step], id: &str) -> Vec<Step> {
    steps
        .iter()
        .filter(|step| step.id != id)
        .map(|step| Step {
            children: without_step(&step.children, id),
            ..step.clone()
        })
        .collect()
}

/// Returns a copy of the tree where step `id` points at the given action
/// group.
pub fn with_reference(steps: &[Step], id: &str, reference: &str, name: &str) -> Vec<Step> {
    let mut updated = steps.to_vec();
    if let Some(step) = find_step_mut(&mut updated, id) {
        step.reference = Some(reference.to_string());
        step.name = Some(name.to_string());
    }
    updated
}

/// Depth-first walk in execution order.
pub fn walk<'a>(steps: &'a [Step], visit: &mut impl FnMut(&'a Step)) {
    for step in ordered(steps) {
        visit(step);
        walk(&step.children, visit);
    }
}

/// Siblings sorted by `execution_order`, ties kept in input order.
pub(crate) fn ordered(steps: &[Step]) -> Vec<&Step> {
    let mut sorted: Vec<&Step> = steps.iter().collect();
    sorted.sort_by_key(|step| step.execution_order);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<Step> {
        vec![
            Step::new("a1", StepType::Assertion, 1),
            Step::new("l1", StepType::Loop, 2)
                .with_children(vec![Step::new("a2", StepType::ActionGroup, 1)]),
        ]
    }

    #[test]
    fn parses_backend_payloads() {
        let bare = r#"[{"id":"a1","type_field":"Assertion","execution_order":1,"reference":"g1"}]"#;
        let steps = parse_steps(bare).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].type_field, StepType::Assertion);
        assert!(steps[0].is_configured());

        let wrapped = r#"{"steps":[{"id":"x","type_field":"Wait","execution_order":1}]}"#;
        let steps = parse_steps(wrapped).unwrap();
        assert_eq!(steps[0].type_field, StepType::Unknown("Wait".to_string()));
        assert!(steps[0].type_field.is_action_like());
    }

    #[test]
    fn unknown_tags_serialize_verbatim() {
        let step = Step::new("x", StepType::Unknown("Wait".to_string()), 3);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type_field"], "Wait");
        assert!(json.get("children").is_none());
    }

    #[test]
    fn labels_unconfigured_steps() {
        let mut step = Step::new("a1", StepType::Assertion, 1);
        assert_eq!(step.display_label(), "Configure [Assertion]");
        step.name = Some("Login".to_string());
        assert_eq!(step.display_label(), "Login");
    }

    #[test]
    fn removes_nested_steps() {
        let pruned = without_step(&tree(), "a2");
        assert!(find_step(&pruned, "a2").is_none());
        assert!(find_step(&pruned, "l1").unwrap().children.is_empty());
        assert_eq!(without_step(&tree(), "l1").len(), 1);
    }

    #[test]
    fn assigns_action_group_reference() {
        let updated = with_reference(&tree(), "a2", "group-7", "Checkout");
        let step = find_step(&updated, "a2").unwrap();
        assert_eq!(step.reference.as_deref(), Some("group-7"));
        assert_eq!(step.display_label(), "Checkout");
    }

    #[test]
    fn walks_in_execution_order() {
        let mut steps = tree();
        steps.reverse();
        let mut seen = Vec::new();
        walk(&steps, &mut |step| seen.push(step.id.clone()));
        assert_eq!(seen, vec!["a1", "l1", "a2"]);
    }
}

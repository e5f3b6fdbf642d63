use thiserror::Error;

/// Errors raised by the layout engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Edge '{edge}' references node '{node}', which is not in the node list")]
    UnknownNode { edge: String, node: String },
}

/// Errors reported by a step source (the test-case backend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Test case '{0}' not found")]
    CaseNotFound(String),

    #[error("Step '{step_id}' not found in test case '{case_id}'")]
    StepNotFound { case_id: String, step_id: String },

    #[error("Invalid execution position {0}, positions start at 1")]
    InvalidLocation(i32),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Node '{0}' is not part of the workflow graph")]
    UnknownNode(String),
}

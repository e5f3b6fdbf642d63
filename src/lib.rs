pub mod backend;
pub mod builder;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod session;
pub mod step;
pub mod store;
pub mod theme;

pub use backend::{MemoryBackend, StepSource};
pub use builder::build_graph;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use error::{BackendError, LayoutError, SessionError};
pub use graph::{EdgeKind, FlowGraph, GraphEdge, GraphNode, NodeKind};
pub use layout::{Layout, compute_layout};
pub use session::WorkflowSession;
pub use step::{Step, StepType};
pub use store::GraphStore;

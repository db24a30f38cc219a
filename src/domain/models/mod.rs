//! Domain models.

pub mod agent;
pub mod branch;
pub mod config;
pub mod context;
pub mod delegation;
pub mod event;
pub mod ids;
pub mod principal;
pub mod project;
pub mod subtask;
pub mod task;

pub use agent::{Agent, AgentAssignment};
pub use branch::Branch;
pub use config::Config;
pub use context::{
    ensure_map, normalize_context_id, ContextLevel, ContextRecord, ResolvedContext,
};
pub use delegation::{Delegation, DelegationStatus};
pub use event::{ChangeEvent, EntityKind};
pub use ids::{agent_id_for, canonical_agent_name, parse_id, resolve_agent_id, GLOBAL_SINGLETON};
pub use principal::{TokenKind, UserPrincipal};
pub use project::Project;
pub use subtask::{Subtask, SubtaskSummary};
pub use task::{ProgressEntry, Task, TaskPriority, TaskStatus};

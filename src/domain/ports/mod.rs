//! Ports (interfaces) the domain exposes to adapters.

pub mod agent_repository;
pub mod branch_repository;
pub mod context_repository;
pub mod delegation_repository;
pub mod dependency_repository;
pub mod notifier;
pub mod project_repository;
pub mod subtask_repository;
pub mod task_repository;

pub use agent_repository::AgentRepository;
pub use branch_repository::{BranchRepository, CounterDrift};
pub use context_repository::ContextRepository;
pub use delegation_repository::DelegationRepository;
pub use dependency_repository::{DependencyEdge, DependencyRepository};
pub use notifier::{ChangeNotifier, NullNotifier};
pub use project_repository::ProjectRepository;
pub use subtask_repository::SubtaskRepository;
pub use task_repository::{TaskFilter, TaskRepository};

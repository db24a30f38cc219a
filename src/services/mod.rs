//! Application services: use cases, facades, auth, and the context engine.

pub mod agent_service;
pub mod auth;
pub mod branch_service;
pub mod broadcast;
pub mod context;
pub mod counter_projector;
pub mod dependency_graph;
pub mod facade_registry;
pub mod project_service;
pub mod request_scope;
pub mod subtask_service;
pub mod task_service;

pub use agent_service::AgentService;
pub use auth::{AuthError, TokenVerifier};
pub use branch_service::BranchService;
pub use broadcast::BroadcastNotifier;
pub use context::{
    DelegationProcessor, DelegationQueue, InheritanceCache, NullDelegationQueue,
    UnifiedContextService,
};
pub use counter_projector::CounterProjector;
pub use dependency_graph::DependencyGraphService;
pub use facade_registry::{FacadeRegistry, UserFacades};
pub use project_service::ProjectService;
pub use request_scope::RequestScope;
pub use subtask_service::SubtaskService;
pub use task_service::TaskService;

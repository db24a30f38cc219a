//! SQLite persistence adapters.

pub mod agent_repository;
pub mod branch_repository;
pub mod connection;
pub mod context_repository;
pub mod delegation_repository;
pub mod dependency_repository;
pub mod migrations;
pub mod project_repository;
pub mod scope;
pub mod subtask_repository;
pub mod task_repository;

pub use agent_repository::SqliteAgentRepository;
pub use branch_repository::SqliteBranchRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError};
pub use context_repository::SqliteContextRepository;
pub use delegation_repository::SqliteDelegationRepository;
pub use dependency_repository::SqliteDependencyRepository;
pub use migrations::{embedded_migrations, Migration, MigrationError, Migrator};
pub use project_repository::SqliteProjectRepository;
pub use scope::UserScope;
pub use subtask_repository::SqliteSubtaskRepository;
pub use task_repository::SqliteTaskRepository;

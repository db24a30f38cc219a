//! Taskhub - agentic task-management and context-orchestration server
//!
//! An MCP server exposing tool-style RPC operations for managing
//! Projects -> Branches -> Tasks -> Subtasks and a parallel four-tier
//! context hierarchy (Global -> Project -> Branch -> Task), with:
//! - Dual-token authentication (platform OIDC + local API tokens)
//! - Per-user isolation on every read and write
//! - Inheritance-merged context resolution with caching
//! - A cycle-free task dependency graph
//! - Trigger-maintained branch counters with a self-heal path

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::Config;

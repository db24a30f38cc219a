//! Identifier handling shared across the domain.
//!
//! All primary keys are UUIDs stored in canonical form. Tool callers may
//! send either canonical (`xxxxxxxx-xxxx-...`) or compact 32-hex ids; both
//! parse here and normalize to canonical on the way in.

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Well-known id naming the per-user global context singleton.
pub const GLOBAL_SINGLETON: Uuid = Uuid::from_u128(1);

/// Fixed application namespace under which per-project agent namespaces are
/// derived. Changing this breaks every stored agent id.
const AGENT_ROOT_NAMESPACE: Uuid = Uuid::from_u128(0x6ba7_b810_9dad_11d1_80b4_00c0_4fd4_30c8);

/// Parse an identifier, accepting canonical (hyphenated) and compact
/// (32-hex) forms. Output is always canonical.
pub fn parse_id(field: &str, value: &str) -> DomainResult<Uuid> {
    Uuid::try_parse(value.trim()).map_err(|_| DomainError::invalid_format(field, value))
}

/// Normalize an agent identifier to its canonical kebab-case name.
/// Accepts `@name`, `Name With Spaces`, or `snake_case`.
pub fn canonical_agent_name(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('@')
        .to_lowercase()
        .replace([' ', '_'], "-")
}

/// Deterministically derive an agent UUID from its canonical name under a
/// per-project namespace, so `@coding-agent` maps to the same id everywhere
/// within one project.
pub fn agent_id_for(project_id: Uuid, name: &str) -> Uuid {
    let project_ns = Uuid::new_v5(&AGENT_ROOT_NAMESPACE, project_id.as_bytes());
    Uuid::new_v5(&project_ns, canonical_agent_name(name).as_bytes())
}

/// Resolve an agent identifier that may be a UUID (canonical or compact) or
/// a name. Names go through the v5 derivation.
pub fn resolve_agent_id(project_id: Uuid, identifier: &str) -> DomainResult<Uuid> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(DomainError::missing_field("agent_id"));
    }
    if let Ok(id) = parse_id("agent_id", trimmed) {
        return Ok(id);
    }
    Ok(agent_id_for(project_id, trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_singleton_is_the_documented_uuid() {
        assert_eq!(
            GLOBAL_SINGLETON.to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn parses_canonical_and_compact_forms() {
        let canonical = "a1a2a3a4-b1b2-c1c2-d1d2-e1e2e3e4e5e6";
        let compact = "a1a2a3a4b1b2c1c2d1d2e1e2e3e4e5e6";
        assert_eq!(
            parse_id("id", canonical).unwrap(),
            parse_id("id", compact).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        let err = parse_id("task_id", "not-a-uuid").unwrap_err();
        assert_eq!(err.code(), "INVALID_FORMAT");
    }

    #[test]
    fn agent_names_normalize_to_kebab_case() {
        assert_eq!(canonical_agent_name("@coding-agent"), "coding-agent");
        assert_eq!(canonical_agent_name("Coding Agent"), "coding-agent");
        assert_eq!(canonical_agent_name("coding_agent"), "coding-agent");
    }

    #[test]
    fn agent_id_derivation_is_deterministic_per_project() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        assert_eq!(agent_id_for(p1, "@coding-agent"), agent_id_for(p1, "coding agent"));
        assert_ne!(agent_id_for(p1, "coding-agent"), agent_id_for(p2, "coding-agent"));
    }

    #[test]
    fn resolve_accepts_uuid_or_name() {
        let project = Uuid::new_v4();
        let direct = Uuid::new_v4();
        assert_eq!(resolve_agent_id(project, &direct.to_string()).unwrap(), direct);
        assert_eq!(
            resolve_agent_id(project, "@review-agent").unwrap(),
            agent_id_for(project, "review-agent")
        );
    }
}

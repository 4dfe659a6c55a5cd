//! Problem fingerprinting.
//!
//! A fingerprint is a SHA-256 digest over the canonical JSON encoding of
//! `(tasks sorted by id, resources sorted by id, registry version tag)`.
//! Two inputs digest identically iff they are semantically equal, so the
//! fingerprint doubles as the schedule-cache key.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{Resource, Task};

#[derive(Serialize)]
struct CanonicalProblem<'a> {
    tasks: Vec<&'a Task>,
    resources: Vec<&'a Resource>,
    registry: &'a str,
}

/// Computes the hex-encoded fingerprint of a problem instance.
///
/// Input array order does not matter: tasks and resources are sorted by ID
/// before encoding. `registry_version` ties the digest to the active
/// soft-constraint registry so re-registering constraints invalidates
/// cached schedules.
pub fn problem_fingerprint(tasks: &[Task], resources: &[Resource], registry_version: &str) -> String {
    let mut sorted_tasks: Vec<&Task> = tasks.iter().collect();
    sorted_tasks.sort_by(|a, b| a.id.cmp(&b.id));
    let mut sorted_resources: Vec<&Resource> = resources.iter().collect();
    sorted_resources.sort_by(|a, b| a.id.cmp(&b.id));

    let canonical = CanonicalProblem {
        tasks: sorted_tasks,
        resources: sorted_resources,
        registry: registry_version,
    };
    // Serialization of these plain derive types cannot fail.
    let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Task>, Vec<Resource>) {
        let tasks = vec![
            Task::new("T1", 60, vec!["R".into()]).with_window(540, 720),
            Task::new("T2", 30, vec!["R".into()]).with_window(480, 900),
        ];
        let resources = vec![
            Resource::new("R").with_window(480, 1020),
            Resource::new("A").with_window(540, 900),
        ];
        (tasks, resources)
    }

    #[test]
    fn test_fingerprint_stable_under_reordering() {
        let (tasks, resources) = sample();
        let forward = problem_fingerprint(&tasks, &resources, "v1");

        let mut rev_tasks = tasks.clone();
        rev_tasks.reverse();
        let mut rev_resources = resources.clone();
        rev_resources.reverse();
        let reversed = problem_fingerprint(&rev_tasks, &rev_resources, "v1");

        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let (tasks, resources) = sample();
        let base = problem_fingerprint(&tasks, &resources, "v1");

        let mut changed = tasks.clone();
        changed[0].duration = 61;
        assert_ne!(base, problem_fingerprint(&changed, &resources, "v1"));
    }

    #[test]
    fn test_fingerprint_changes_with_registry_version() {
        let (tasks, resources) = sample();
        assert_ne!(
            problem_fingerprint(&tasks, &resources, "v1"),
            problem_fingerprint(&tasks, &resources, "v2")
        );
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let (tasks, resources) = sample();
        let fp = problem_fingerprint(&tasks, &resources, "v1");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

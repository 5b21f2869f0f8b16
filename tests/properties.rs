//! Property tests for the invariants the pipeline and queue promise.

use proptest::prelude::*;

use wakatime::deps::filter_dependencies;
use wakatime::heartbeat::{sanitize, Category, EntityType, Heartbeat, SanitizeConfig};
use wakatime::offline::Queue;

fn arb_entity_type() -> impl Strategy<Value = EntityType> {
    prop_oneof![
        Just(EntityType::File),
        Just(EntityType::App),
        Just(EntityType::Domain),
        Just(EntityType::Url),
    ]
}

fn arb_heartbeat() -> impl Strategy<Value = Heartbeat> {
    (
        "[a-zA-Z0-9/._-]{1,40}",
        arb_entity_type(),
        0u64..2_000_000_000,
        0u32..1_000_000,
        proptest::option::of("[a-zA-Z0-9_-]{1,20}"),
        proptest::option::of("[a-zA-Z0-9_-]{1,20}"),
        proptest::option::of(proptest::collection::vec("[a-z0-9_-]{1,30}", 0..8)),
        any::<bool>(),
    )
        .prop_map(
            |(entity, entity_type, secs, micros, project, branch, dependencies, is_write)| {
                Heartbeat {
                    entity: format!("/{}", entity),
                    entity_type,
                    category: Category::Coding,
                    time: secs as f64 + f64::from(micros % 1_000_000) / 1_000_000.0,
                    project,
                    branch,
                    dependencies,
                    is_write: Some(is_write),
                    ..Default::default()
                }
            },
        )
}

fn strict_config() -> SanitizeConfig {
    SanitizeConfig {
        file_patterns: vec![regex::Regex::new("(?i).*").unwrap()],
        project_patterns: vec![regex::Regex::new("(?i).*").unwrap()],
        branch_patterns: vec![regex::Regex::new("(?i).*").unwrap()],
        dependency_patterns: vec![regex::Regex::new("(?i).*").unwrap()],
        hide_project_folder: true,
    }
}

proptest! {
    /// Sanitise ∘ sanitise == sanitise, for both the empty and the
    /// everything-hidden configuration.
    #[test]
    fn sanitize_is_idempotent(h in arb_heartbeat()) {
        for config in [SanitizeConfig::default(), strict_config()] {
            let once = sanitize(h.clone(), &config);
            let twice = sanitize(once.clone(), &config);
            prop_assert_eq!(once, twice);
        }
    }

    /// The dependency list is duplicate-free, has no empty or overlong
    /// items, and is capped at 1000.
    #[test]
    fn dependency_filter_invariants(deps in proptest::collection::vec(".{0,250}", 0..64)) {
        let filtered = filter_dependencies(deps);

        prop_assert!(filtered.len() <= 1000);

        let mut seen = std::collections::HashSet::new();
        for d in &filtered {
            prop_assert!(!d.is_empty());
            prop_assert!(d.len() <= 200);
            prop_assert!(seen.insert(d.clone()), "duplicate {:?}", d);
        }
    }

    /// Fingerprints are deterministic and stable across encode/decode.
    #[test]
    fn fingerprint_survives_json_roundtrip(h in arb_heartbeat()) {
        let encoded = serde_json::to_string(&h).unwrap();
        let decoded: Heartbeat = serde_json::from_str(&encoded).unwrap();

        prop_assert_eq!(decoded.id(), h.id());
        prop_assert_eq!(decoded, h);
    }

    /// Pushing then popping returns exactly the pushed records (modulo
    /// fingerprint collisions, which collapse last-write-wins).
    #[test]
    fn queue_push_pop_roundtrip(hh in proptest::collection::vec(arb_heartbeat(), 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.bdb");

        let mut queue = Queue::open(&path).unwrap();
        queue.push_many(&hh).unwrap();

        let unique: std::collections::HashMap<String, Heartbeat> =
            hh.iter().map(|h| (h.id(), h.clone())).collect();

        prop_assert_eq!(queue.count().unwrap(), unique.len());

        let popped = queue.pop_many(hh.len().max(1)).unwrap();
        prop_assert_eq!(popped.len(), unique.len());

        for h in &popped {
            prop_assert_eq!(unique.get(&h.id()), Some(h));
        }

        prop_assert_eq!(queue.count().unwrap(), 0);
    }
}

use serde_json::json;

use super::*;
use crate::KeyPathParser;
use crate::ServiceRegistry;

fn registry() -> ServiceRegistry {
    ServiceRegistry::new(KeyPathParser::new("/services"))
}

#[test]
fn build_document_should_emit_one_group_per_service() {
    let mut r = registry();
    r.apply_put(b"/services/api/1", b"10.0.0.1:80");
    r.apply_put(b"/services/api/2", b"10.0.0.2:80");
    r.apply_put(b"/services/db/1", b"10.0.1.1:5432");
    r.apply_delete(b"/services/db/1");

    let groups = build_document(&r);

    assert_eq!(
        groups,
        vec![
            DiscoveryGroup::new(
                "api",
                vec!["10.0.0.1:80".to_string(), "10.0.0.2:80".to_string()]
            ),
            DiscoveryGroup::new("db", vec![]),
        ]
    );
}

#[test]
fn build_document_should_order_targets_by_numeric_instance_id() {
    let mut r = registry();
    r.apply_put(b"/services/api/10", b"ten");
    r.apply_put(b"/services/api/9", b"nine");
    r.apply_put(b"/services/api/100", b"hundred");

    let groups = build_document(&r);

    assert_eq!(groups[0].targets, vec!["nine", "ten", "hundred"]);
}

#[test]
fn build_document_should_be_stable_across_calls() {
    let mut r = registry();
    for (svc, id) in [("zeta", "1"), ("alpha", "3"), ("mid", "2"), ("alpha", "1")] {
        r.apply_put(format!("/services/{svc}/{id}").as_bytes(), id.as_bytes());
    }

    let first = encode_document(&build_document(&r)).unwrap();
    let second = encode_document(&build_document(&r)).unwrap();

    assert_eq!(first, second);
    let jobs: Vec<_> = build_document(&r)
        .iter()
        .map(|g| g.job().unwrap().to_string())
        .collect();
    assert_eq!(jobs, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn build_document_should_be_empty_for_empty_registry() {
    let groups = build_document(&registry());

    assert!(groups.is_empty());
    assert_eq!(encode_document(&groups).unwrap(), b"[]".to_vec());
}

#[test]
fn encode_document_should_follow_file_sd_schema() {
    let groups = vec![
        DiscoveryGroup::new("api", vec!["10.0.0.1:80".to_string()]),
        DiscoveryGroup::new("db", vec![]),
    ];

    let encoded: serde_json::Value =
        serde_json::from_slice(&encode_document(&groups).unwrap()).unwrap();

    assert_eq!(
        encoded,
        json!([
            {"targets": ["10.0.0.1:80"], "labels": {"job": "api"}},
            {"targets": [], "labels": {"job": "db"}}
        ])
    );
}

#[test]
fn discovery_group_should_expose_job_label() {
    let group = DiscoveryGroup::new("api", vec![]);

    assert_eq!(group.job(), Some("api"));
    assert_eq!(group.labels.len(), 1);
}

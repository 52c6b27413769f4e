use super::*;

#[test]
fn file_persister_should_write_json_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let persister = FilePersister::new(temp_dir.path().join("tgroups.json"));

    persister
        .persist(&[DiscoveryGroup::new("api", vec!["10.0.0.1:80".to_string()])])
        .unwrap();

    let written: Vec<DiscoveryGroup> =
        serde_json::from_slice(&std::fs::read(persister.path()).unwrap()).unwrap();
    assert_eq!(
        written,
        vec![DiscoveryGroup::new("api", vec!["10.0.0.1:80".to_string()])]
    );
}

#[test]
fn file_persister_should_replace_previous_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let persister = FilePersister::new(temp_dir.path().join("tgroups.json"));

    persister
        .persist(&[
            DiscoveryGroup::new("api", vec!["10.0.0.1:80".to_string()]),
            DiscoveryGroup::new("db", vec!["10.0.1.1:5432".to_string()]),
        ])
        .unwrap();
    persister.persist(&[]).unwrap();

    assert_eq!(std::fs::read_to_string(persister.path()).unwrap(), "[]");
}

#[test]
fn file_persister_should_report_write_failure_and_keep_old_content() {
    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    // parent path component is a regular file
    let persister = FilePersister::new(blocker.join("tgroups.json"));

    let result = persister.persist(&[DiscoveryGroup::new("api", vec![])]);

    assert!(matches!(
        result,
        Err(crate::Error::Persist(crate::PersistError::Io { .. }))
    ));
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "file");
}

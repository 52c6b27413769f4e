use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::PersistError;
use crate::ServiceRegistry;

pub const JOB_LABEL: &str = "job";

/// One Prometheus `file_sd` target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryGroup {
    /// Always serialized, even when empty
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl DiscoveryGroup {
    pub fn new(
        job: &str,
        targets: Vec<String>,
    ) -> Self {
        Self {
            targets,
            labels: BTreeMap::from([(JOB_LABEL.to_string(), job.to_string())]),
        }
    }

    pub fn job(&self) -> Option<&str> {
        self.labels.get(JOB_LABEL).map(String::as_str)
    }
}

/// Derives one group per known service, including services with no instances.
///
/// Groups are ordered by service name and targets by numeric instance id.
pub fn build_document(registry: &ServiceRegistry) -> Vec<DiscoveryGroup> {
    registry
        .services()
        .map(|(service, instances)| {
            let mut ordered: Vec<(&String, &String)> = instances.iter().collect();
            ordered.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

            DiscoveryGroup::new(
                service,
                ordered.into_iter().map(|(_, addr)| addr.clone()).collect(),
            )
        })
        .collect()
}

pub fn encode_document(groups: &[DiscoveryGroup]) -> std::result::Result<Vec<u8>, PersistError> {
    Ok(serde_json::to_vec(groups)?)
}

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;
use tracing::warn;

use super::KeyPathParser;
use super::RegistryKey;
use crate::WatchEvent;
use crate::WatchEventKind;

/// instance id -> address
pub type Instances = BTreeMap<String, String>;

/// What a single put or delete did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New instance stored
    Inserted,
    /// Existing instance got a different address
    Updated,
    /// Put carried the address already stored
    Unchanged,
    /// Put without an instance segment; nothing to store
    Ignored,
    /// Single instance removed; the service entry stays
    InstanceRemoved,
    /// Whole service removed
    ServiceRemoved,
    /// Delete of something not present
    Missing,
    /// Key outside the registry layout
    Unrecognized,
}

/// Local materialized view of `<prefix>/<service>/<instance> = address`
///
/// Single-writer: owned by whoever drives event application. Every operation is
/// idempotent and the last applied put for a key wins.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    parser: KeyPathParser,
    services: BTreeMap<String, Instances>,
}

impl ServiceRegistry {
    pub fn new(parser: KeyPathParser) -> Self {
        Self {
            parser,
            services: BTreeMap::new(),
        }
    }

    pub fn parser(&self) -> &KeyPathParser {
        &self.parser
    }

    pub fn apply(
        &mut self,
        event: &WatchEvent,
    ) -> ApplyOutcome {
        match event.kind {
            WatchEventKind::Put => self.apply_put(&event.key, &event.value),
            WatchEventKind::Delete => self.apply_delete(&event.key),
        }
    }

    pub fn apply_put(
        &mut self,
        key: &[u8],
        value: &[u8],
    ) -> ApplyOutcome {
        let Some(RegistryKey { service, instance }) = self.parse(key) else {
            return ApplyOutcome::Unrecognized;
        };
        let Some(instance) = instance else {
            return ApplyOutcome::Ignored;
        };

        let address = String::from_utf8_lossy(value).into_owned();
        let instances = self.services.entry(service).or_default();
        match instances.entry(instance) {
            Entry::Vacant(e) => {
                e.insert(address);
                ApplyOutcome::Inserted
            }
            Entry::Occupied(mut e) if e.get() != &address => {
                e.insert(address);
                ApplyOutcome::Updated
            }
            Entry::Occupied(_) => ApplyOutcome::Unchanged,
        }
    }

    pub fn apply_delete(
        &mut self,
        key: &[u8],
    ) -> ApplyOutcome {
        let Some(RegistryKey { service, instance }) = self.parse(key) else {
            return ApplyOutcome::Unrecognized;
        };

        match instance {
            None => match self.services.remove(&service) {
                Some(_) => ApplyOutcome::ServiceRemoved,
                None => ApplyOutcome::Missing,
            },
            // An emptied service keeps its entry and keeps showing up with no targets.
            Some(instance) => {
                let removed = self
                    .services
                    .get_mut(&service)
                    .and_then(|instances| instances.remove(&instance));
                match removed {
                    Some(_) => ApplyOutcome::InstanceRemoved,
                    None => ApplyOutcome::Missing,
                }
            }
        }
    }

    pub fn services(&self) -> impl Iterator<Item = (&String, &Instances)> {
        self.services.iter()
    }

    pub fn instances(
        &self,
        service: &str,
    ) -> Option<&Instances> {
        self.services.get(service)
    }

    pub fn address(
        &self,
        service: &str,
        instance: &str,
    ) -> Option<&str> {
        self.services.get(service)?.get(instance).map(String::as_str)
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn instance_count(&self) -> usize {
        self.services.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn parse(
        &self,
        key: &[u8],
    ) -> Option<RegistryKey> {
        let parsed = self.parser.parse(key);
        match &parsed {
            Some(k) => debug!(service = %k.service, instance = ?k.instance, "parsed registry key"),
            None => warn!("Unhandled key {:?}", String::from_utf8_lossy(key)),
        }
        parsed
    }
}

use regex::Regex;

/// Structured identity recovered from a registry key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryKey {
    pub service: String,
    /// All-digit instance segment; `None` for service-level keys
    pub instance: Option<String>,
}

/// Matches keys of the form `<prefix>/<service>[/<instance>]`
///
/// The prefix is matched literally, `service` is any non-empty segment without
/// `/`, and `instance` must be all ASCII digits. Anything else is unrecognized.
#[derive(Debug, Clone)]
pub struct KeyPathParser {
    prefix: String,
    pattern: Regex,
}

impl KeyPathParser {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/').to_string();
        let pattern = format!(r"^{}/([^/]+)(?:/([0-9]+))?$", regex::escape(&prefix));
        Self {
            // escaped literal plus fixed groups always compiles
            pattern: Regex::new(&pattern).expect("registry key pattern is valid"),
            prefix,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `None` for keys outside the pattern, including non UTF-8 keys.
    pub fn parse(
        &self,
        key: &[u8],
    ) -> Option<RegistryKey> {
        let key = std::str::from_utf8(key).ok()?;
        let captures = self.pattern.captures(key)?;

        Some(RegistryKey {
            service: captures.get(1)?.as_str().to_string(),
            instance: captures.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every display name ever banned from one network host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    pub host: String,
    pub names: Vec<String>,
    pub banned_at: DateTime<Utc>,
}

impl BanRecord {
    pub fn new(host: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            host: host.into(),
            names,
            banned_at: Utc::now(),
        }
    }

    /// Add names not already on the record, ignoring case
    pub fn merge_names<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        for name in names {
            if !self.has_name(&name) {
                self.names.push(name);
            }
        }
    }

    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_names_skips_case_duplicates() {
        let mut record = BanRecord::new("10.0.0.1", vec!["Troll".to_string()]);
        record.merge_names(vec!["troll".to_string(), "Troll2".to_string()]);

        assert_eq!(record.names, vec!["Troll".to_string(), "Troll2".to_string()]);
        assert!(record.has_name("TROLL2"));
    }
}

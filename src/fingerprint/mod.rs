//! Content fingerprint guard
//!
//! Detects repeat uploads by hashing the exact upload text. Detection is
//! advisory: the guard reports, the caller decides. Digests are scoped per
//! collection so identical bytes uploaded to unrelated datasets do not collide.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One previously seen upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFingerprint {
    pub digest: String,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintCheck {
    pub collection: String,
    pub digest: String,
    pub is_duplicate: bool,
}

/// How long recorded digests are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never forget an upload
    #[default]
    Permanent,
    /// Forget digests recorded more than this many days ago
    MaxAgeDays(u32),
    /// Keep only the newest entries per collection
    MaxEntries(usize),
}

/// Persisted set of seen digests, per collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintLedger {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<UploadFingerprint>>,
}

impl FingerprintLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a digest was recorded for a collection
    pub fn contains(&self, collection: &str, digest: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|seen| seen.iter().any(|f| f.digest == digest))
    }

    /// Append a digest; returns false when it was already present
    pub fn insert(&mut self, collection: &str, digest: &str, now: DateTime<Utc>) -> bool {
        if self.contains(collection, digest) {
            return false;
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(UploadFingerprint {
                digest: digest.to_string(),
                recorded_at: now,
            });
        true
    }

    /// Digests recorded for a collection, oldest first
    pub fn digests(&self, collection: &str) -> Vec<&str> {
        self.collections
            .get(collection)
            .map(|seen| seen.iter().map(|f| f.digest.as_str()).collect())
            .unwrap_or_default()
    }

    /// Total number of recorded digests across collections
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries the policy no longer keeps; returns how many were removed
    pub fn apply_retention(&mut self, policy: RetentionPolicy, now: DateTime<Utc>) -> usize {
        let before = self.len();
        match policy {
            RetentionPolicy::Permanent => return 0,
            RetentionPolicy::MaxAgeDays(days) => {
                let cutoff = now - Duration::days(i64::from(days));
                for seen in self.collections.values_mut() {
                    seen.retain(|f| f.recorded_at >= cutoff);
                }
            }
            RetentionPolicy::MaxEntries(max) => {
                for seen in self.collections.values_mut() {
                    seen.sort_by_key(|f| f.recorded_at);
                    let excess = seen.len().saturating_sub(max);
                    seen.drain(..excess);
                }
            }
        }
        self.collections.retain(|_, seen| !seen.is_empty());
        before - self.len()
    }
}

/// Stateless duplicate-upload guard
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintGuard;

impl FingerprintGuard {
    pub fn new() -> Self {
        Self
    }

    /// Check upload text against the ledger without modifying it
    pub fn check(&self, collection: &str, raw_text: &str, ledger: &FingerprintLedger) -> FingerprintCheck {
        let digest = digest(raw_text);
        let is_duplicate = ledger.contains(collection, &digest);
        FingerprintCheck {
            collection: collection.to_string(),
            digest,
            is_duplicate,
        }
    }

    /// Record a digest once its upload has been persisted
    pub fn record(
        &self,
        collection: &str,
        digest: &str,
        ledger: &mut FingerprintLedger,
        now: DateTime<Utc>,
    ) -> bool {
        ledger.insert(collection, digest, now)
    }
}

/// Lower-case hex SHA-256 of the exact upload text
pub fn digest(raw_text: &str) -> String {
    format!("{:x}", Sha256::digest(raw_text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_digest_is_stable_and_sensitive() {
        let a = digest("year,male\n1981,1\n");
        assert_eq!(a, digest("year,male\n1981,1\n"));
        assert_ne!(a, digest("year,male\n1981,2\n"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_check_then_record() {
        let guard = FingerprintGuard::new();
        let mut ledger = FingerprintLedger::new();
        let text = "country,1981\nJapan,1\n";

        let first = guard.check("destination", text, &ledger);
        assert!(!first.is_duplicate);
        assert!(guard.record("destination", &first.digest, &mut ledger, at(1)));
        assert!(!guard.record("destination", &first.digest, &mut ledger, at(2)));

        let second = guard.check("destination", text, &ledger);
        assert!(second.is_duplicate);
        assert_eq!(second.digest, first.digest);
    }

    #[test]
    fn test_scoped_per_collection() {
        let guard = FingerprintGuard::new();
        let mut ledger = FingerprintLedger::new();
        let text = "same bytes";
        let check = guard.check("age", text, &ledger);
        guard.record("age", &check.digest, &mut ledger, at(1));

        assert!(guard.check("age", text, &ledger).is_duplicate);
        assert!(!guard.check("civilStatus", text, &ledger).is_duplicate);
    }

    #[test]
    fn test_retention_max_age() {
        let mut ledger = FingerprintLedger::new();
        ledger.insert("age", "old", at(1));
        ledger.insert("age", "new", at(20));

        assert_eq!(ledger.apply_retention(RetentionPolicy::Permanent, at(30)), 0);
        assert_eq!(ledger.apply_retention(RetentionPolicy::MaxAgeDays(15), at(30)), 1);
        assert_eq!(ledger.digests("age"), vec!["new"]);
    }

    #[test]
    fn test_retention_max_entries() {
        let mut ledger = FingerprintLedger::new();
        ledger.insert("sex", "a", at(1));
        ledger.insert("sex", "b", at(2));
        ledger.insert("sex", "c", at(3));
        ledger.insert("orig", "z", at(1));

        assert_eq!(ledger.apply_retention(RetentionPolicy::MaxEntries(2), at(4)), 1);
        assert_eq!(ledger.digests("sex"), vec!["b", "c"]);
        assert_eq!(ledger.digests("orig"), vec!["z"]);

        assert_eq!(ledger.apply_retention(RetentionPolicy::MaxEntries(0), at(4)), 3);
        assert!(ledger.is_empty());
    }
}

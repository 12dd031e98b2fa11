//! Probe request planning
//!
//! Turns the selected latest record into the set of store lookups for one
//! iteration: every record-keyed sub-resource for each encodable record id,
//! plus the checkpoint-keyed ones when a checkpoint number is known.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::codec::{EncodingError, IdFormat, LookupKey, encode_record_id, encode_sequence_str};
use crate::poller::SequencedRecord;

/// Logical object kinds served by the transactions store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubResource {
    #[serde(rename = "tx")]
    Transaction,
    #[serde(rename = "fx")]
    Effects,
    #[serde(rename = "tx2c")]
    TxToCheckpoint,
    #[serde(rename = "ev")]
    Events,
    #[serde(rename = "cs")]
    CheckpointSummary,
    #[serde(rename = "cc")]
    CheckpointContents,
}

impl SubResource {
    pub const ALL: [SubResource; 6] = [
        SubResource::Transaction,
        SubResource::Effects,
        SubResource::TxToCheckpoint,
        SubResource::Events,
        SubResource::CheckpointSummary,
        SubResource::CheckpointContents,
    ];

    /// Path segment used in store URLs
    pub fn code(self) -> &'static str {
        match self {
            SubResource::Transaction => "tx",
            SubResource::Effects => "fx",
            SubResource::TxToCheckpoint => "tx2c",
            SubResource::Events => "ev",
            SubResource::CheckpointSummary => "cs",
            SubResource::CheckpointContents => "cc",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SubResource::Transaction => "Transaction",
            SubResource::Effects => "Effects",
            SubResource::TxToCheckpoint => "Tx→Checkpoint",
            SubResource::Events => "Events",
            SubResource::CheckpointSummary => "Checkpoint Summary",
            SubResource::CheckpointContents => "Checkpoint Contents",
        }
    }

    /// Keyed by checkpoint sequence number rather than record id
    pub fn is_checkpoint_keyed(self) -> bool {
        matches!(
            self,
            SubResource::CheckpointSummary | SubResource::CheckpointContents
        )
    }
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.code())
    }
}

/// One store lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub key: LookupKey,
    pub sub_resource: SubResource,
    pub display_name: String,
    /// Record id or checkpoint number the key was derived from
    pub source: String,
}

impl ProbeRequest {
    pub fn new(key: LookupKey, sub_resource: SubResource, source: impl Into<String>) -> Self {
        Self {
            key,
            sub_resource,
            display_name: sub_resource.display_name().to_string(),
            source: source.into(),
        }
    }

    /// `<base>/<key>/<code>`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.key,
            self.sub_resource.code()
        )
    }
}

/// A key that could not be derived and was left out of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    pub source: String,
    pub checkpoint_keyed: bool,
    pub error: EncodingError,
}

/// The requests for one iteration plus whatever had to be skipped
#[derive(Debug, Clone, Default)]
pub struct ProbePlan {
    pub requests: Vec<ProbeRequest>,
    pub skipped: Vec<SkippedKey>,
    /// Record ids that encoded successfully
    pub record_keys: usize,
}

impl ProbePlan {
    /// Build the plan for `record`, probing at most `max_records` record ids.
    pub fn build(
        record: &SequencedRecord,
        id_format: IdFormat,
        resources: &[SubResource],
        max_records: usize,
    ) -> Self {
        let mut plan = ProbePlan::default();
        let record_resources: Vec<SubResource> = resources
            .iter()
            .copied()
            .filter(|r| !r.is_checkpoint_keyed())
            .collect();
        let checkpoint_resources: Vec<SubResource> = resources
            .iter()
            .copied()
            .filter(|r| r.is_checkpoint_keyed())
            .collect();

        for id in record.record_ids.iter().take(max_records) {
            match encode_record_id(id, id_format) {
                Ok(key) => {
                    plan.record_keys += 1;
                    for resource in &record_resources {
                        plan.requests
                            .push(ProbeRequest::new(key.clone(), *resource, id.clone()));
                    }
                }
                Err(error) => {
                    warn!("skipping record {}: {}", id, error);
                    plan.skipped.push(SkippedKey {
                        source: id.clone(),
                        checkpoint_keyed: false,
                        error,
                    });
                }
            }
        }

        if let (Some(raw), false) = (&record.checkpoint, checkpoint_resources.is_empty()) {
            match encode_sequence_str(raw) {
                Ok(key) => {
                    for resource in &checkpoint_resources {
                        plan.requests
                            .push(ProbeRequest::new(key.clone(), *resource, raw.clone()));
                    }
                }
                Err(error) => {
                    warn!("skipping checkpoint resources for '{}': {}", raw, error);
                    plan.skipped.push(SkippedKey {
                        source: raw.clone(),
                        checkpoint_keyed: true,
                        error,
                    });
                }
            }
        }

        plan
    }

    /// At least one record id could be encoded
    pub fn has_record_keys(&self) -> bool {
        self.record_keys > 0
    }

    /// Why this plan cannot be probed, if it cannot
    pub fn skip_reason(&self) -> Option<&'static str> {
        if !self.has_record_keys() {
            Some("no record id could be encoded")
        } else if self.requests.is_empty() {
            Some("no configured sub-resource applies to this record")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_sequence_number;
    use crate::rpc::NodeEndpoint;

    fn record(ids: &[&str], checkpoint: Option<&str>) -> SequencedRecord {
        SequencedRecord {
            sequence_number: 12,
            record_ids: ids.iter().map(|s| s.to_string()).collect(),
            checkpoint: checkpoint.map(str::to_string),
            source_endpoint: NodeEndpoint::new("http://n"),
            latency_secs: 0.1,
        }
    }

    #[test]
    fn test_codes_and_serde_names_agree() {
        for resource in SubResource::ALL {
            let json = serde_json::to_string(&resource).unwrap();
            assert_eq!(json, format!("\"{}\"", resource.code()));
        }
    }

    #[test]
    fn test_url_layout() {
        let req = ProbeRequest::new(encode_sequence_number(1), SubResource::CheckpointSummary, "1");
        assert_eq!(
            req.url("https://transactions.sui.io/mainnet/"),
            "https://transactions.sui.io/mainnet/AQAAAAAAAAA/cs"
        );
        assert_eq!(req.display_name, "Checkpoint Summary");
    }

    #[test]
    fn test_plan_with_checkpoint() {
        let plan = ProbePlan::build(&record(&["ABC123"], Some("12")), IdFormat::Base58, &SubResource::ALL, 3);
        assert_eq!(plan.requests.len(), 6);
        assert!(plan.skipped.is_empty());
        let cs = plan
            .requests
            .iter()
            .find(|r| r.sub_resource == SubResource::CheckpointSummary)
            .unwrap();
        assert_eq!(cs.key, encode_sequence_number(12));
    }

    #[test]
    fn test_plan_without_checkpoint_omits_checkpoint_codes() {
        let plan = ProbePlan::build(&record(&["ABC123"], None), IdFormat::Base58, &SubResource::ALL, 3);
        assert_eq!(plan.requests.len(), 4);
        assert!(plan.requests.iter().all(|r| !r.sub_resource.is_checkpoint_keyed()));
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn test_bad_checkpoint_skips_only_checkpoint_codes() {
        let plan = ProbePlan::build(&record(&["ABC123"], Some("n/a")), IdFormat::Base58, &SubResource::ALL, 3);
        assert_eq!(plan.requests.len(), 4);
        assert_eq!(plan.skipped.len(), 1);
        assert!(plan.skipped[0].checkpoint_keyed);
        assert!(plan.has_record_keys());
    }

    #[test]
    fn test_bad_record_id_skips_that_record() {
        let plan = ProbePlan::build(&record(&["ABC0", "ABC123"], None), IdFormat::Base58, &SubResource::ALL, 3);
        assert_eq!(plan.record_keys, 1);
        assert_eq!(plan.requests.len(), 4);
        assert!(plan.requests.iter().all(|r| r.source == "ABC123"));
        assert_eq!(plan.skipped[0].source, "ABC0");
    }

    #[test]
    fn test_no_encodable_record_id() {
        let plan = ProbePlan::build(&record(&["0OIl"], Some("12")), IdFormat::Base58, &SubResource::ALL, 3);
        assert!(!plan.has_record_keys());
        assert_eq!(plan.skip_reason(), Some("no record id could be encoded"));
    }

    #[test]
    fn test_checkpoint_only_resources_without_checkpoint() {
        let resources = [SubResource::CheckpointSummary, SubResource::CheckpointContents];
        let plan = ProbePlan::build(&record(&["ABC123"], None), IdFormat::Base58, &resources, 3);
        assert!(plan.has_record_keys());
        assert!(plan.requests.is_empty());
        assert!(plan.skip_reason().is_some());

        let plan = ProbePlan::build(&record(&["ABC123"], Some("12")), IdFormat::Base58, &resources, 3);
        assert_eq!(plan.requests.len(), 2);
        assert_eq!(plan.skip_reason(), None);
    }

    #[test]
    fn test_max_records_limit() {
        let plan = ProbePlan::build(
            &record(&["A1", "B2", "C3", "D4"], None),
            IdFormat::Base58,
            &[SubResource::Transaction],
            2,
        );
        assert_eq!(plan.requests.len(), 2);
        assert_eq!(plan.record_keys, 2);
    }
}

//! Trigger input: "an object landed in the staging area".
//!
//! Accepts the S3 event-notification document that both S3 and MinIO emit.
//! Object keys arrive form-encoded (`+` for space, `%XX` escapes).

use serde::{Deserialize, Serialize};
use stagegate_common::{GateError, Result};

/// One staged object to triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreated {
    pub bucket: String,
    pub key: String,
}

impl ObjectCreated {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn source_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Keys ending in `/` are folder placeholders, not uploads.
    pub fn is_folder_marker(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl S3Event {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Decoded bucket/key pairs, in record order.
    pub fn objects(&self) -> Result<Vec<ObjectCreated>> {
        self.records
            .iter()
            .map(|record| {
                Ok(ObjectCreated {
                    bucket: record.s3.bucket.name.clone(),
                    key: decode_key(&record.s3.object.key)?,
                })
            })
            .collect()
    }
}

fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| GateError::Parse(format!("Object key {:?} is not valid UTF-8: {}", raw, e)))
}

/// Job id for an upload: the key's file name without its last extension.
///
/// Leading dots belong to the name, so `.env` stays `.env`.
pub fn derive_job_id(key: &str) -> String {
    let base = crate::quarantine::basename(key);
    let leading_dots = base.len() - base.trim_start_matches('.').len();

    match base[leading_dots..].rfind('.') {
        Some(dot) => base[..leading_dots + dot].to_string(),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIO_EVENT: &str = r#"{
        "EventName": "s3:ObjectCreated:Put",
        "Key": "staging/uploads/job-42.csv",
        "Records": [{
            "eventVersion": "2.0",
            "eventSource": "minio:s3",
            "eventName": "s3:ObjectCreated:Put",
            "s3": {
                "s3SchemaVersion": "1.0",
                "bucket": {"name": "staging", "arn": "arn:aws:s3:::staging"},
                "object": {"key": "uploads%2Fmarch+report%282%29.csv", "size": 120}
            }
        }]
    }"#;

    #[test]
    fn test_parse_minio_event() {
        let event = S3Event::from_json(MINIO_EVENT).unwrap();
        let objects = event.objects().unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].bucket, "staging");
        assert_eq!(objects[0].key, "uploads/march report(2).csv");
        assert_eq!(
            event.records[0].event_name.as_deref(),
            Some("s3:ObjectCreated:Put")
        );
    }

    #[test]
    fn test_event_without_records() {
        let event = S3Event::from_json(r#"{"Event": "s3:TestEvent"}"#).unwrap();
        assert!(event.objects().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_event() {
        assert!(S3Event::from_json(r#"{"Records": [{"s3": {}}]}"#).is_err());
    }

    #[test]
    fn test_derive_job_id() {
        assert_eq!(derive_job_id("uploads/job-42.csv"), "job-42");
        assert_eq!(derive_job_id("job-42.csv"), "job-42");
        assert_eq!(derive_job_id("a/b/archive.tar.gz"), "archive.tar");
        assert_eq!(derive_job_id("uploads/noext"), "noext");
        assert_eq!(derive_job_id(".env"), ".env");
        assert_eq!(derive_job_id("uploads/.hidden.csv"), ".hidden");
    }

    #[test]
    fn test_source_uri_and_folder_marker() {
        let object = ObjectCreated::new("staging", "uploads/job-42.csv");
        assert_eq!(object.source_uri(), "s3://staging/uploads/job-42.csv");
        assert!(!object.is_folder_marker());
        assert!(ObjectCreated::new("staging", "uploads/").is_folder_marker());
    }
}

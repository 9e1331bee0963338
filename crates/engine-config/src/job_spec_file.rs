use crate::error::ConfigError;
use model::JobSpec;
use std::path::Path;

/// Loads a `JobSpec` from a JSON config file. Credential loading and the
/// CLI/entry scaffolding that would normally resolve that file's path stay
/// out of scope (§1); this only turns a JSON document a caller already has
/// on disk into the typed value the Coordinator is built from.
pub fn load_job_spec<P: AsRef<Path>>(path: P) -> Result<JobSpec, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        detail: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_well_formed_job_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{
                "job_id": "11111111-1111-4111-8111-111111111111",
                "source": {"engine":"mysql","host":"h","port":3306,"user":"u","secret":"s","database":"db","table":"t"},
                "destination": {"engine":"mysql","host":"h2","port":3306,"user":"u","secret":"s","database":"db2","table":"t"},
                "blob_store": {"bucket":"bkt","key_prefix":"prefix","access_id":"AKIA","secret":"shh","region":"us-east-1"},
                "batch_size": 1000
            }"#,
        )
        .unwrap();

        let spec = load_job_spec(&path).unwrap();
        assert_eq!(spec.batch_size, 1000);
        assert_eq!(spec.source.table, "t");
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_job_spec(&path), Err(ConfigError::InvalidJson { .. })));
    }
}

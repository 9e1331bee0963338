use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Layered configuration source: system environment variables overlaid
/// with an optional `.env`-style file. Credential loading itself stays an
/// external collaborator -- this only resolves the names the job spec
/// needs (host/port/user/secret/database/bucket/...) from whichever layer
/// set them last.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_system() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        self.parse_env_content(&content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingSetting(key.to_string()))
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(eq_pos) = line.find('=') else {
                return Err(ConfigError::MalformedLine { line: line_num + 1 });
            };

            let key = line[..eq_pos].trim();
            let value = line[eq_pos + 1..].trim();

            if key.is_empty() {
                return Err(ConfigError::EmptyKey { line: line_num + 1 });
            }

            self.vars.insert(key.to_string(), Self::unquote(value));
        }

        Ok(())
    }

    fn unquote(value: &str) -> String {
        let value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_key_value_pairs() {
        let mut env = EnvManager::default();
        env.parse_env_content("# comment\nHOST=localhost\nPORT=3306\n").unwrap();
        assert_eq!(env.get("HOST"), Some("localhost"));
        assert_eq!(env.get("PORT"), Some("3306"));
    }

    #[test]
    fn strips_matching_quotes() {
        let mut env = EnvManager::default();
        env.parse_env_content("SECRET=\"s3cr3t with spaces\"\nBUCKET='bkt'\n").unwrap();
        assert_eq!(env.get("SECRET"), Some("s3cr3t with spaces"));
        assert_eq!(env.get("BUCKET"), Some("bkt"));
    }

    #[test]
    fn rejects_malformed_lines() {
        let mut env = EnvManager::default();
        let err = env.parse_env_content("NOT_KEY_VALUE").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { line: 1 }));
    }

    #[test]
    fn require_fails_on_missing_key() {
        let env = EnvManager::default();
        assert!(matches!(env.require("DOES_NOT_EXIST"), Err(ConfigError::MissingSetting(_))));
    }
}

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Config;
use crate::store::codec;

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config.json")
}

/// Load the config record; a missing file yields the defaults, a malformed
/// one surfaces `Corrupt`.
pub fn load(root: &Path) -> Result<Config> {
    Ok(codec::read_record(&config_path(root))?.unwrap_or_default())
}

pub fn save(root: &Path, config: &Config) -> Result<()> {
    codec::write_record(&config_path(root), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registration;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_default() {
        let dir = tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.default_project, "general");
        assert!(config.registration.is_none());
    }

    #[test]
    fn registration_round_trips() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.registration = Some(Registration {
            user_name: "user_ab12cd34".into(),
            user_email: "hash_ab12cd34@example.com".into(),
            api_key: "key".into(),
            user_id: None,
            fingerprint: Some("fp".into()),
            registered_at: Utc::now(),
            server_url: "https://example.com".into(),
        });
        save(dir.path(), &config).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.registration, config.registration);
    }
}

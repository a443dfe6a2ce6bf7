//! Dataset configuration fingerprinting.
//!
//! A compiled dataset's output directory is named after a stable hash of
//! the full option set plus a readable suffix of the options that most
//! often vary between runs, so distinct configurations never overwrite one
//! another.

use sha2::{Digest, Sha256};

/// Options that identify one dataset compilation run.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub num_fillers: usize,
    pub fix_fillers: bool,
    pub swap_fillers: String,
    pub filter: String,
    pub version: u64,
}

impl DatasetConfig {
    /// Stable directory name for this configuration:
    /// `dataset-cfg=<hash16>[__xforms=...][__filt=...]__fix=...__n=...__vers=...`.
    #[must_use]
    pub fn id(&self) -> String {
        let mut pairs = vec![
            ("filter", self.filter.clone()),
            ("fix_fillers", self.fix_fillers.to_string()),
            ("num_fillers", self.num_fillers.to_string()),
            ("swap_fillers", self.swap_fillers.clone()),
            ("version", self.version.to_string()),
        ];
        pairs.sort();
        let unique = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("_");
        let digest = Sha256::digest(unique.as_bytes());
        let hash: String = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .chars()
            .take(16)
            .collect();

        let mut id = format!("dataset-cfg={hash}");
        if !self.swap_fillers.is_empty() {
            id.push_str(&format!("__xforms={}", self.swap_fillers));
        }
        if !self.filter.is_empty() {
            id.push_str(&format!("__filt={}", self.filter));
        }
        id.push_str(&format!(
            "__fix={}__n={}__vers={}",
            self.fix_fillers, self.num_fillers, self.version
        ));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DatasetConfig {
        DatasetConfig {
            num_fillers: 1,
            fix_fillers: true,
            swap_fillers: String::new(),
            filter: String::new(),
            version: 0,
        }
    }

    #[test]
    fn test_id_is_stable() {
        assert_eq!(config().id(), config().id());
    }

    #[test]
    fn test_id_distinguishes_versions() {
        let mut other = config();
        other.version = 1;
        assert_ne!(config().id(), other.id());
    }

    #[test]
    fn test_id_suffix_reflects_options() {
        let cfg = DatasetConfig {
            swap_fillers: "agent->profession".to_string(),
            filter: "profession".to_string(),
            ..config()
        };
        let id = cfg.id();
        assert!(id.starts_with("dataset-cfg="));
        assert!(id.contains("__xforms=agent->profession"));
        assert!(id.contains("__filt=profession"));
        assert!(id.ends_with("__fix=true__n=1__vers=0"));
    }
}

use serde::Deserialize;

/// Decides which caches are removed when a worker activates.
///
/// Caches are shared across the whole origin, so the default keeps every
/// one of them.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Retention {
    /// Remove nothing
    #[default]
    KeepAll,
    /// Remove caches starting with `prefix`, except the current one
    Stale { prefix: String },
    /// Remove exactly these caches
    Remove { names: Vec<String> },
}

impl Retention {
    /// Returns `true` when `cache_name` should be deleted while the worker
    /// owning `current` activates
    pub fn should_remove(&self, cache_name: &str, current: &str) -> bool {
        match self {
            Retention::KeepAll => false,
            Retention::Stale { prefix } => cache_name != current && cache_name.starts_with(prefix),
            Retention::Remove { names } => names.iter().any(|name| name == cache_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_all_keeps_everything() {
        let retention = Retention::default();
        assert!(!retention.should_remove("pages-cache-v0", "pages-cache-v1"));
        assert!(!retention.should_remove("pages-cache-v1", "pages-cache-v1"));
    }

    #[test]
    fn stale_keeps_current_and_foreign_caches() {
        let retention = Retention::Stale {
            prefix: "pages-cache-".to_string(),
        };
        assert!(retention.should_remove("pages-cache-v0", "pages-cache-v1"));
        assert!(!retention.should_remove("pages-cache-v1", "pages-cache-v1"));
        assert!(!retention.should_remove("api-cache-v0", "pages-cache-v1"));
    }

    #[test]
    fn remove_lists_names() {
        let retention = Retention::Remove {
            names: vec!["pages-cache-v0".to_string()],
        };
        assert!(retention.should_remove("pages-cache-v0", "pages-cache-v1"));
        assert!(!retention.should_remove("pages-cache-v2", "pages-cache-v1"));
    }

    #[test]
    fn deserialize_policies() {
        #[derive(Deserialize)]
        struct Wrapper {
            retention: Retention,
        }

        let keep: Wrapper = toml::from_str("[retention]\npolicy = \"keep_all\"\n").unwrap();
        assert_eq!(keep.retention, Retention::KeepAll);

        let stale: Wrapper =
            toml::from_str("[retention]\npolicy = \"stale\"\nprefix = \"pages-\"\n").unwrap();
        assert_eq!(
            stale.retention,
            Retention::Stale {
                prefix: "pages-".to_string()
            }
        );

        let remove: Wrapper =
            toml::from_str("[retention]\npolicy = \"remove\"\nnames = [\"a\", \"b\"]\n").unwrap();
        assert_eq!(
            remove.retention,
            Retention::Remove {
                names: vec!["a".to_string(), "b".to_string()]
            }
        );

        assert!(toml::from_str::<Wrapper>("[retention]\npolicy = \"evict\"\n").is_err());
    }
}

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Keys accepted by `configure <key> [value]`.
pub const CONFIG_KEYS: &[&str] = &[
    "name",
    "http.port",
    "https.port",
    "mysql",
    "mysql.port",
    "mysql.user",
    "mysql.password",
    "mysql.database",
];

/// Location of the docker settings relative to the project root.
pub const CONFIG_FILE: &str = "app/etc/docker.json";

pub fn resolve_docker_binary() -> String {
    std::env::var("DOCKER_BIN").unwrap_or_else(|_| "docker".to_string())
}

pub fn find_project_root(start_dir: &Path) -> PathBuf {
    // Walk up until we find composer.json or an app/etc directory.
    let mut dir = start_dir.to_path_buf();

    for _ in 0..12 {
        if dir.join("composer.json").exists() || dir.join("app").join("etc").is_dir() {
            return dir;
        }

        match dir.parent() {
            Some(parent) if parent != dir => dir = parent.to_path_buf(),
            _ => break,
        }
    }

    start_dir.to_path_buf()
}

/// Filesystem locations the container is built from and bound to.
#[derive(Debug, Clone)]
pub struct Layout {
    pub project_root: PathBuf,
    pub docker_context: PathBuf,
}

impl Layout {
    pub fn new(project_root: PathBuf) -> Self {
        let docker_context = std::env::var("DOCKER_CONTEXT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("docker"));
        Self {
            project_root,
            docker_context,
        }
    }

    pub fn dockerfile(&self) -> PathBuf {
        self.docker_context.join("amp.Dockerfile")
    }

    /// Host file mounted into the container, under `files/amp/`.
    pub fn amp_file(&self, file: &str) -> PathBuf {
        self.docker_context.join("files").join("amp").join(file)
    }

    pub fn config_file(&self) -> PathBuf {
        self.project_root.join(CONFIG_FILE)
    }
}

/// Value accepted by [`ConfigStore::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Text(String),
    /// Make sure a (possibly empty) group exists at the key.
    Group,
    /// Remove the key and everything under it.
    Unset,
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Text(s.to_string())
    }
}

/// Dotted-key view over a JSON document.
///
/// The tree is loaded once and only written back by an explicit [`ConfigStore::save`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    root: Map<String, Value>,
}

impl ConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                root: Map::new(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let root = if raw.trim().is_empty() {
            Map::new()
        } else {
            serde_json::from_str::<Map<String, Value>>(&raw).map_err(|source| Error::ConfigParse {
                path: path.clone(),
                source,
            })?
        };

        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut cur = self.root.get(parts.next()?)?;
        for part in parts {
            cur = cur.as_object()?.get(part)?;
        }
        Some(cur)
    }

    /// Text value at `key`; groups and nulls read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Whether anything non-null lives at `key` (a leaf or a group).
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        let value = value.into();
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(leaf) = parts.pop() else {
            return;
        };

        let mut cur = &mut self.root;
        for part in parts {
            // Removing never creates groups on the way down.
            if value == ConfigValue::Unset {
                match cur.get_mut(part).and_then(Value::as_object_mut) {
                    Some(next) => cur = next,
                    None => return,
                }
                continue;
            }

            let slot = cur
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(next) = slot else {
                return;
            };
            cur = next;
        }

        match value {
            ConfigValue::Text(s) => {
                cur.insert(leaf.to_string(), Value::String(s));
            }
            ConfigValue::Group => {
                let slot = cur
                    .entry(leaf.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
            }
            ConfigValue::Unset => {
                cur.remove(leaf);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let write_err = |source| Error::ConfigWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let mut body = serde_json::to_string_pretty(&self.root).map_err(|source| Error::ConfigParse {
            path: self.path.clone(),
            source,
        })?;
        body.push('\n');
        fs::write(&self.path, body).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_empty_store() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::load(dir.path().join("docker.json")).expect("load");
        assert_eq!(store.get("name"), None);
        assert!(!store.contains("mysql"));
    }

    #[test]
    fn get_through_missing_or_leaf_intermediate_is_absent() {
        let dir = tempdir().expect("tempdir");
        let mut store = ConfigStore::load(dir.path().join("docker.json")).expect("load");
        store.set("name", "devbox");
        assert_eq!(store.get("mysql.port"), None);
        assert_eq!(store.get("name.port"), None);
        assert_eq!(store.get("a.b.c.d"), None);
    }

    #[test]
    fn set_save_load_round_trips_nested_keys() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app/etc/docker.json");

        let mut store = ConfigStore::load(&path).expect("load");
        store.set("name", "devbox");
        store.set("mysql.port", "3307");
        store.set("mysql.user", "dev");
        store.save().expect("save");

        let reloaded = ConfigStore::load(&path).expect("reload");
        assert_eq!(reloaded.get("name").as_deref(), Some("devbox"));
        assert_eq!(reloaded.get("mysql.port").as_deref(), Some("3307"));
        assert_eq!(reloaded.get("mysql.user").as_deref(), Some("dev"));
        assert!(reloaded.contains("mysql"));
        assert_eq!(reloaded.get("mysql"), None);
    }

    #[test]
    fn set_is_not_persisted_without_save() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("docker.json");

        let mut store = ConfigStore::load(&path).expect("load");
        store.set("name", "devbox");
        assert!(!path.exists());
    }

    #[test]
    fn empty_string_is_distinct_from_absence() {
        let dir = tempdir().expect("tempdir");
        let mut store = ConfigStore::load(dir.path().join("docker.json")).expect("load");
        store.set("name", "");
        assert_eq!(store.get("name").as_deref(), Some(""));
        assert_eq!(store.get("http.port"), None);
    }

    #[test]
    fn group_marker_toggles_feature_without_children() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("docker.json");

        let mut store = ConfigStore::load(&path).expect("load");
        store.set("mysql", ConfigValue::Group);
        assert!(store.contains("mysql"));
        store.save().expect("save");
        assert!(ConfigStore::load(&path).expect("reload").contains("mysql"));

        store.set("mysql.user", "dev");
        store.set("mysql", ConfigValue::Group);
        assert_eq!(store.get("mysql.user").as_deref(), Some("dev"));

        store.set("mysql", ConfigValue::Unset);
        assert!(!store.contains("mysql"));
        assert_eq!(store.get("mysql.user"), None);
    }

    #[test]
    fn unset_below_a_missing_group_creates_nothing() {
        let dir = tempdir().expect("tempdir");
        let mut store = ConfigStore::load(dir.path().join("docker.json")).expect("load");
        store.set("mysql.user", ConfigValue::Unset);
        store.set("a.b.c", ConfigValue::Unset);
        assert!(!store.contains("mysql"));
        assert!(!store.contains("a"));

        store.set("name", "devbox");
        store.set("name.port", ConfigValue::Unset);
        assert_eq!(store.get("name").as_deref(), Some("devbox"));

        store.set("mysql.user", "dev");
        store.set("mysql.port", "3306");
        store.set("mysql.user", ConfigValue::Unset);
        assert_eq!(store.get("mysql.user"), None);
        assert_eq!(store.get("mysql.port").as_deref(), Some("3306"));
    }

    #[test]
    fn child_replaces_leaf_intermediate() {
        let dir = tempdir().expect("tempdir");
        let mut store = ConfigStore::load(dir.path().join("docker.json")).expect("load");
        store.set("mysql", "yes");
        store.set("mysql.port", "3306");
        assert_eq!(store.get("mysql.port").as_deref(), Some("3306"));
    }

    #[test]
    fn null_and_numeric_leaves_from_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("docker.json");
        fs::write(&path, r#"{"mysql": null, "http": {"port": 8080}}"#).expect("write");

        let store = ConfigStore::load(&path).expect("load");
        assert!(!store.contains("mysql"));
        assert_eq!(store.get("http.port").as_deref(), Some("8080"));
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("docker.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(ConfigStore::load(&path), Err(Error::ConfigParse { .. })));

        fs::write(&path, "[1, 2]").expect("write");
        assert!(matches!(ConfigStore::load(&path), Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn project_root_is_found_from_nested_dir() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("composer.json"), "{}").expect("write");
        let nested = dir.path().join("src").join("Module");
        fs::create_dir_all(&nested).expect("mkdir");
        assert_eq!(find_project_root(&nested), dir.path());
    }

    #[test]
    fn layout_paths_hang_off_the_docker_context() {
        let layout = Layout {
            project_root: PathBuf::from("/srv/app"),
            docker_context: PathBuf::from("/srv/app/docker"),
        };
        assert_eq!(layout.dockerfile(), PathBuf::from("/srv/app/docker/amp.Dockerfile"));
        assert_eq!(
            layout.amp_file("php.ini"),
            PathBuf::from("/srv/app/docker/files/amp/php.ini")
        );
        assert_eq!(layout.config_file(), PathBuf::from("/srv/app/app/etc/docker.json"));
    }
}

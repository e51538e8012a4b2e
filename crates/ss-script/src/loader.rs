use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{SimError, SimResult};

/// File extension of script files on disk.
pub const SCRIPT_EXTENSION: &str = "script";

/// Which family a script belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptCategory {
    /// Functions callable on entities (`door.open`).
    Entity,
    /// Functions callable on items (`key.use`).
    Item,
    /// Free-standing behaviors attached directly to an entity.
    Behavior,
}

impl ScriptCategory {
    /// Categories that contribute to the function repository.
    pub const FUNCTIONS: [ScriptCategory; 2] = [Self::Entity, Self::Item];

    /// Subdirectory name used by [`DirectoryLoader`].
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Item => "item",
            Self::Behavior => "behavior",
        }
    }
}

impl fmt::Display for ScriptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Where script text comes from.
pub trait ScriptSource: fmt::Debug {
    /// Script text stored under `name`, if any.
    fn load(&self, category: ScriptCategory, name: &str) -> Option<String>;

    /// Names of all scripts in a category, without extension.
    fn list(&self, category: ScriptCategory) -> SimResult<Vec<String>>;
}

/// Loads scripts from `<root>/<category>/<name>.script`.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, category: ScriptCategory, name: &str) -> PathBuf {
        self.root
            .join(category.dir_name())
            .join(format!("{name}.{SCRIPT_EXTENSION}"))
    }
}

impl ScriptSource for DirectoryLoader {
    fn load(&self, category: ScriptCategory, name: &str) -> Option<String> {
        std::fs::read_to_string(self.path_of(category, name)).ok()
    }

    fn list(&self, category: ScriptCategory) -> SimResult<Vec<String>> {
        let dir = self.root.join(category.dir_name());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|source| SimError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Keeps scripts in memory. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    scripts: BTreeMap<(ScriptCategory, String), String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script, builder style.
    pub fn with(mut self, category: ScriptCategory, name: &str, source: &str) -> Self {
        self.insert(category, name, source);
        self
    }

    /// Add or replace a script.
    pub fn insert(&mut self, category: ScriptCategory, name: &str, source: &str) {
        self.scripts
            .insert((category, name.to_string()), source.to_string());
    }
}

impl ScriptSource for MemoryLoader {
    fn load(&self, category: ScriptCategory, name: &str) -> Option<String> {
        self.scripts.get(&(category, name.to_string())).cloned()
    }

    fn list(&self, category: ScriptCategory) -> SimResult<Vec<String>> {
        Ok(self
            .scripts
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, name)| name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_loader_lists_and_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let entity_dir = dir.path().join("entity");
        std::fs::create_dir_all(&entity_dir).unwrap();
        std::fs::write(entity_dir.join("door.open.script"), "exit(1)").unwrap();
        std::fs::write(entity_dir.join("chest.take.script"), "exit()").unwrap();
        std::fs::write(entity_dir.join("notes.txt"), "ignored").unwrap();

        let loader = DirectoryLoader::new(dir.path());
        assert_eq!(
            loader.list(ScriptCategory::Entity).unwrap(),
            vec!["chest.take", "door.open"]
        );
        assert_eq!(
            loader.load(ScriptCategory::Entity, "door.open").as_deref(),
            Some("exit(1)")
        );
        assert!(loader.load(ScriptCategory::Item, "door.open").is_none());
    }

    #[test]
    fn directory_loader_missing_category_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let loader = DirectoryLoader::new(dir.path());
        assert!(loader.list(ScriptCategory::Item).unwrap().is_empty());
    }

    #[test]
    fn memory_loader_separates_categories() {
        let loader = MemoryLoader::new()
            .with(ScriptCategory::Entity, "door.open", "exit()")
            .with(ScriptCategory::Behavior, "guard", "sleep(1)");
        assert_eq!(loader.list(ScriptCategory::Entity).unwrap(), vec!["door.open"]);
        assert_eq!(loader.list(ScriptCategory::Behavior).unwrap(), vec!["guard"]);
        assert!(loader.load(ScriptCategory::Entity, "guard").is_none());
    }
}

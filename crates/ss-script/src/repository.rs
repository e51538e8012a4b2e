use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{SimError, SimResult};
use crate::loader::{ScriptCategory, ScriptSource};

/// Directive declaring how many parameters a function script takes.
pub const PARAMS_DIRECTIVE: &str = "$SetNumParams";

/// Parameter count of a function that is referenced but has no script.
pub const UNDEFINED_PARAMS: i32 = -1;

/// Stable identifier of a function descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of one entity or item function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Identifier, assigned in sorted key order.
    pub id: FunctionId,
    /// Entity or item function.
    pub category: ScriptCategory,
    /// Owner type name as written in the script filename.
    pub owner: String,
    /// Function name.
    pub name: String,
    /// Declared parameter count, or [`UNDEFINED_PARAMS`].
    pub parameter_count: i32,
}

impl FunctionDescriptor {
    /// Whether a script exists for this function.
    pub fn is_defined(&self) -> bool {
        self.parameter_count >= 0
    }

    /// Loader name of the script implementing this function.
    pub fn script_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

/// A function referenced by a type catalog, with or without a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredFunction {
    pub category: ScriptCategory,
    pub owner: String,
    pub name: String,
}

impl DeclaredFunction {
    pub fn new(category: ScriptCategory, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category,
            owner: owner.into(),
            name: name.into(),
        }
    }
}

type FunctionKey = (ScriptCategory, String, String);

fn key(category: ScriptCategory, owner: &str, name: &str) -> FunctionKey {
    (category, owner.to_ascii_lowercase(), name.to_string())
}

/// All entity and item functions known to the interpreter.
///
/// Owner names match case-insensitively; function names are exact.
#[derive(Debug, Clone, Default)]
pub struct FunctionRepository {
    functions: Vec<FunctionDescriptor>,
    index: HashMap<FunctionKey, FunctionId>,
}

impl FunctionRepository {
    /// Scan the entity and item categories of `source`. Declared functions
    /// without a script are added with [`UNDEFINED_PARAMS`].
    pub fn scan(source: &dyn ScriptSource, declared: &[DeclaredFunction]) -> SimResult<Self> {
        let mut entries: BTreeMap<FunctionKey, (String, i32)> = BTreeMap::new();

        for decl in declared {
            entries
                .entry(key(decl.category, &decl.owner, &decl.name))
                .or_insert_with(|| (decl.owner.clone(), UNDEFINED_PARAMS));
        }

        for category in ScriptCategory::FUNCTIONS {
            for file in source.list(category)? {
                let Some((owner, name)) = split_file_name(&file) else {
                    tracing::warn!("skipping {category} script '{file}': expected owner.function");
                    continue;
                };
                let text = source
                    .load(category, &file)
                    .ok_or_else(|| SimError::ScriptNotFound(file.clone()))?;
                let count = parse_param_count(&text)
                    .map_err(|message| SimError::Repository {
                        file: file.clone(),
                        message,
                    })?
                    .unwrap_or(0);
                tracing::debug!("loaded {category} function {file} with {count} params");
                entries.insert(key(category, owner, name), (owner.to_string(), count));
            }
        }

        Ok(Self::from_sorted(entries))
    }

    /// Build a repository from explicit `(category, owner, name, params)`
    /// entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (ScriptCategory, &'a str, &'a str, i32)>) -> Self {
        let sorted = entries
            .into_iter()
            .map(|(category, owner, name, count)| (key(category, owner, name), (owner.to_string(), count)))
            .collect();
        Self::from_sorted(sorted)
    }

    fn from_sorted(entries: BTreeMap<FunctionKey, (String, i32)>) -> Self {
        let mut repo = Self::default();
        for (i, ((category, _, name), (owner, parameter_count))) in entries.into_iter().enumerate() {
            let id = FunctionId(i as u32);
            repo.index.insert(key(category, &owner, &name), id);
            repo.functions.push(FunctionDescriptor {
                id,
                category,
                owner,
                name,
                parameter_count,
            });
        }
        repo
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: FunctionId) -> Option<&FunctionDescriptor> {
        self.functions.get(id.0 as usize)
    }

    /// Look up a descriptor by owner and function name.
    pub fn lookup(&self, category: ScriptCategory, owner: &str, name: &str) -> Option<&FunctionDescriptor> {
        self.index
            .get(&key(category, owner, name))
            .and_then(|id| self.get(*id))
    }

    /// Ids of every function whose owner matches `owner` (case-insensitive).
    pub fn functions_for(&self, category: ScriptCategory, owner: &str) -> Vec<FunctionId> {
        self.functions
            .iter()
            .filter(|f| f.category == category && f.owner.eq_ignore_ascii_case(owner))
            .map(|f| f.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Split `owner.function` (extension already removed). Anything else is not
/// a function script.
pub fn split_file_name(file: &str) -> Option<(&str, &str)> {
    let (owner, name) = file.split_once('.')?;
    if owner.is_empty() || name.is_empty() || name.contains('.') {
        return None;
    }
    Some((owner, name))
}

/// Read the `$SetNumParams(N)` directive from a script. The last directive
/// wins; `None` when the script has none.
pub fn parse_param_count(source: &str) -> Result<Option<i32>, String> {
    let mut count = None;
    for line in source.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix(PARAMS_DIRECTIVE) else {
            continue;
        };
        let n = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .and_then(|r| r.trim().parse::<i32>().ok())
            .filter(|n| *n >= 0)
            .ok_or_else(|| format!("malformed directive '{line}'"))?;
        count = Some(n);
    }
    Ok(count)
}

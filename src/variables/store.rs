//! Environment-partitioned variable storage.
//!
//! Variables live in named environments. The default environment has the
//! empty name and always exists; lookups in any other environment fall back
//! to it. Variable and environment names are case-insensitive and stored in
//! upper case.

use super::VarError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the default environment.
pub const DEFAULT_ENV: &str = "";

type Variables = BTreeMap<String, String>;

/// Returns the canonical (upper case) form of a variable or environment name.
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase()
}

/// Holds all variables of a project, partitioned into environments.
///
/// Undefined and defined-as-empty are distinct: [`VariableStore::lookup`]
/// returns `Some("")` for the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoreData", into = "StoreData")]
pub struct VariableStore {
    envs: BTreeMap<String, Variables>,
    current: String,
}

/// On-disk shape of the store.
#[derive(Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    current: String,
    #[serde(default)]
    environments: BTreeMap<String, Variables>,
}

impl From<StoreData> for VariableStore {
    fn from(data: StoreData) -> Self {
        let mut store = VariableStore::new();
        for (env, vars) in data.environments {
            for (name, value) in vars {
                store.set_in(&name, value, &env);
            }
        }
        store.set_current_env(&data.current);
        store
    }
}

impl From<VariableStore> for StoreData {
    fn from(store: VariableStore) -> Self {
        StoreData {
            current: store.current,
            environments: store.envs,
        }
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    /// Creates a store holding only an empty default environment.
    pub fn new() -> Self {
        let mut envs = BTreeMap::new();
        envs.insert(DEFAULT_ENV.to_string(), Variables::new());
        Self {
            envs,
            current: DEFAULT_ENV.to_string(),
        }
    }

    /// Name of the current environment (`""` for the default one).
    pub fn current_env(&self) -> &str {
        &self.current
    }

    /// Switches the current environment, creating it if it does not exist.
    pub fn set_current_env(&mut self, env: &str) {
        let env = normalize_name(env);
        self.envs.entry(env.clone()).or_default();
        self.current = env;
    }

    /// Looks up a variable in the current environment, falling back to the
    /// default environment.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = normalize_name(name);

        if let Some(value) = self.envs.get(&self.current).and_then(|vars| vars.get(&key)) {
            return Some(value);
        }

        if self.current != DEFAULT_ENV {
            return self
                .envs
                .get(DEFAULT_ENV)
                .and_then(|vars| vars.get(&key))
                .map(String::as_str);
        }

        None
    }

    /// Like [`lookup`](Self::lookup) but returns the empty string for
    /// undefined variables.
    pub fn get(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_default().to_string()
    }

    /// Looks up a variable in exactly one environment, without fallback.
    pub fn get_from(&self, name: &str, env: &str) -> Option<&str> {
        self.envs
            .get(&normalize_name(env))
            .and_then(|vars| vars.get(&normalize_name(name)))
            .map(String::as_str)
    }

    /// Whether the variable resolves in the current environment or the default.
    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Sets a variable in the current environment.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let env = self.current.clone();
        self.set_in(name, value, &env);
    }

    /// Sets a variable in the named environment, creating it if needed.
    pub fn set_in(&mut self, name: &str, value: impl Into<String>, env: &str) {
        self.envs
            .entry(normalize_name(env))
            .or_default()
            .insert(normalize_name(name), value.into());
    }

    /// Removes a variable from the current environment.
    ///
    /// Returns `true` if the variable was present.
    pub fn unset(&mut self, name: &str) -> bool {
        let env = self.current.clone();
        self.unset_in(&env, name)
    }

    /// Removes a variable from the named environment.
    pub fn unset_in(&mut self, env: &str, name: &str) -> bool {
        self.envs
            .get_mut(&normalize_name(env))
            .map(|vars| vars.remove(&normalize_name(name)).is_some())
            .unwrap_or(false)
    }

    /// Removes a variable from every environment.
    pub fn remove(&mut self, name: &str) -> bool {
        let key = normalize_name(name);
        let mut removed = false;
        for vars in self.envs.values_mut() {
            removed |= vars.remove(&key).is_some();
        }
        removed
    }

    /// Names defined in the current environment.
    pub fn defined(&self) -> Vec<String> {
        self.defined_in(&self.current)
    }

    /// Names defined in the named environment.
    pub fn defined_in(&self, env: &str) -> Vec<String> {
        self.envs
            .get(&normalize_name(env))
            .map(|vars| vars.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names visible from the current environment: its own plus the default
    /// environment's, de-duplicated.
    pub fn all(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.defined().into_iter().collect();
        names.extend(self.defined_in(DEFAULT_ENV));
        names.into_iter().collect()
    }

    /// Number of distinct variable names across all environments.
    pub fn count(&self) -> usize {
        self.envs
            .values()
            .flat_map(|vars| vars.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of environments, including the default one.
    pub fn env_count(&self) -> usize {
        self.envs.len()
    }

    /// All environment names in sorted order; the default environment is `""`.
    pub fn environment_names(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }

    /// Whether an environment with this name exists.
    pub fn has_env(&self, env: &str) -> bool {
        self.envs.contains_key(&normalize_name(env))
    }

    /// Deletes a named environment and all of its variables.
    ///
    /// Deleting the current environment switches back to the default one.
    /// The default environment itself cannot be deleted.
    pub fn delete_env(&mut self, env: &str) -> Result<bool, VarError> {
        let env = normalize_name(env);
        if env == DEFAULT_ENV {
            return Err(VarError::ProtectedEnvironment);
        }

        let removed = self.envs.remove(&env).is_some();
        if self.current == env {
            self.current = DEFAULT_ENV.to_string();
        }
        Ok(removed)
    }
}

//! A process-wide key/value table backing the `GETENV`/`SETENV`
//! commands. Distinct from OS environment variables: this table is
//! populated at boot from the runtime's own config file and then mutated
//! at will by running services.

use dashmap::DashMap;
use skynet_process::EnvMap;

pub struct EnvTable {
    table: DashMap<String, String>,
}

impl EnvTable {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    /// Seeds the table from a set of boot-time config entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let table = Self::new();
        for (key, value) in entries {
            table.table.insert(key, value);
        }
        table
    }
}

impl Default for EnvTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvMap for EnvTable {
    fn get(&self, key: &str) -> Option<String> {
        self.table.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: String, value: String) {
        self.table.insert(key, value);
    }
}

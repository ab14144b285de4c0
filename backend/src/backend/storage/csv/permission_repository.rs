//! Permission sets stored as a YAML map of user group to granted codenames.
//! A default catalog is seeded on first use so a fresh data directory has
//! working groups out of the box.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use super::connection::CsvConnection;
use crate::backend::storage::traits::PermissionStorage;

/// Default group catalog written when no permissions.yaml exists.
static DEFAULT_GROUPS: Lazy<BTreeMap<String, Vec<String>>> = Lazy::new(|| {
    let entities = ["feetype", "feerecord", "waiver", "expense", "income"];
    let actions = ["view", "add", "change", "delete"];

    let mut admin: Vec<String> = Vec::new();
    for entity in entities {
        for action in actions {
            admin.push(format!("{}_{}", action, entity));
        }
    }
    admin.push("view_report".to_string());

    let accountant: Vec<String> = [
        "view_feetype",
        "view_feerecord",
        "add_feerecord",
        "change_feerecord",
        "view_waiver",
        "view_expense",
        "add_expense",
        "change_expense",
        "view_income",
        "add_income",
        "change_income",
        "view_report",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let viewer: Vec<String> = entities
        .iter()
        .map(|e| format!("view_{}", e))
        .chain(std::iter::once("view_report".to_string()))
        .collect();

    let mut groups = BTreeMap::new();
    groups.insert("admin".to_string(), admin);
    groups.insert("accountant".to_string(), accountant);
    groups.insert("viewer".to_string(), viewer);
    groups
});

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PermissionsFile {
    groups: BTreeMap<String, Vec<String>>,
}

#[derive(Clone)]
pub struct PermissionRepository {
    connection: CsvConnection,
}

impl PermissionRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn load(&self) -> Result<PermissionsFile> {
        let path = self.connection.permissions_file();
        if !path.exists() {
            return Ok(PermissionsFile {
                groups: DEFAULT_GROUPS.clone(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let file: PermissionsFile = serde_yaml::from_str(&content)?;
        Ok(file)
    }

    /// Write the default catalog if no permissions file exists yet.
    pub fn ensure_defaults(&self) -> Result<()> {
        let _guard = self.connection.lock();
        let path = self.connection.permissions_file();
        if path.exists() {
            return Ok(());
        }

        info!("Seeding default permission groups");
        let file = PermissionsFile {
            groups: DEFAULT_GROUPS.clone(),
        };
        let yaml = serde_yaml::to_string(&file)?;

        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl PermissionStorage for PermissionRepository {
    async fn codenames_for_group(&self, group: &str) -> Result<Vec<String>> {
        let file = self.load()?;
        Ok(file.groups.get(group).cloned().unwrap_or_default())
    }
}

//! Permission service: group -> codename membership tests.
//!
//! The UI fetches a group's codenames once and hides controls it lacks; the
//! REST layer additionally checks the acting group before every mutating
//! operation. Denial is a non-fatal, user-visible rejection.

use anyhow::Result;
use log::warn;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::storage::PermissionStorage;
use shared::PermissionListResponse;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Permission denied: group '{group}' lacks '{codename}'")]
pub struct PermissionDenied {
    pub group: String,
    pub codename: String,
}

#[derive(Clone)]
pub struct PermissionService {
    permissions: Arc<dyn PermissionStorage>,
}

impl PermissionService {
    pub fn new(permissions: Arc<dyn PermissionStorage>) -> Self {
        Self { permissions }
    }

    pub async fn list_permissions(&self, group: &str) -> Result<PermissionListResponse> {
        let codenames = self.permissions.codenames_for_group(group).await?;
        Ok(PermissionListResponse {
            group: group.to_string(),
            codenames,
        })
    }

    /// Membership test for one codename.
    pub async fn check(&self, group: &str, codename: &str) -> Result<(), PermissionDenied> {
        let codenames = match self.permissions.codenames_for_group(group).await {
            Ok(codenames) => codenames,
            Err(e) => {
                warn!("Permission lookup failed for group {}: {}", group, e);
                Vec::new()
            }
        };

        if codenames.iter().any(|c| c == codename) {
            Ok(())
        } else {
            Err(PermissionDenied {
                group: group.to_string(),
                codename: codename.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::{CsvConnection, PermissionRepository};

    fn setup() -> (tempfile::TempDir, PermissionService) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = PermissionService::new(Arc::new(PermissionRepository::new(connection)));
        (temp_dir, service)
    }

    #[tokio::test]
    async fn test_admin_passes_mutating_checks() {
        let (_temp, service) = setup();
        assert!(service.check("admin", "delete_feerecord").await.is_ok());
        assert!(service.check("admin", "add_waiver").await.is_ok());
    }

    #[tokio::test]
    async fn test_viewer_is_denied_mutations() {
        let (_temp, service) = setup();
        let err = service.check("viewer", "add_feerecord").await.unwrap_err();
        assert_eq!(err.group, "viewer");
        assert_eq!(err.codename, "add_feerecord");
        assert!(err.to_string().contains("Permission denied"));
    }

    #[tokio::test]
    async fn test_unknown_group_is_denied() {
        let (_temp, service) = setup();
        assert!(service.check("janitor", "view_feerecord").await.is_err());
    }
}

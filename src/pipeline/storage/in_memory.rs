use std::collections::BTreeMap;
use tracing::debug;

use super::AuditLogRow;
use crate::app::ports::MemberStore;
use crate::domain::NormalizedMember;
use crate::error::StorageError;

/// In-memory member store for development/testing
#[derive(Debug, Default)]
pub struct InMemoryMemberStore {
    /// Keyed by `(client_id, member_id)`
    members: BTreeMap<(String, String), NormalizedMember>,
    audit_log: Vec<AuditLogRow>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_member(&self, client_id: &str, member_id: &str) -> Option<&NormalizedMember> {
        self.members
            .get(&(client_id.to_string(), member_id.to_string()))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn audit_rows(&self) -> &[AuditLogRow] {
        &self.audit_log
    }
}

impl MemberStore for InMemoryMemberStore {
    fn upsert_members(
        &mut self,
        client_id: &str,
        members: &[NormalizedMember],
    ) -> Result<usize, StorageError> {
        for member in members {
            self.members.insert(
                (client_id.to_string(), member.member_id().to_string()),
                member.clone(),
            );
        }
        debug!(client_id, count = members.len(), "Members upserted in memory");
        Ok(members.len())
    }

    fn insert_audit_log(&mut self, row: &AuditLogRow) -> Result<i64, StorageError> {
        self.audit_log.push(row.clone());
        Ok(self.audit_log.len() as i64)
    }
}

//! Whitelist authorization evaluator.

use keyrack_storage::{IdentityId, KeyRecord, ProjectId};

/// Project-level capabilities the host's permission system resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Whitelist enforcement applies to this identity's role at all. An
    /// identity without it sees every key in projects it can access.
    WhitelistKeys,
    /// The identity may edit key whitelists.
    ManageWhitelist,
}

/// Identity and membership provider, injected by the host application. The
/// service never consults ambient global state for who is asking.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Site-wide administrator check. Admins bypass whitelists entirely.
    async fn is_admin(&self, identity: &IdentityId) -> bool;

    /// Whether the identity's role in the project grants a capability.
    async fn allowed_to(
        &self,
        identity: &IdentityId,
        project: &ProjectId,
        capability: Capability,
    ) -> bool;

    /// Whether the identity belongs to the named group.
    async fn in_group(&self, identity: &IdentityId, group: &str) -> bool;
}

/// Evaluate whether `identity` may see `key`.
///
/// Admins and identities whose role is exempt from enforcement are always
/// allowed. Everyone else must match one of the key's whitelist tokens: a
/// group the identity belongs to, or the identity's own id verbatim. A key
/// with an empty whitelist is visible to nobody under enforcement.
pub async fn is_authorized(
    directory: &dyn Directory,
    identity: &IdentityId,
    project: &ProjectId,
    key: &KeyRecord,
) -> bool {
    if directory.is_admin(identity).await {
        return true;
    }
    if !directory
        .allowed_to(identity, project, Capability::WhitelistKeys)
        .await
    {
        return true;
    }

    for token in key.whitelist.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token == identity.0 || directory.in_group(identity, token).await {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use keyrack_storage::{KeyId, KeyKind};
    use uuid::Uuid;

    fn key_with_whitelist(project: ProjectId, whitelist: &str) -> KeyRecord {
        KeyRecord {
            id: KeyId::generate(),
            project_id: project,
            name: "k".into(),
            kind: KeyKind::Password,
            login: None,
            url: None,
            comment: None,
            body: Vec::new(),
            file: None,
            whitelist: whitelist.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ident(s: &str) -> IdentityId {
        IdentityId(s.to_string())
    }

    #[tokio::test]
    async fn admin_bypasses_whitelist() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, "");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(true);

        assert!(is_authorized(&dir, &ident("root"), &project, &key).await);
    }

    #[tokio::test]
    async fn exempt_role_sees_everything() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, "some-group");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(false);
        dir.expect_allowed_to().return_const(false);

        assert!(is_authorized(&dir, &ident("u1"), &project, &key).await);
    }

    #[tokio::test]
    async fn empty_whitelist_denies_under_enforcement() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, "");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(false);
        dir.expect_allowed_to().return_const(true);

        assert!(!is_authorized(&dir, &ident("u1"), &project, &key).await);
    }

    #[tokio::test]
    async fn group_token_matches_membership() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, "ops, dba");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(false);
        dir.expect_allowed_to().return_const(true);
        dir.expect_in_group()
            .returning(|_, group| group == "dba");

        assert!(is_authorized(&dir, &ident("u1"), &project, &key).await);
    }

    #[tokio::test]
    async fn literal_identity_token_matches() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, "ops, u7");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(false);
        dir.expect_allowed_to().return_const(true);
        dir.expect_in_group().return_const(false);

        assert!(is_authorized(&dir, &ident("u7"), &project, &key).await);
        assert!(!is_authorized(&dir, &ident("u8"), &project, &key).await);
    }

    #[tokio::test]
    async fn blank_tokens_are_skipped() {
        let project = ProjectId(Uuid::new_v4());
        let key = key_with_whitelist(project, " , ,ops");

        let mut dir = MockDirectory::new();
        dir.expect_is_admin().return_const(false);
        dir.expect_allowed_to().return_const(true);
        dir.expect_in_group()
            .returning(|_, group| group == "ops");

        assert!(is_authorized(&dir, &ident("u1"), &project, &key).await);
    }
}

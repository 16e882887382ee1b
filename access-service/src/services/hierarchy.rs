//! Account hierarchy walks: ancestor chains, descendant sets, and the
//! tenant visibility reach derived from them.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::instrument;

use crate::models::AccountId;
use crate::services::directory::Directory;
use crate::services::error::AccessError;

pub struct AccountHierarchy {
    directory: Arc<dyn Directory>,
    max_depth: u32,
}

impl AccountHierarchy {
    /// `max_depth` guards the parent walk against cycles and corrupted
    /// parent pointers. It is a safety bound, not a business rule, and
    /// must sit well above any real ownership chain.
    pub fn new(directory: Arc<dyn Directory>, max_depth: u32) -> Self {
        Self {
            directory,
            max_depth,
        }
    }

    /// Ancestor chain of an account: the account itself first, then its
    /// parent, up to the root last.
    ///
    /// A chain longer than the guard depth fails loudly with
    /// `HierarchyTooDeep` rather than returning a truncated chain.
    #[instrument(skip(self))]
    pub async fn ancestors(&self, account_id: &AccountId) -> Result<Vec<AccountId>, AccessError> {
        let mut chain = vec![account_id.clone()];
        let mut cursor = account_id.clone();

        loop {
            let account = self
                .directory
                .find_account(&cursor)
                .await
                .map_err(AccessError::Persistence)?;

            let Some(parent) = account.and_then(|a| a.parent_account_id) else {
                return Ok(chain);
            };

            if chain.len() as u32 >= self.max_depth {
                tracing::error!(
                    account = %account_id,
                    max_depth = self.max_depth,
                    "account parent chain exceeded the guard depth"
                );
                return Err(AccessError::HierarchyTooDeep {
                    account: account_id.clone(),
                    max_depth: self.max_depth,
                });
            }

            chain.push(parent.clone());
            cursor = parent;
        }
    }

    /// Check whether `candidate` is `account_id` itself or one of its
    /// ancestors.
    pub async fn is_ancestor_or_self(
        &self,
        candidate: &AccountId,
        account_id: &AccountId,
    ) -> Result<bool, AccessError> {
        Ok(self.ancestors(account_id).await?.contains(candidate))
    }

    /// All accounts at or below `account_id`, the account itself
    /// included.
    pub async fn descendants(
        &self,
        account_id: &AccountId,
    ) -> Result<HashSet<AccountId>, AccessError> {
        let mut seen: HashSet<AccountId> = HashSet::new();
        let mut queue: VecDeque<AccountId> = VecDeque::new();
        seen.insert(account_id.clone());
        queue.push_back(account_id.clone());

        while let Some(next) = queue.pop_front() {
            let children = self
                .directory
                .child_accounts(&next)
                .await
                .map_err(AccessError::Persistence)?;
            for child in children {
                if seen.insert(child.account_id.clone()) {
                    queue.push_back(child.account_id);
                }
            }
        }

        Ok(seen)
    }

    /// Accounts visible to a tenant-tier caller owned by `account_id`:
    /// the account itself, every ancestor, and every descendant.
    /// Siblings and unrelated subtrees stay invisible.
    #[instrument(skip(self))]
    pub async fn visible_accounts(
        &self,
        account_id: &AccountId,
    ) -> Result<HashSet<AccountId>, AccessError> {
        let mut visible = self.descendants(account_id).await?;
        visible.extend(self.ancestors(account_id).await?);
        Ok(visible)
    }
}

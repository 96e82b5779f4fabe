use iou_contract::{AccountInfo, PublicKey, UniqueIdentifier};

use crate::FlowError;

/// Maps logical accounts to the node hosting them and their signing key.
pub trait AccountDirectory {
    fn account_info(&self, id: &UniqueIdentifier) -> Result<Option<AccountInfo>, FlowError>;

    fn account_info_by_key(&self, key: &PublicKey) -> Result<Option<AccountInfo>, FlowError>;

    /// True if this node holds the signing key of `account`.
    fn is_hosted_locally(&self, account: &AccountInfo) -> Result<bool, FlowError>;

    fn require_account(&self, id: &UniqueIdentifier) -> Result<AccountInfo, FlowError> {
        self.account_info(id)?
            .ok_or_else(|| FlowError::AccountNotFound(id.to_string()))
    }

    fn require_account_by_key(&self, key: &PublicKey) -> Result<AccountInfo, FlowError> {
        self.account_info_by_key(key)?
            .ok_or_else(|| FlowError::AccountNotFound(key.to_string()))
    }
}

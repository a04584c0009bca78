use crate::error::HostError;

/// Key-value persistence surface (local-storage equivalent).
pub trait KvStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, HostError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), HostError>;
}

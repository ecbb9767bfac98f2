use crate::domain::model::{LinkRecord, Manifest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Resolves and installs a dependency manifest.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Upgrades the installer tool itself. Runs before `install`.
    async fn upgrade_self(&self) -> Result<()>;

    /// Installs every dependency the manifest lists, without any package cache.
    async fn install(&self, manifest: &Manifest) -> Result<()>;

    fn describe(&self) -> String;
}

/// Persistence for short links. `short_url_path` and `long_url` are both unique.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn insert_mapping(&self, short_url_path: &str, long_url: &str) -> Result<LinkRecord>;
    async fn path_exists(&self, short_url_path: &str) -> Result<bool>;
    async fn find_path_by_long_url(&self, long_url: &str) -> Result<Option<String>>;
    async fn find_long_url_by_path(&self, short_url_path: &str) -> Result<Option<String>>;
    async fn increment_visits(&self, short_url_path: &str) -> Result<()>;
    async fn visits(&self, short_url_path: &str) -> Result<Option<u64>>;
}

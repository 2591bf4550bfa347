pub mod file;
pub mod memory;

pub use file::FilePreferenceStore;
pub use memory::MemoryPreferenceStore;

/// Key holding the last selected ticker.
pub const SYMBOL_KEY: &str = "stock_symbol";

/// Small string key-value slot that survives restarts.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

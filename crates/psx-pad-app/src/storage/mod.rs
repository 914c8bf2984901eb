pub mod keys;
pub mod settings_store;

// Re-export commonly used items for convenience
pub use keys::StorageKey;
pub use settings_store::{SettingsRecord, SettingsStore};

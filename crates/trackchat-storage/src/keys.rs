//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Access and refresh credentials, stored together as one JSON object
    pub const CREDENTIALS: &'static str = "credentials";
}

// Persisted client-side state
mod expiring;
mod theme;

pub use expiring::{ExpiringStore, StoredEntry};
pub use theme::Theme;

//! Alert aggregation and delivery

pub mod aggregate;
pub mod notifier;

pub use aggregate::{aggregate, AlertPayload};
pub use notifier::{Field, Notifier, NotifyError, NotifySettings, Severity};

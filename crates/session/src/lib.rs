#![warn(clippy::unwrap_used)]

pub mod gate;
pub mod session;
pub mod store;

pub use gate::AccessGate;
pub use session::{DashboardSession, DatasetSlot};
pub use store::SessionStore;

pub mod controller;
pub mod runtime;
pub mod subject;

pub use controller::{DashboardSnapshot, FetchOutcome, IngestOutcome, SessionController};
pub use runtime::Session;
pub use subject::{Role, SessionSubject};

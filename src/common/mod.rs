mod state;

pub use state::{Account, AppState};

mod background;
mod main;
mod state;

pub use background::BackgroundService;
pub use main::Supervisor;
pub use state::{ExitOutcome, Phase};

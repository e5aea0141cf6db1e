pub mod channel;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod receiver;
pub mod scenario_runner;
pub mod trace;
pub mod window;

pub use engine::{Round, Simulator, derive_window_size};
pub use error::SimError;
pub use event::RoundEvent;
pub use trace::SimulationReport;

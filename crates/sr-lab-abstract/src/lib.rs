pub mod config;
pub mod packet;
pub mod scenario;

pub use packet::Packet;

pub use config::{STALLED_ROUND_LIMIT, SimConfig};
pub use scenario::{SimConfigOverride, TestAction, TestAssertion, TestScenario};

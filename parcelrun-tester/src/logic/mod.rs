pub mod autopilot;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use autopilot::{Autopilot, AutopilotPlan, DrivingStyle, RunSummary};
pub use seeds::resolve_seed_inputs;
pub use tester::*;

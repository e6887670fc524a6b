//! Risk scoring: fusion, level state machine, alerts and the risk state.

pub mod alert;
pub mod fusion;
pub mod level;
pub mod state;

pub use alert::{Alert, AlertHistory};
pub use fusion::ScoreBreakdown;
pub use level::{LevelMachine, LevelTransition, RiskLevel};
pub use state::RiskState;

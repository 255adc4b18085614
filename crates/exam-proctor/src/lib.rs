pub mod controller;
pub mod scenario;
pub mod submit_gate;

pub use controller::{Collaborators, ExamSession, ProctorError};
pub use scenario::{ReplayReport, Scenario, ScenarioError, ScenarioRunner, Step};
pub use submit_gate::SubmitGate;

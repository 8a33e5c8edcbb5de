pub mod controller;

pub use controller::{CommitGestureController, CommitRequest, GestureConfig, GestureOutcome, GesturePhase};

//! Case simulation and scoring engine for clinical-interview training.
//!
//! A trainee interviews a simulated patient, selects symptoms, proposes a
//! diagnosis and a treatment, and receives a graded outcome. The engine owns the
//! case lifecycle and every scoring rule; rendering, content authoring and
//! storage mechanics live with the callers.

pub mod catalog;
pub mod config;
pub mod error;
pub mod simulation;
pub mod telemetry;

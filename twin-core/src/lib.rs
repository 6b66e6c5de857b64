//! Digital-twin engine for the homestead property viewer.
//!
//! This crate provides:
//! - The world registry of modeled homestead objects and their
//!   capabilities (interaction, SOP links, telemetry display)
//! - Annotations with JSON persistence
//! - Build-out phase gating with visibility and level streaming
//! - Mutually-exclusive scenario simulations
//! - A tick-driven telemetry cache with mock and live modes
//! - Focus tracking and pawn locomotion for the desktop and VR schemes
//!
//! # Quick Start
//!
//! ```no_run
//! use twin_core::{Phase, TwinConfig, TwinSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TwinConfig::new("homestead-twin").with_telemetry_interval(1.0);
//!     let mut session = TwinSession::new(config);
//!
//!     session.telemetry_mut().start();
//!     session.set_phase(Phase::Phase1);
//!
//!     // Drive the session from the frame clock
//!     session.tick(0.016);
//!
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod defs;
pub mod interaction;
pub mod pawn;
pub mod persist;
pub mod phases;
pub mod scenarios;
pub mod session;
pub mod sop;
pub mod telemetry;
pub mod testing;
pub mod world;

// Primary public API
pub use annotations::{Annotation, AnnotationId, AnnotationStore};
pub use interaction::{FocusHooks, FocusTracker, Pose, Raycaster};
pub use pawn::{Action, AxisInput, DesktopPawn, InputEvent, VrPawn};
pub use phases::{Phase, PhaseDefinition, PhaseManager};
pub use scenarios::{ScenarioDefinition, ScenarioId, ScenarioManager};
pub use session::{SessionError, TwinConfig, TwinSession};
pub use sop::{Sop, SopId, SopLibrary, SopStep};
pub use telemetry::{StatusColor, StatusThresholds, TelemetryHub, TelemetrySample};
pub use testing::TestHarness;
pub use world::{HomesteadObject, ObjectId, TwinWorld};

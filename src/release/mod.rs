//! Release planning
//!
//! - **plan**: the release plan aggregate and its viability predicates
//! - **builder**: assembles a plan from the server for one project and channel
//! - **rules**: channel version rules and the remote rule check

pub mod builder;
pub mod plan;
pub mod rules;

pub use builder::ReleasePlanBuilder;
pub use plan::ReleasePlan;

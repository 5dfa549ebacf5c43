//! Workflow state and implementation plans.
//!
//! ## Documents
//!
//! - `.titanium/workflow-state.json` - goal, current phase, phase history
//! - `.titanium/plan.json` - epics, stories and agent-assigned tasks
//!
//! Both are rewritten whole on every change through a [`DocumentStore`].
//!
//! [`DocumentStore`]: crate::core::DocumentStore

mod plan;
mod state;

pub use plan::{
    load_plan, parse_plan_response, Epic, Plan, PlanError, PlanGenerator, PlanTask, Story,
    REQUIRED_PLAN_KEYS,
};
pub use state::{PhaseRecord, StateError, WorkflowState, WorkflowStatus, WorkflowStore};

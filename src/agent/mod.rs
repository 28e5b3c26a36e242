//! Core agent logic.
//!
//! The agent orchestrates one turn per question:
//! - Database connection check
//! - SQL generation and execution
//! - Inline or spreadsheet presentation
//! - Plain-language summary appended to the session log

mod agent_loop;
mod session;

pub use agent_loop::{Agent, AgentDeps, Answer, NO_RESULTS_MESSAGE};
pub use session::{Session, TurnState};

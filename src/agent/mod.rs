pub mod builtins;
pub mod dispatch;
pub mod history;
#[path = "loop.rs"]
pub mod agent_loop;
pub mod registry;
pub mod retry;

pub use agent_loop::{AgentLoop, AgentLoopConfig, RunBudget, RunReport, StopReason};

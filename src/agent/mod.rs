//! The autonomous agent: decision loop, selection and memory boundaries.

mod decision_loop;
mod memory;
mod selector;
mod state;
mod summary;

pub use decision_loop::{AgentHandle, AgentParts, DecisionLoop, LoopSettings};
pub use memory::{JsonlMemorySink, MemoryRecord, MemorySink, TracingMemorySink};
pub use selector::{Selection, StrategySelector, TopRankedSelector};
pub use state::{AgentState, HaltSwitch, LoopState};
pub use summary::{CycleDisposition, CycleSummary};

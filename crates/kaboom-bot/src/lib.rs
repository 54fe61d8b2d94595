#![deny(warnings)]
pub mod playout;
pub mod policy;
pub mod pool;
pub mod sim;
pub mod telemetry;

pub use playout::playout;
pub use policy::TabularPolicy;
pub use pool::SubtreePool;
pub use sim::{SimulationReport, simulate_batch, update_belief};
pub use telemetry::{CounterSnapshot, SearchCounters};

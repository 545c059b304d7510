// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, M6502State};

pub mod m6502;
pub use m6502::{C64Bus, Cpu6502};

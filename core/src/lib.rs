pub mod core;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod machine;
pub mod memory;
pub mod sid;
pub mod vic;

pub mod prelude {
    pub use crate::core::{Bus, BusMaster, bus::InterruptState};
    pub use crate::cpu::{C64Bus, Cpu6502};
    pub use crate::disk::DiskImage;
    pub use crate::error::EmuError;
    pub use crate::machine::{AudioOut, InputButton, Machine, PixelSink};
    pub use crate::memory::Ram64k;
    pub use crate::sid::Sid;
    pub use crate::vic::Vic;
}

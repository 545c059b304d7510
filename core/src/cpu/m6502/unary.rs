//! Read-modify-write memory INC/DEC helpers. Register INC/DEC and the flag
//! instructions are compact enough to stay inline in the dispatcher.

use super::{Cpu6502, C64Bus, CPU_MASTER};
use crate::core::Bus;

impl Cpu6502 {
    pub(super) fn inc_mem<B: C64Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        let v = bus.read(CPU_MASTER, addr).wrapping_add(1);
        bus.write(CPU_MASTER, addr, v);
        self.set_zn(v);
    }

    pub(super) fn dec_mem<B: C64Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        let v = bus.read(CPU_MASTER, addr).wrapping_sub(1);
        bus.write(CPU_MASTER, addr, v);
        self.set_zn(v);
    }
}

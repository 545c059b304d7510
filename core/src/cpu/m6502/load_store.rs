//! LDA/LDX/LDY and STA/STX/STY across every addressing mode they support.
//! Register-transfer instructions (TAX/TAY/TXA/TYA/TSX/TXS) are small enough
//! to live inline in the dispatcher.

use super::{Cpu6502, C64Bus, CPU_MASTER};
use crate::core::Bus;

impl Cpu6502 {
    pub(super) fn op_lda<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let (value, extra_bytes, cycles) = match opcode {
            0xA9 => (data, 2, 2),
            0xA5 => (bus.read(CPU_MASTER, data as u16), 2, 3),
            0xB5 => {
                let a = self.zero_page_x(data);
                (bus.read(CPU_MASTER, a), 2, 4)
            }
            0xAD => (bus.read(CPU_MASTER, address), 3, 4),
            0xBD => {
                let a = self.absolute_x(address, true);
                (bus.read(CPU_MASTER, a), 3, 4)
            }
            0xB9 => {
                let a = self.absolute_y(address, true);
                (bus.read(CPU_MASTER, a), 3, 4)
            }
            0xA1 => {
                let a = self.indirect_x(bus, data);
                (bus.read(CPU_MASTER, a), 2, 6)
            }
            0xB1 => {
                let a = self.indirect_y(bus, data, true);
                (bus.read(CPU_MASTER, a), 2, 5)
            }
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        self.a = value;
        self.set_zn(self.a);
        self.cycles += cycles;
    }

    pub(super) fn op_ldx<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let (value, extra_bytes, cycles) = match opcode {
            0xA2 => (data, 2, 2),
            0xA6 => (bus.read(CPU_MASTER, data as u16), 2, 3),
            0xB6 => {
                let a = self.zero_page_y(data);
                (bus.read(CPU_MASTER, a), 2, 4)
            }
            0xAE => (bus.read(CPU_MASTER, address), 3, 4),
            0xBE => {
                let a = self.absolute_y(address, true);
                (bus.read(CPU_MASTER, a), 3, 4)
            }
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        self.x = value;
        self.set_zn(self.x);
        self.cycles += cycles;
    }

    pub(super) fn op_ldy<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let (value, extra_bytes, cycles) = match opcode {
            0xA0 => (data, 2, 2),
            0xA4 => (bus.read(CPU_MASTER, data as u16), 2, 3),
            0xB4 => {
                let a = self.zero_page_x(data);
                (bus.read(CPU_MASTER, a), 2, 4)
            }
            0xAC => (bus.read(CPU_MASTER, address), 3, 4),
            0xBC => {
                let a = self.absolute_x(address, true);
                (bus.read(CPU_MASTER, a), 3, 4)
            }
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        self.y = value;
        self.set_zn(self.y);
        self.cycles += cycles;
    }

    pub(super) fn op_sta<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let a = self.a;
        let (addr, extra_bytes, cycles) = match opcode {
            0x85 => (data as u16, 2, 3),
            0x95 => (self.zero_page_x(data), 2, 4),
            0x8D => (address, 3, 4),
            0x9D => (self.absolute_x(address, false), 3, 5),
            0x99 => (self.absolute_y(address, false), 3, 5),
            0x81 => (self.indirect_x(bus, data), 2, 6),
            0x91 => (self.indirect_y(bus, data, false), 2, 6),
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        bus.write(CPU_MASTER, addr, a);
        self.cycles += cycles;
    }

    pub(super) fn op_stx<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let x = self.x;
        let (addr, extra_bytes, cycles) = match opcode {
            0x86 => (data as u16, 2, 3),
            0x96 => (self.zero_page_y(data), 2, 4),
            0x8E => (address, 3, 4),
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        bus.write(CPU_MASTER, addr, x);
        self.cycles += cycles;
    }

    pub(super) fn op_sty<B: C64Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, data: u8, address: u16) {
        let y = self.y;
        let (addr, extra_bytes, cycles) = match opcode {
            0x84 => (data as u16, 2, 3),
            0x94 => (self.zero_page_x(data), 2, 4),
            0x8C => (address, 3, 4),
            _ => unreachable!(),
        };
        self.pc = self.pc.wrapping_add(extra_bytes);
        bus.write(CPU_MASTER, addr, y);
        self.cycles += cycles;
    }
}

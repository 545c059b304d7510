//! ASL, LSR, ROL, ROR. Each returns the shifted byte; the dispatcher decides
//! whether it lands back in the accumulator or in memory.

use super::{Cpu6502, StatusFlag::*};

impl Cpu6502 {
    pub(super) fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(C, value & 0x80 != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    pub(super) fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    pub(super) fn rol(&mut self, value: u8) -> u8 {
        let carry_in = if self.flag(C) { 1 } else { 0 };
        self.set_flag(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_zn(result);
        result
    }

    pub(super) fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.flag(C) { 0x80 } else { 0 };
        self.set_flag(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_zn(result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asl_shifts_high_bit_into_carry() {
        let mut cpu = Cpu6502::new(false);
        assert_eq!(cpu.asl(0x81), 0x02);
        assert!(cpu.flag(C));
    }

    #[test]
    fn ror_rotates_carry_into_bit_seven() {
        let mut cpu = Cpu6502::new(false);
        cpu.set_flag(C, true);
        assert_eq!(cpu.ror(0x01), 0x80);
        assert!(cpu.flag(C));
        assert!(cpu.flag(N));
    }
}

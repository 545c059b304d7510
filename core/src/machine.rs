//! Ties memory, CPU, VIC-II and SID into a runnable Commodore 64.
//!
//! `Machine` is the only type in this crate that implements `Bus`/`C64Bus`.
//! Memory and the chips it exposes never call back into `Machine` directly;
//! `Machine::read`/`write` intercepts the I/O page and dispatches to
//! `io_read`/`io_write` itself, so nothing here holds a pointer back to its
//! owner.

use std::collections::{HashMap, HashSet};

use crate::core::bus::InterruptState;
use crate::core::{Bus, BusMaster};
use crate::cpu::{C64Bus, Cpu6502};
use crate::disk::{DiskImage, FileHandle};
use crate::memory::Ram64k;
use crate::sid::Sid;
use crate::vic::Vic;

const RASTER_LINES: i32 = 312;
const CYCLES_PER_LINE: i32 = 63;
const FRAME_CYCLES: i32 = RASTER_LINES * CYCLES_PER_LINE;
const FIRST_VISIBLE_LINE: i32 = 50;
const FIRST_INVISIBLE_LINE: i32 = 250;
const AUDIO_FRAME_SAMPLES: usize = 882; // 44100 Hz / 50 fps

/// A single logical input the frontend can bind a host key to. The C64
/// keyboard itself is driven through [`Machine::handle_key`] with a host
/// key code; this only names the five joystick directions sitting on the
/// same port, for a frontend key-binding legend.
pub struct InputButton {
    pub id: u32,
    pub name: &'static str,
}

pub static JOYSTICK_BUTTONS: &[InputButton] = &[
    InputButton { id: KEY_UP, name: "Joystick Up" },
    InputButton { id: KEY_DOWN, name: "Joystick Down" },
    InputButton { id: KEY_LEFT, name: "Joystick Left" },
    InputButton { id: KEY_RIGHT, name: "Joystick Right" },
    InputButton { id: KEY_FIRE, name: "Joystick Fire" },
];

/// Receives a completed frame as 320x200 ARGB8888 pixels.
pub trait PixelSink {
    fn present(&mut self, rgba: &[u32; 320 * 200]);
}

/// Receives decoded PCM samples for playback.
pub trait AudioOut {
    /// How many more buffers of `queue_buffer`'s size the sink can accept
    /// right now without blocking or growing unbounded.
    fn num_free_buffers(&self) -> usize;
    fn queue_buffer(&mut self, samples: &[i16]);
}

// Standard browser KeyboardEvent.keyCode values for the arrow keys and
// Ctrl; used both for joystick emulation at $DC00 and to keep the matrix
// table below self-contained.
const KEY_UP: u32 = 38;
const KEY_DOWN: u32 = 40;
const KEY_LEFT: u32 = 37;
const KEY_RIGHT: u32 = 39;
const KEY_FIRE: u32 = 17; // Ctrl

/// Host key code -> C64 keyboard matrix slot (row * 8 + col), standard
/// matrix wiring. Arrow keys and Ctrl are deliberately absent: they drive
/// the $DC00 joystick nibble instead, per `io_read`.
///
/// TODO: function keys, @, colon, the British pound sign and C= have no
/// natural host key code and are left unmapped.
const KEY_MAPPINGS: &[(u32, u8)] = &[
    (8, 0),    // Backspace -> INST/DEL
    (13, 1),   // Enter -> RETURN
    (49, 56),  // '1'
    (50, 59),  // '2'
    (51, 8),   // '3'
    (52, 11),  // '4'
    (53, 16),  // '5'
    (54, 19),  // '6'
    (55, 24),  // '7'
    (56, 27),  // '8'
    (57, 32),  // '9'
    (48, 35),  // '0'
    (65, 10),  // A
    (66, 28),  // B
    (67, 20),  // C
    (68, 18),  // D
    (69, 14),  // E
    (70, 21),  // F
    (71, 26),  // G
    (72, 29),  // H
    (73, 33),  // I
    (74, 34),  // J
    (75, 37),  // K
    (76, 42),  // L
    (77, 36),  // M
    (78, 39),  // N
    (79, 38),  // O
    (80, 41),  // P
    (81, 62),  // Q
    (82, 17),  // R
    (83, 13),  // S
    (84, 22),  // T
    (85, 30),  // U
    (86, 31),  // V
    (87, 9),   // W
    (88, 23),  // X
    (89, 25),  // Y
    (90, 12),  // Z
    (16, 15),  // Shift -> left shift
    (32, 60),  // Space
    (27, 63),  // Escape -> RUN/STOP
    (188, 47), // ,
    (190, 44), // .
    (191, 55), // /
    (186, 50), // ;
    (187, 53), // =
    (189, 43), // -
];

pub struct Machine {
    ram: Ram64k,
    cpu: Cpu6502,
    vic: Vic,
    sid: Sid,
    disk: Option<DiskImage>,
    file_handle: FileHandle,
    filename: Vec<u8>,

    key_matrix: [u8; 8],
    keys_down: HashSet<u32>,
    key_mappings: HashMap<u32, u8>,

    line_counter: i32,
    audio_cycles: i32,

    cia_timer: i32,
    cia_timer_irq_enable: bool,
    cia_timer_irq_flag: bool,
}

impl Machine {
    /// Construction only: no ROM is loaded and no disk directory is read
    /// until [`Machine::reset`] runs.
    pub fn new(disk: Option<DiskImage>) -> Self {
        Self {
            ram: Ram64k::new(),
            cpu: Cpu6502::default(),
            vic: Vic::new(),
            sid: Sid::new(),
            disk,
            file_handle: FileHandle::default(),
            filename: Vec::new(),
            key_matrix: [0xFF; 8],
            keys_down: HashSet::new(),
            key_mappings: KEY_MAPPINGS.iter().copied().collect(),
            line_counter: 0,
            audio_cycles: 0,
            cia_timer: 0,
            cia_timer_irq_enable: false,
            cia_timer_irq_flag: false,
        }
    }

    /// Swaps the mounted disk image without rebooting the machine.
    pub fn mount(&mut self, disk: DiskImage) {
        self.disk = Some(disk);
    }

    pub fn jammed(&self) -> bool {
        self.cpu.jam()
    }

    pub fn input_map(&self) -> &'static [InputButton] {
        JOYSTICK_BUTTONS
    }

    /// Full boot sequence: resets every chip, writes the default VIC/CIA
    /// register state, streams the first directory entry off the mounted
    /// disk into RAM, and points the reset vector at BASIC's warm start or
    /// the loaded program, whichever the load address calls for. Safe to
    /// call again to reboot with whatever disk is currently mounted.
    pub fn reset(&mut self) {
        self.ram = Ram64k::new();
        self.cpu = Cpu6502::default();
        self.vic = Vic::new();
        self.sid = Sid::new();
        self.file_handle = FileHandle::default();
        self.filename.clear();
        self.line_counter = 0;
        self.audio_cycles = 0;
        self.cia_timer = 0;
        self.cia_timer_irq_enable = false;
        self.cia_timer_irq_flag = false;

        self.ram.write_ram(0x01, 0x37);
        self.ram.write_io_shadow(0xD018, 0x14);
        self.ram.write_io_shadow(0xD011, 27);
        self.ram.write_io_shadow(0xD016, 24);
        self.ram.write_io_shadow(0xDD00, 0x03);
        self.ram.write_io_shadow(0xD030, 0xFF);
        self.ram.write_io_shadow(0xD0BC, 0xFF);
        self.ram.write_io_shadow(0xDC00, 0xFF);

        if let Some(disk) = &self.disk {
            let mut handle = disk.open_file(&[]);
            if handle.is_open() {
                let lo = disk.read_byte(&mut handle) as u16;
                let hi = disk.read_byte(&mut handle) as u16;
                let load_address = lo | (hi << 8);
                let mut addr = load_address;
                while handle.is_open() {
                    let byte = disk.read_byte(&mut handle);
                    self.ram.write_ram(addr, byte);
                    addr = addr.wrapping_add(1);
                }
                log::info!(
                    "loaded {} bytes at ${:04X}",
                    addr.wrapping_sub(load_address),
                    load_address
                );
                if load_address <= 0x032C {
                    let lo = self.ram.read_ram(0x032C);
                    let hi = self.ram.read_ram(0x032D);
                    self.ram.write_ram(0xFFFC, lo);
                    self.ram.write_ram(0xFFFD, hi);
                } else {
                    self.ram.write_ram(0xFFFC, 0x0D);
                    self.ram.write_ram(0xFFFD, 0x08);
                }
            } else {
                log::warn!("mounted disk image has no bootable file in its directory");
            }
        } else {
            log::warn!("Machine::reset with no disk image mounted");
        }

        self.cpu.request_reset();
        self.run_cpu_until(1);
    }

    /// Runs one 312-line frame, renders the visible raster lines and hands
    /// the completed bitmap to `sink`.
    pub fn update<P: PixelSink>(&mut self, sink: &mut P) {
        self.cpu.cycles = 0;
        self.audio_cycles = 0;
        self.vic.begin_frame();

        for line in 0..RASTER_LINES {
            self.update_line_irq(line);
            self.run_cpu_until(line * CYCLES_PER_LINE);
            if (FIRST_VISIBLE_LINE..FIRST_INVISIBLE_LINE).contains(&line) {
                self.vic.render_line(&self.ram);
            }
        }

        if self.audio_cycles < FRAME_CYCLES {
            let remaining = FRAME_CYCLES - self.audio_cycles;
            self.sid.buffer(&self.ram, remaining);
            self.audio_cycles = FRAME_CYCLES;
        }

        sink.present(self.vic.pixels());
    }

    /// Drains whatever whole audio frames have accumulated since the last
    /// call, backing off once the sink reports it has no free buffers.
    pub fn queue_audio<A: AudioOut>(&mut self, audio: &mut A) {
        while self.sid.sample_count() >= AUDIO_FRAME_SAMPLES && audio.num_free_buffers() > 0 {
            let buffer = self.sid.drain(AUDIO_FRAME_SAMPLES);
            audio.queue_buffer(&buffer);
        }
    }

    /// Host key code + pressed state. Arrow keys and Ctrl feed the $DC00
    /// joystick nibble; everything in [`KEY_MAPPINGS`] feeds the keyboard
    /// matrix row CIA1 scans through $DC00/$DC01.
    pub fn handle_key(&mut self, code: u32, down: bool) {
        if down {
            self.keys_down.insert(code);
        } else {
            self.keys_down.remove(&code);
        }
        if let Some(&slot) = self.key_mappings.get(&code) {
            let row = (slot >> 3) as usize;
            let col = slot & 0x7;
            if down {
                self.key_matrix[row] &= !(1 << col);
            } else {
                self.key_matrix[row] |= 1 << col;
            }
        }
    }

    fn update_line_irq(&mut self, line: i32) {
        self.line_counter = line;

        if self.ram.read_io_shadow(0xD01A) & 0x01 != 0 {
            let d011 = self.ram.read_io_shadow(0xD011);
            let d012 = self.ram.read_io_shadow(0xD012);
            let target = (((d011 & 0x80) as i32) << 1) | d012 as i32;
            if self.line_counter == target {
                self.cpu.set_irq();
            }
        }

        if self.ram.read_io_shadow(0xDC0E) & 0x01 != 0 && self.cia_timer > 0 {
            self.cia_timer -= CYCLES_PER_LINE;
            if self.cia_timer <= 0 {
                self.cia_timer = 0;
                if self.cia_timer_irq_enable {
                    self.cia_timer_irq_flag = true;
                    self.cpu.set_irq();
                }
            }
        }
    }

    fn io_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0xDC00 => {
                let mut joystick = 0u8;
                if self.keys_down.contains(&KEY_UP) {
                    joystick |= 0x01;
                }
                if self.keys_down.contains(&KEY_DOWN) {
                    joystick |= 0x02;
                }
                if self.keys_down.contains(&KEY_LEFT) {
                    joystick |= 0x04;
                }
                if self.keys_down.contains(&KEY_RIGHT) {
                    joystick |= 0x08;
                }
                if self.keys_down.contains(&KEY_FIRE) {
                    joystick |= 0x10;
                }
                Some(joystick ^ 0xFF)
            }
            0xDC01 => {
                let columns = self.ram.read_io_shadow(0xDC00);
                let mut row = None;
                for i in 0..8 {
                    if columns & (1 << i) == 0 {
                        row = Some(i);
                        break;
                    }
                }
                Some(row.map(|r| self.key_matrix[r]).unwrap_or(0xFF))
            }
            0xD011 => {
                let high_bit = if self.line_counter >= 256 { 0x80 } else { 0x00 };
                Some(high_bit | (self.ram.read_io_shadow(0xD011) & 0x7F))
            }
            0xD012 => Some((self.line_counter & 0xFF) as u8),
            0xDC0D => {
                let mut value = 0u8;
                if self.cia_timer_irq_enable {
                    value |= 0x01;
                }
                if self.cia_timer_irq_flag {
                    value |= 0x80;
                }
                self.cia_timer_irq_flag = false;
                Some(value)
            }
            _ => None,
        }
    }

    fn io_write(&mut self, addr: u16, value: u8) {
        if (0xD400..=0xD418).contains(&addr) {
            let elapsed = self.cpu.cycles - self.audio_cycles;
            self.sid.buffer(&self.ram, elapsed);
            self.audio_cycles = self.cpu.cycles;
        }

        match addr {
            0xDC0D => {
                if value & 0x80 != 0 {
                    if value & 0x01 != 0 {
                        self.cia_timer_irq_enable = true;
                    }
                } else if value & 0x01 != 0 {
                    self.cia_timer_irq_enable = false;
                }
            }
            0xDC0E => {
                if value & 0x10 != 0 {
                    let lo = self.ram.read_io_shadow(0xDC04) as i32;
                    let hi = self.ram.read_io_shadow(0xDC05) as i32;
                    self.cia_timer = lo | (hi << 8);
                }
            }
            _ => {}
        }
    }

    fn run_cpu_until(&mut self, target_cycles: i32) {
        let self_ptr: *mut Machine = self;
        // Safety: Cpu6502::run_until drives `self.cpu` and touches the rest
        // of `Machine` only through the C64Bus methods below (memory
        // access and kernal traps); it never reads its own registers back
        // through the bus, so the two aliases never actually overlap.
        unsafe {
            self.cpu.run_until(&mut *self_ptr, target_cycles);
        }
    }
}

impl Bus for Machine {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        if self.ram.banking_enabled() && (0xD000..0xE000).contains(&addr) {
            if let Some(value) = self.io_read(addr) {
                return value;
            }
        }
        self.ram.read(addr)
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        if self.ram.banking_enabled() && (0xD000..0xE000).contains(&addr) {
            self.io_write(addr, data);
        }
        self.ram.write(addr, data);
    }

    fn is_halted_for(&self, _master: BusMaster) -> bool {
        false
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState::default()
    }
}

impl C64Bus for Machine {
    fn kernal_trap(&mut self, pc: u16) {
        match pc {
            0xFFBD => {
                // SETNAM: A = length, X/Y = pointer low/high.
                let len = self.cpu.a as u16;
                let addr = (self.cpu.y as u16) << 8 | self.cpu.x as u16;
                self.filename = (0..len).map(|i| self.ram.read_ram(addr.wrapping_add(i))).collect();
            }
            0xFFC6 => {
                // CHKIN: open the named file for reading.
                let _ = self.file_handle.close();
                match &self.disk {
                    Some(disk) => self.file_handle = disk.open_file(&self.filename),
                    None => log::warn!("CHKIN with no disk image mounted"),
                }
            }
            0xFFCF => {
                // CHRIN: A = next byte, $90 = I/O status (0x40 on EOF).
                if self.file_handle.is_open() {
                    if let Some(disk) = &self.disk {
                        self.cpu.a = disk.read_byte(&mut self.file_handle);
                        let status = if self.file_handle.is_open() { 0x00 } else { 0x40 };
                        self.ram.write_ram(0x90, status);
                    }
                } else {
                    self.ram.write_ram(0x90, 0x42);
                }
            }
            0xFFC9 => {
                // CHKOUT: open the named file for writing.
                let _ = self.file_handle.close();
                if let Some(disk) = &self.disk {
                    self.file_handle = disk.open_for_write(&self.filename);
                }
            }
            0xFFD2 => {
                // CHROUT: write A to the open file.
                if self.file_handle.is_open() {
                    if let Some(disk) = &self.disk {
                        let value = self.cpu.a;
                        disk.write_byte(&mut self.file_handle, value);
                    }
                }
            }
            0xFFC3 => {
                // CLOSE: flush a write handle into the save overlay.
                if let Some((key, buffer)) = self.file_handle.close() {
                    if let Some(disk) = &mut self.disk {
                        disk.commit_save(key, buffer);
                    }
                }
            }
            0xFFA8 => {
                // CIOUT: serial bus byte-out, unused without a real drive.
                self.ram.write_ram(0x90, 0x80);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_with_program(name: &str, load_address: u16, body: &[u8]) -> DiskImage {
        // Build against a throwaway image purely to read off real sector
        // offsets (D64 track lengths vary by zone), then lay out the
        // directory entry (track 18/1) and file data (track 20/0) for real.
        const D64_SIZE: usize = 174848;
        let offsets = DiskImage::new("t", vec![0u8; D64_SIZE]).unwrap();
        let dir_base = offsets.sector_offset(18, 1).unwrap();
        let file_base = offsets.sector_offset(20, 0).unwrap();

        let mut data = vec![0u8; D64_SIZE];
        data[dir_base] = 0; // no further directory sectors
        data[dir_base + 1] = 0xFF;
        data[dir_base + 2] = 0x82; // PRG, closed
        data[dir_base + 3] = 20; // file track
        data[dir_base + 4] = 0; // file sector
        let filename = name.as_bytes();
        for (i, &b) in filename.iter().enumerate() {
            data[dir_base + 5 + i] = b;
        }
        for i in filename.len()..16 {
            data[dir_base + 5 + i] = 0xA0;
        }

        let mut payload = Vec::new();
        payload.push((load_address & 0xFF) as u8);
        payload.push((load_address >> 8) as u8);
        payload.extend_from_slice(body);
        assert!(payload.len() <= 254);
        data[file_base] = 0; // no next sector
        data[file_base + 1] = (payload.len() - 1) as u8;
        data[file_base + 2..file_base + 2 + payload.len()].copy_from_slice(&payload);

        DiskImage::new(name, data).unwrap()
    }

    /// Unlike `disk_with_program`, this lays down `body` as-is: CHRIN has
    /// no notion of a load-address header, that is purely `reset`'s doing.
    fn disk_with_raw_file(name: &str, body: &[u8]) -> DiskImage {
        const D64_SIZE: usize = 174848;
        let offsets = DiskImage::new("t", vec![0u8; D64_SIZE]).unwrap();
        let dir_base = offsets.sector_offset(18, 1).unwrap();
        let file_base = offsets.sector_offset(20, 0).unwrap();

        let mut data = vec![0u8; D64_SIZE];
        data[dir_base] = 0;
        data[dir_base + 1] = 0xFF;
        data[dir_base + 2] = 0x82;
        data[dir_base + 3] = 20;
        data[dir_base + 4] = 0;
        for (i, &b) in name.as_bytes().iter().enumerate() {
            data[dir_base + 5 + i] = b;
        }

        assert!(body.len() <= 254);
        data[file_base] = 0;
        data[file_base + 1] = (body.len() - 1) as u8;
        data[file_base + 2..file_base + 2 + body.len()].copy_from_slice(body);

        DiskImage::new(name, data).unwrap()
    }

    #[test]
    fn reset_loads_program_and_points_pc_at_basic_warm_start() {
        let disk = disk_with_program("PROGRAM", 0x0801, &[0xA9, 0x42]);
        let mut machine = Machine::new(Some(disk));
        machine.reset();
        assert_eq!(machine.ram.read_ram(0x0801), 0xA9);
        assert_eq!(machine.ram.read_ram(0x0802), 0x42);
        assert!(!machine.jammed());
    }

    #[test]
    fn chrin_reports_eof_on_the_last_byte_of_a_three_byte_file() {
        let disk = disk_with_raw_file("DATA", &[0x11, 0x22, 0x33]);
        let mut machine = Machine::new(Some(disk));
        machine.filename = b"DATA".to_vec();
        machine.cpu.a = 4;
        machine.cpu.x = 0;
        machine.cpu.y = 0;
        C64Bus::kernal_trap(&mut machine, 0xFFC6);
        assert!(machine.file_handle.is_open());

        C64Bus::kernal_trap(&mut machine, 0xFFCF);
        assert_eq!(machine.cpu.a, 0x11);
        assert_eq!(machine.ram.read_ram(0x90), 0x00);

        C64Bus::kernal_trap(&mut machine, 0xFFCF);
        assert_eq!(machine.cpu.a, 0x22);
        assert_eq!(machine.ram.read_ram(0x90), 0x00);

        C64Bus::kernal_trap(&mut machine, 0xFFCF);
        assert_eq!(machine.cpu.a, 0x33);
        assert_eq!(machine.ram.read_ram(0x90), 0x40);
    }

    #[test]
    fn handle_key_sets_and_clears_matrix_bit() {
        let mut machine = Machine::new(None);
        machine.handle_key(65, true); // 'A' -> row1 col2
        assert_eq!(machine.key_matrix[1] & (1 << 2), 0);
        machine.handle_key(65, false);
        assert_ne!(machine.key_matrix[1] & (1 << 2), 0);
    }

    #[test]
    fn arrow_keys_drive_the_joystick_port_instead_of_the_matrix() {
        let mut machine = Machine::new(None);
        machine.handle_key(KEY_UP, true);
        let joystick = machine.io_read(0xDC00).unwrap();
        assert_eq!(joystick & 0x01, 0);
        assert_eq!(machine.key_matrix, [0xFF; 8]);
    }

    #[test]
    fn raster_irq_target_uses_the_documented_double_shift() {
        // D011 bit 7 set + D012 = $34 should fire at raster line $134
        // (0x80 << 1 | 0x34), not at $B4 or $1B4, the literal-translation
        // bug this crate preserves on purpose.
        let mut machine = Machine::new(None);
        for addr in 0..0x200u16 {
            machine.ram.write_ram(addr, 0xEA); // NOP, so an un-serviced IRQ just idles
        }
        machine.ram.write_ram(0xFFFE, 0x00);
        machine.ram.write_ram(0xFFFF, 0x10); // IRQ vector -> $1000
        machine.cpu.p &= !0x04; // clear I so the IRQ is serviced
        machine.ram.write_io_shadow(0xD01A, 0x01);
        machine.ram.write_io_shadow(0xD011, 0x80);
        machine.ram.write_io_shadow(0xD012, 0x34);

        machine.update_line_irq(0x1B4);
        machine.run_cpu_until(1);
        assert_eq!(machine.cpu.p & 0x04, 0, "line $1B4 must not trigger the $134 target");

        machine.update_line_irq(0x134);
        machine.run_cpu_until(machine.cpu.cycles + 1);
        assert_ne!(machine.cpu.p & 0x04, 0, "matching the target must service the IRQ");
    }

    #[test]
    fn sid_register_write_flushes_audio_up_to_the_current_cycle() {
        let mut machine = Machine::new(None);
        machine.ram.write_ram(0x01, 0x37);
        machine.cpu.cycles = 1000;
        machine.write(BusMaster::Cpu(0), 0xD404, 0x11);
        assert_eq!(machine.audio_cycles, 1000);
    }
}

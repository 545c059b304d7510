//! A 1541-style disk image: raw D64/D81 sector data plus a directory walk
//! and chained sector reads, matching what the Kernal trap layer in
//! `machine.rs` expects from `OPEN`/`CHKIN`/`CHRIN`/`CLOSE`.
//!
//! Everything here is in-memory; persisting a save overlay to the host
//! filesystem is the frontend's job (§5: disk operations are "expected to
//! be in-memory-backed by the host").

use std::collections::HashMap;

use crate::error::EmuError;

const MAX_D64_TRACK: usize = 35;
const MAX_TRACK: usize = 80;
const MAX_SECTOR: usize = 40;

#[rustfmt::skip]
const D64_SECTORS_PER_TRACK: [usize; MAX_D64_TRACK + 1] = [
    0, 21,21,21,21,21,21,21,21,21,21,21,21,21,21,21,21,21,
    19,19,19,19,19,19,19,
    18,18,18,18,18,18,
    17,17,17,17,17,
];

const D64_SIZE: usize = 174848;
const D81_SIZE: usize = 819200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskKind {
    D64,
    D81,
}

#[derive(Clone, Default)]
struct ReaderState {
    data: Vec<u8>,
    pos: usize,
}

#[derive(Clone, Default)]
struct WriterState {
    key: Vec<u8>,
    buffer: Vec<u8>,
}

/// A cursor into an open file: either a live sector chain inside the disk
/// image, or an external reader/writer sourced from the save overlay.
#[derive(Clone, Default)]
pub struct FileHandle {
    track: u8,
    sector: u8,
    offset: u16,
    reader: Option<ReaderState>,
    writer: Option<WriterState>,
    visited: Vec<(u8, u8)>,
}

impl FileHandle {
    pub fn is_open(&self) -> bool {
        self.track != 0 || self.reader.is_some() || self.writer.is_some()
    }

    /// Finalize a write handle, handing the accumulated bytes back to the
    /// caller to commit into the image's save overlay. A no-op on handles
    /// that were never opened for write.
    pub fn close(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        self.reader = None;
        self.track = 0;
        self.writer.take().map(|w| (w.key, w.buffer))
    }
}

pub struct DiskImage {
    name: String,
    kind: DiskKind,
    data: Vec<u8>,
    sector_offsets: Vec<Vec<usize>>,
    saves: HashMap<Vec<u8>, Vec<u8>>,
}

impl DiskImage {
    /// Build an image from raw bytes already read by the host (no direct
    /// filesystem access happens inside the core). Rejects anything that
    /// isn't exactly a D64 or D81-sized buffer; this is the one place in
    /// the system where failure is signalled rather than absorbed into
    /// state, since there's no component yet to hold a bad result.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self, EmuError> {
        let kind = match data.len() {
            D64_SIZE => DiskKind::D64,
            D81_SIZE => DiskKind::D81,
            got => return Err(EmuError::DiskImageSize { got }),
        };
        let sector_offsets = Self::make_sector_table(kind);
        Ok(Self {
            name: name.into(),
            kind,
            data,
            sector_offsets,
            saves: HashMap::new(),
        })
    }

    pub fn kind(&self) -> DiskKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn make_sector_table(kind: DiskKind) -> Vec<Vec<usize>> {
        let mut table = vec![Vec::new(); MAX_TRACK + 1];
        let mut offset = 0usize;
        match kind {
            DiskKind::D64 => {
                for track in 1..=MAX_D64_TRACK {
                    let sectors = D64_SECTORS_PER_TRACK[track];
                    table[track] = (0..sectors).map(|_| { let o = offset; offset += 256; o }).collect();
                }
            }
            DiskKind::D81 => {
                for track in 1..=MAX_TRACK {
                    table[track] = (0..MAX_SECTOR).map(|_| { let o = offset; offset += 256; o }).collect();
                }
            }
        }
        table
    }

    pub(crate) fn sector_offset(&self, track: u8, sector: u8) -> Option<usize> {
        self.sector_offsets
            .get(track as usize)
            .and_then(|sectors| sectors.get(sector as usize))
            .copied()
    }

    /// Open `name` for reading: a save overlay entry takes precedence over
    /// the directory walk. An empty `name` matches the first PRG entry.
    pub fn open_file(&self, name: &[u8]) -> FileHandle {
        if let Some(saved) = self.saves.get(name) {
            return FileHandle {
                reader: Some(ReaderState { data: saved.clone(), pos: 0 }),
                ..Default::default()
            };
        }

        let (mut dir_track, mut dir_sector): (u8, u8) = match self.kind {
            DiskKind::D64 => (18, 1),
            DiskKind::D81 => (40, 3),
        };

        let mut visited: Vec<(u8, u8)> = Vec::new();

        while dir_track > 0 {
            if visited.contains(&(dir_track, dir_sector)) {
                break;
            }
            visited.push((dir_track, dir_sector));

            let Some(offset) = self.sector_offset(dir_track, dir_sector) else { break };

            let mut d = 2;
            while d < 256 {
                if self.data[offset + d] == 0x82 {
                    let matched = if name.is_empty() {
                        true
                    } else {
                        name.iter().enumerate().all(|(e, &b)| self.data[offset + d + 3 + e] == b)
                    };
                    if matched {
                        return FileHandle {
                            track: self.data[offset + d + 1],
                            sector: self.data[offset + d + 2],
                            offset: 2,
                            ..Default::default()
                        };
                    }
                }
                d += 32;
            }

            dir_track = self.data[offset];
            dir_sector = self.data[offset + 1];
        }

        FileHandle::default()
    }

    pub fn open_for_write(&self, name: &[u8]) -> FileHandle {
        FileHandle {
            writer: Some(WriterState { key: name.to_vec(), buffer: Vec::new() }),
            ..Default::default()
        }
    }

    /// Commit a closed write handle's buffer into the save overlay. Called
    /// by the Kernal CLOSE trap handler with the result of `FileHandle::close`.
    pub fn commit_save(&mut self, key: Vec<u8>, buffer: Vec<u8>) {
        self.saves.insert(key, buffer);
    }

    pub fn read_byte(&self, handle: &mut FileHandle) -> u8 {
        if !handle.is_open() {
            return 0;
        }

        if let Some(reader) = &mut handle.reader {
            let ret = reader.data.get(reader.pos).copied().unwrap_or(0);
            reader.pos += 1;
            if reader.pos >= reader.data.len() {
                handle.reader = None;
                handle.track = 0;
            }
            return ret;
        }

        let Some(sector_start) = self.sector_offset(handle.track, handle.sector) else {
            handle.track = 0;
            return 0;
        };
        let ret = self.data[sector_start + handle.offset as usize];

        if self.data[sector_start] == 0 {
            if handle.offset as usize >= self.data[sector_start + 1] as usize {
                handle.track = 0;
            } else {
                handle.offset += 1;
            }
        } else {
            handle.offset += 1;
            if handle.offset >= 256 {
                let next_track = self.data[sector_start];
                let next_sector = self.data[sector_start + 1];
                if handle.visited.contains(&(next_track, next_sector)) {
                    handle.track = 0;
                } else {
                    handle.visited.push((handle.track, handle.sector));
                    handle.track = next_track;
                    handle.sector = next_sector;
                    handle.offset = 2;
                }
            }
        }

        ret
    }

    pub fn write_byte(&self, handle: &mut FileHandle, value: u8) {
        if let Some(writer) = &mut handle.writer {
            writer.buffer.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_d64() -> Vec<u8> {
        vec![0u8; D64_SIZE]
    }

    fn write_dir_entry(data: &mut [u8], dir_offset: usize, slot: usize, file_track: u8, file_sector: u8, name: &[u8]) {
        let base = dir_offset + 2 + slot * 32;
        data[base] = 0x82;
        data[base + 1] = file_track;
        data[base + 2] = file_sector;
        data[base + 3..base + 3 + name.len()].copy_from_slice(name);
    }

    #[test]
    fn wrong_length_buffer_is_rejected() {
        let err = DiskImage::new("bad", vec![0u8; 1234]).unwrap_err();
        assert!(matches!(err, EmuError::DiskImageSize { got: 1234 }));
    }

    #[test]
    fn d81_sized_buffer_is_accepted() {
        let disk = DiskImage::new("big", vec![0u8; D81_SIZE]).unwrap();
        assert_eq!(disk.kind(), DiskKind::D81);
    }

    #[test]
    fn open_file_matches_directory_entry_by_name() {
        let mut data = blank_d64();
        let disk = DiskImage::new("t", blank_d64()).unwrap(); // throwaway to get the sector table
        let dir_offset = disk.sector_offset(18, 1).unwrap();
        write_dir_entry(&mut data, dir_offset, 0, 17, 0, b"HELLO");

        let file_offset = disk.sector_offset(17, 0).unwrap();
        data[file_offset] = 0; // last sector marker
        data[file_offset + 1] = 5; // last byte index
        data[file_offset + 2..file_offset + 7].copy_from_slice(b"WORLD");

        let disk = DiskImage::new("test", data).unwrap();
        let mut handle = disk.open_file(b"HELLO");
        assert!(handle.is_open());
        let mut out = Vec::new();
        for _ in 0..5 {
            out.push(disk.read_byte(&mut handle));
        }
        assert_eq!(&out, b"WORLD");
        assert!(!handle.is_open());
    }

    #[test]
    fn open_file_with_empty_name_matches_first_prg() {
        let mut data = blank_d64();
        let disk = DiskImage::new("t", blank_d64()).unwrap();
        let dir_offset = disk.sector_offset(18, 1).unwrap();
        write_dir_entry(&mut data, dir_offset, 0, 20, 0, b"ANYTHING");
        let disk = DiskImage::new("test", data).unwrap();
        let handle = disk.open_file(b"");
        assert!(handle.is_open());
    }

    #[test]
    fn unknown_file_returns_closed_handle() {
        let disk = DiskImage::new("test", blank_d64()).unwrap();
        let handle = disk.open_file(b"NOPE");
        assert!(!handle.is_open());
        assert_eq!(disk.read_byte(&mut handle.clone()), 0);
    }

    #[test]
    fn save_overlay_takes_precedence_over_directory() {
        let mut disk = DiskImage::new("test", blank_d64()).unwrap();
        disk.commit_save(b"SAVEFILE".to_vec(), vec![1, 2, 3]);
        let mut handle = disk.open_file(b"SAVEFILE");
        assert_eq!(disk.read_byte(&mut handle), 1);
        assert_eq!(disk.read_byte(&mut handle), 2);
        assert_eq!(disk.read_byte(&mut handle), 3);
        assert!(!handle.is_open());
    }

    #[test]
    fn write_then_close_then_commit_round_trips() {
        let mut disk = DiskImage::new("test", blank_d64()).unwrap();
        let mut handle = disk.open_for_write(b"OUT");
        disk.write_byte(&mut handle, 0xaa);
        disk.write_byte(&mut handle, 0xbb);
        let (key, buf) = handle.close().expect("writer handle");
        disk.commit_save(key, buf);

        let mut read_handle = disk.open_file(b"OUT");
        assert_eq!(disk.read_byte(&mut read_handle), 0xaa);
        assert_eq!(disk.read_byte(&mut read_handle), 0xbb);
    }

    #[test]
    fn a_cyclic_sector_chain_terminates_instead_of_looping_forever() {
        let mut data = blank_d64();
        let disk = DiskImage::new("t", blank_d64()).unwrap();
        let a = disk.sector_offset(17, 0).unwrap();
        let b = disk.sector_offset(17, 1).unwrap();
        // Sector A links to B, B links back to A: a two-sector cycle.
        data[a] = 17;
        data[a + 1] = 1;
        for i in 2..256 {
            data[a + i] = 0x41;
        }
        data[b] = 17;
        data[b + 1] = 0;
        for i in 2..256 {
            data[b + i] = 0x42;
        }

        let disk = DiskImage::new("test", data).unwrap();
        let mut handle = FileHandle { track: 17, sector: 0, offset: 2, ..Default::default() };

        let mut reads = 0;
        while handle.is_open() && reads < 10_000 {
            disk.read_byte(&mut handle);
            reads += 1;
        }
        assert!(reads < 10_000, "cyclic chain should terminate, not exhaust the read budget");
    }

    #[test]
    fn a_cyclic_directory_chain_terminates_instead_of_looping_forever() {
        let mut data = blank_d64();
        let disk = DiskImage::new("t", blank_d64()).unwrap();
        let dir1 = disk.sector_offset(18, 1).unwrap();
        let dir2 = disk.sector_offset(18, 2).unwrap();
        // Directory sector 1 links to sector 2, which links back to sector 1.
        data[dir1] = 18;
        data[dir1 + 1] = 2;
        data[dir2] = 18;
        data[dir2 + 1] = 1;

        let disk = DiskImage::new("test", data).unwrap();
        let handle = disk.open_file(b"NOTHERE");
        assert!(!handle.is_open());
    }
}

//! Error types for operations that cross a component boundary.
//!
//! Everything inside a constructed `Machine` is total (see the core's
//! error-handling design): no opcode, no SID tick, no VIC line ever fails.
//! The only place failure is signalled is at disk image ingestion, where a
//! malformed byte buffer must be rejected before any component is built
//! around it.

/// Errors produced while constructing a `DiskImage` from raw bytes.
#[derive(Debug)]
pub enum EmuError {
    /// The byte buffer is neither a D64 (174848 bytes) nor D81 (819200 bytes) image.
    DiskImageSize { got: usize },

    /// Underlying I/O error reading a disk image or save file from disk.
    Io(std::io::Error),
}

impl std::fmt::Display for EmuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DiskImageSize { got } => write!(
                f,
                "disk image is {got} bytes, expected 174848 (D64) or 819200 (D81)"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for EmuError {}

impl From<std::io::Error> for EmuError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

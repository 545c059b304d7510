//! Resolves a disk image name to a `.d64`/`.d81` file under `--rom-dir` and
//! reads it into a [`DiskImage`].

use std::path::Path;

use c64_core::prelude::{DiskImage, EmuError};

pub fn load_disk_image(rom_dir: &Path, name: &str) -> Result<DiskImage, EmuError> {
    for ext in ["d64", "d81"] {
        let path = rom_dir.join(format!("{name}.{ext}"));
        if path.exists() {
            let data = std::fs::read(&path)?;
            return DiskImage::new(name, data);
        }
    }
    Err(EmuError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no {name}.d64 or {name}.d81 in {}", rom_dir.display()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_d64_by_bare_name() {
        let dir = std::env::temp_dir().join("c64_frontend_rompath_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("demo.d64"), vec![0u8; 174848]).unwrap();

        let disk = load_disk_image(&dir, "demo").unwrap();
        assert_eq!(disk.name(), "demo");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = std::env::temp_dir().join("c64_frontend_rompath_test_missing");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        assert!(load_disk_image(&dir, "nothere").is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! Keyboard emulation device.
//!
//! Scancode sequences are written to a character device owned by a
//! keyboard emulation driver. The node is opened once, write-only,
//! and created with `mknod` when it does not exist yet.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::FbvncError;

/// Default keyboard emulation node.
pub const DEFAULT_KBD_DEVICE: &str = "/dev/kbde";
/// Character device numbers of the emulation driver.
pub const DEFAULT_KBD_MAJOR: u32 = 11;
pub const DEFAULT_KBD_MINOR: u32 = 0;

// ── KeySink ──────────────────────────────────────────────────────

/// Byte sink that accepts one scancode sequence per call.
pub trait KeySink: Send {
    /// Write `codes` in a single call. Fewer bytes accepted than
    /// offered is reported as [`FbvncError::ShortWrite`].
    fn write_scancodes(&mut self, codes: &[u8]) -> Result<(), FbvncError>;
}

impl KeySink for Vec<Vec<u8>> {
    fn write_scancodes(&mut self, codes: &[u8]) -> Result<(), FbvncError> {
        self.push(codes.to_vec());
        Ok(())
    }
}

// ── KeyboardDevice ───────────────────────────────────────────────

/// Persistent write handle to the keyboard emulation node.
#[derive(Debug)]
pub struct KeyboardDevice {
    path: PathBuf,
    file: File,
}

impl KeyboardDevice {
    /// Open `path` for writing, creating the node first if needed.
    pub fn open(path: impl AsRef<Path>, major: u32, minor: u32) -> Result<Self, FbvncError> {
        let path = path.as_ref().to_path_buf();
        let file = match Self::open_existing(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                create_char_node(&path, major, minor)?;
                info!(path = %path.display(), major, minor, "created keyboard device node");
                Self::open_existing(&path).map_err(|source| FbvncError::DeviceOpen {
                    path: path.clone(),
                    source,
                })?
            }
            Err(source) => {
                return Err(FbvncError::DeviceOpen { path, source });
            }
        };
        Ok(Self { path, file })
    }

    /// Wrap an already opened handle.
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_existing(path: &Path) -> std::io::Result<File> {
        OpenOptions::new().write(true).open(path)
    }
}

impl KeySink for KeyboardDevice {
    fn write_scancodes(&mut self, codes: &[u8]) -> Result<(), FbvncError> {
        let written = self.file.write(codes)?;
        if written < codes.len() {
            return Err(FbvncError::ShortWrite {
                written,
                expected: codes.len(),
            });
        }
        Ok(())
    }
}

// ── Node creation ────────────────────────────────────────────────

#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_char_node(path: &Path, major: u32, minor: u32) -> Result<(), FbvncError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let node_err = |source| FbvncError::NodeCreate {
        path: path.to_path_buf(),
        source,
    };

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| node_err(std::io::Error::new(ErrorKind::InvalidInput, e)))?;
    let mode = libc::S_IFCHR | 0o666;

    // SAFETY: c_path is a valid NUL-terminated string.
    let rc = unsafe { libc::mknod(c_path.as_ptr(), mode, libc::makedev(major, minor)) };
    if rc != 0 {
        return Err(node_err(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_char_node(path: &Path, _major: u32, _minor: u32) -> Result<(), FbvncError> {
    Err(FbvncError::NodeCreate {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            ErrorKind::Unsupported,
            "device node creation is only available on Linux",
        ),
    })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_whole_sequence() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut dev = KeyboardDevice::open(tmp.path(), DEFAULT_KBD_MAJOR, DEFAULT_KBD_MINOR)
            .unwrap();
        dev.write_scancodes(&[0x2A, 0x02]).unwrap();
        dev.write_scancodes(&[0x82, 0xAA]).unwrap();

        let mut contents = Vec::new();
        File::open(tmp.path())
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, vec![0x2A, 0x02, 0x82, 0xAA]);
    }

    #[test]
    fn missing_parent_directory_reports_node_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("kbde");
        let err = KeyboardDevice::open(&path, DEFAULT_KBD_MAJOR, DEFAULT_KBD_MINOR).unwrap_err();
        assert!(matches!(err, FbvncError::NodeCreate { .. }));
    }

    #[test]
    fn vec_sink_records_writes() {
        let mut sink: Vec<Vec<u8>> = Vec::new();
        sink.write_scancodes(&[0x10]).unwrap();
        assert_eq!(sink, vec![vec![0x10]]);
    }
}

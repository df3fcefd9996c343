//! Framebuffer sources.
//!
//! [`FrameSource`] is the read-only view the diff pass consumes.
//! [`FbDevice`] maps a Linux framebuffer character device;
//! [`MemoryFrame`] is a heap-backed frame for tests and tooling.
//!
//! # Platform
//!
//! `FbDevice` is Linux/Android-only. On other platforms the type is
//! still defined but construction fails at runtime.

use std::path::{Path, PathBuf};

use crate::error::FbvncError;
use crate::screen::types::Geometry;

// ── FrameSource ──────────────────────────────────────────────────

/// A stable, read-only view of the device's pixel buffer.
///
/// `pixels()` always returns exactly `geometry().pixel_count()`
/// native-endian 16-bit words in row-major order. The content may
/// change between calls when another writer owns the memory.
pub trait FrameSource {
    fn geometry(&self) -> &Geometry;
    fn pixels(&self) -> &[u16];
}

// ── MemoryFrame ──────────────────────────────────────────────────

/// Heap-backed frame source.
#[derive(Debug, Clone)]
pub struct MemoryFrame {
    geometry: Geometry,
    pixels: Vec<u16>,
}

impl MemoryFrame {
    /// A black frame with the given geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            pixels: vec![0; geometry.pixel_count()],
            geometry,
        }
    }

    /// Wrap existing pixels; the length must match the geometry.
    pub fn from_pixels(geometry: Geometry, pixels: Vec<u16>) -> Result<Self, FbvncError> {
        if pixels.len() != geometry.pixel_count() {
            return Err(FbvncError::BufferLength {
                expected: geometry.pixel_count(),
                actual: pixels.len(),
            });
        }
        Ok(Self { geometry, pixels })
    }

    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    /// Set one pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, value: u16) {
        let idx = y as usize * self.geometry.width as usize + x as usize;
        self.pixels[idx] = value;
    }

    pub fn fill(&mut self, value: u16) {
        self.pixels.fill(value);
    }
}

impl FrameSource for MemoryFrame {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn pixels(&self) -> &[u16] {
        &self.pixels
    }
}

// ── FbDevice ─────────────────────────────────────────────────────

/// Default framebuffer node on Android.
pub const DEFAULT_FB_DEVICE: &str = "/dev/graphics/fb0";

/// Read-only shared mapping of a Linux framebuffer device.
///
/// Opening performs the `FBIOGET_VSCREENINFO` query once; the geometry
/// is fixed for the lifetime of the mapping. Only the visible
/// `xres × yres` area from offset 0 is mapped.
pub struct FbDevice {
    path: PathBuf,
    geometry: Geometry,

    #[cfg(any(target_os = "linux", target_os = "android"))]
    map: memmap2::Mmap,
}

impl FbDevice {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ── Linux implementation ─────────────────────────────────────────

#[cfg(any(target_os = "linux", target_os = "android"))]
mod platform {
    use super::*;
    use std::fs::File;
    use std::os::fd::AsRawFd;

    use tracing::info;

    use crate::screen::types::Channel;

    const FBIOGET_VSCREENINFO: u32 = 0x4600;

    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    struct FbBitfield {
        offset: u32,
        length: u32,
        msb_right: u32,
    }

    /// `struct fb_var_screeninfo` from `<linux/fb.h>`.
    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    struct FbVarScreenInfo {
        xres: u32,
        yres: u32,
        xres_virtual: u32,
        yres_virtual: u32,
        xoffset: u32,
        yoffset: u32,
        bits_per_pixel: u32,
        grayscale: u32,
        red: FbBitfield,
        green: FbBitfield,
        blue: FbBitfield,
        transp: FbBitfield,
        nonstd: u32,
        activate: u32,
        height: u32,
        width: u32,
        accel_flags: u32,
        pixclock: u32,
        left_margin: u32,
        right_margin: u32,
        upper_margin: u32,
        lower_margin: u32,
        hsync_len: u32,
        vsync_len: u32,
        sync: u32,
        vmode: u32,
        rotate: u32,
        colorspace: u32,
        reserved: [u32; 4],
    }

    impl FbDevice {
        /// Open and map the framebuffer at `path`.
        ///
        /// Every failure here is fatal to the server: it cannot run
        /// without a geometry and a mapped buffer.
        pub fn open(path: impl AsRef<Path>) -> Result<Self, FbvncError> {
            let path = path.as_ref().to_path_buf();
            let file = File::open(&path).map_err(|source| FbvncError::DeviceOpen {
                path: path.clone(),
                source,
            })?;

            let info = query_screeninfo(&file)?;
            info!(
                xres = info.xres,
                yres = info.yres,
                xres_virtual = info.xres_virtual,
                yres_virtual = info.yres_virtual,
                xoffset = info.xoffset,
                yoffset = info.yoffset,
                bpp = info.bits_per_pixel,
                "framebuffer geometry"
            );

            let geometry = Geometry {
                width: info.xres,
                height: info.yres,
                bits_per_pixel: info.bits_per_pixel,
                red: Channel::new(info.red.offset, info.red.length),
                green: Channel::new(info.green.offset, info.green.length),
                blue: Channel::new(info.blue.offset, info.blue.length),
            };
            if geometry.bits_per_pixel != 16 {
                return Err(FbvncError::UnsupportedDepth(geometry.bits_per_pixel));
            }

            // SAFETY: the mapping is read-only and shared; concurrent
            // writes by the display driver only produce torn frames.
            let map = unsafe {
                memmap2::MmapOptions::new()
                    .len(geometry.byte_len())
                    .map(&file)
                    .map_err(FbvncError::Mmap)?
            };

            Ok(Self {
                path,
                geometry,
                map,
            })
        }
    }

    fn query_screeninfo(file: &File) -> Result<FbVarScreenInfo, FbvncError> {
        let mut info = FbVarScreenInfo::default();
        // SAFETY: FBIOGET_VSCREENINFO fills exactly one fb_var_screeninfo.
        let rc = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                FBIOGET_VSCREENINFO as _,
                &mut info as *mut FbVarScreenInfo,
            )
        };
        if rc != 0 {
            return Err(FbvncError::GeometryQuery(std::io::Error::last_os_error()));
        }
        Ok(info)
    }

    impl FrameSource for FbDevice {
        fn geometry(&self) -> &Geometry {
            &self.geometry
        }

        fn pixels(&self) -> &[u16] {
            // SAFETY: the mapping is page aligned and exactly
            // `pixel_count() * 2` bytes long.
            unsafe {
                std::slice::from_raw_parts(
                    self.map.as_ptr() as *const u16,
                    self.geometry.pixel_count(),
                )
            }
        }
    }
}

// ── Non-Linux stub ───────────────────────────────────────────────

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl FbDevice {
    /// Framebuffer devices are only available on Linux.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FbvncError> {
        Err(FbvncError::DeviceOpen {
            path: path.as_ref().to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "framebuffer devices are only available on Linux",
            ),
        })
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl FrameSource for FbDevice {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn pixels(&self) -> &[u16] {
        &[]
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_frame_starts_black() {
        let frame = MemoryFrame::new(Geometry::rgb565(4, 2));
        assert_eq!(frame.pixels(), &[0u16; 8]);
    }

    #[test]
    fn memory_frame_set_is_row_major() {
        let mut frame = MemoryFrame::new(Geometry::rgb565(4, 2));
        frame.set(1, 1, 0xABCD);
        assert_eq!(frame.pixels()[5], 0xABCD);
    }

    #[test]
    fn from_pixels_checks_length() {
        let err = MemoryFrame::from_pixels(Geometry::rgb565(4, 2), vec![0; 7]).unwrap_err();
        assert!(matches!(err, FbvncError::BufferLength { expected: 8, actual: 7 }));
    }

    #[test]
    fn missing_device_is_fatal_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fb-missing");
        let err = FbDevice::open(&path).err().unwrap();
        assert!(matches!(err, FbvncError::DeviceOpen { .. }));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn regular_file_fails_geometry_query() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = FbDevice::open(file.path()).err().unwrap();
        assert!(matches!(err, FbvncError::GeometryQuery(_)));
    }
}

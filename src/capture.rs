use std::path::Path;

use image::{imageops, RgbaImage};
use xcap::Monitor;

use crate::error::CaptureError;

/// Represents a screen region to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_array(arr: [u32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    pub fn to_array(self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Screen coordinates of the region center
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }

    /// Crop this region out of a full-screen image
    pub fn crop_from(&self, screen: &RgbaImage) -> Result<RgbaImage, CaptureError> {
        if self.is_empty() {
            return Err(CaptureError::EmptyRegion(self.to_array()));
        }

        let (width, height) = screen.dimensions();
        let fits = self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height);
        if !fits {
            return Err(CaptureError::OutOfBounds {
                region: self.to_array(),
                width,
                height,
            });
        }

        Ok(imageops::crop_imm(screen, self.x, self.y, self.width, self.height).to_image())
    }
}

/// Anything that can hand back the pixels of a screen region
pub trait ScreenSource {
    fn capture(&mut self, region: CaptureRegion) -> Result<RgbaImage, CaptureError>;
}

/// Live screen capture of the primary monitor via `xcap`
///
/// Regions are in the primary monitor's pixel coordinates.
///
/// ## macOS
/// Requires Screen Recording permission
/// (System Settings > Privacy & Security > Screen Recording).
#[derive(Debug, Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor() -> Result<Monitor, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorsUnavailable(Box::new(e)))?;

        // xcap lists the primary monitor first
        monitors.into_iter().next().ok_or(CaptureError::NoMonitors)
    }

    /// Capture the whole primary monitor
    pub fn capture_full(&mut self) -> Result<RgbaImage, CaptureError> {
        let monitor = Self::primary_monitor()?;
        monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(Box::new(e)))
    }
}

impl ScreenSource for XcapScreen {
    fn capture(&mut self, region: CaptureRegion) -> Result<RgbaImage, CaptureError> {
        let screen = self.capture_full()?;
        region.crop_from(&screen)
    }
}

/// A saved screenshot standing in for the live screen (diagnostics)
pub struct StillImage {
    image: RgbaImage,
}

impl StillImage {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let image = image::open(path)
            .map_err(|source| CaptureError::ImageLoadFailed {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();
        Ok(Self::new(image))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl ScreenSource for StillImage {
    fn capture(&mut self, region: CaptureRegion) -> Result<RgbaImage, CaptureError> {
        region.crop_from(&self.image)
    }
}

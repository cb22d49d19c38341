// SPDX-License-Identifier: GPL-3.0-only

//! Headless camera preview surface
//!
//! Keeps the latest frame of the attached stream and can rasterize it. A UI
//! toolkit would paint the same frame; the controller only needs the
//! dimensions and the raster.

use crate::backends::camera::{PreviewReceiver, RenderSurface, Resolution};
use image::RgbaImage;
use tracing::{debug, warn};

/// Render surface backed by a stream's preview feed
#[derive(Default)]
pub struct PreviewSurface {
    feed: Option<PreviewReceiver>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for PreviewSurface {
    fn attach(&mut self, preview: PreviewReceiver) {
        debug!("Preview attached");
        self.feed = Some(preview);
    }

    fn detach(&mut self) {
        if self.feed.take().is_some() {
            debug!("Preview detached");
        }
    }

    fn is_attached(&self) -> bool {
        self.feed.is_some()
    }

    fn frame_dimensions(&self) -> Option<Resolution> {
        let feed = self.feed.as_ref()?;
        let frame = feed.borrow();
        frame.as_ref().map(|f| f.resolution())
    }

    fn rasterize(&self, size: Resolution) -> Option<RgbaImage> {
        let feed = self.feed.as_ref()?;
        let frame = feed.borrow().clone()?;
        if frame.resolution() != size {
            warn!(
                requested = %size,
                actual = %frame.resolution(),
                "Frame size changed before rasterizing"
            );
            return None;
        }
        let expected = size.pixel_count() * 4;
        if frame.data.len() < expected {
            warn!(expected, actual = frame.data.len(), "Frame buffer too small");
            return None;
        }
        RgbaImage::from_raw(size.width, size.height, frame.data[..expected].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::simulated::synthetic_frame;

    #[test]
    fn test_detached_surface_has_no_frame() {
        let surface = PreviewSurface::new();
        assert!(!surface.is_attached());
        assert_eq!(surface.frame_dimensions(), None);
        assert!(surface.rasterize(Resolution::new(2, 2)).is_none());
    }

    #[test]
    fn test_rasterize_current_frame() {
        let (tx, rx) = tokio::sync::watch::channel(None);
        let mut surface = PreviewSurface::new();
        surface.attach(rx);
        assert_eq!(surface.frame_dimensions(), None);

        tx.send_replace(Some(synthetic_frame(Resolution::new(4, 3))));
        assert_eq!(surface.frame_dimensions(), Some(Resolution::new(4, 3)));

        let raster = surface.rasterize(Resolution::new(4, 3)).unwrap();
        assert_eq!(raster.dimensions(), (4, 3));
        assert!(surface.rasterize(Resolution::new(8, 8)).is_none());

        surface.detach();
        surface.detach();
        assert!(!surface.is_attached());
    }
}

//! In-memory RGB raster surface.
//!
//! White background, black pen.  Segments are drawn with Bresenham line
//! stepping, stamping a `pen_width × pen_width` block at every step so the
//! stroke has visible body at preview sizes.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use sigpad_core::Segment;

use super::{ExportFormat, RenderError, RenderSink};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// The persistent capture canvas.
pub struct RasterSurface {
    width: u32,
    height: u32,
    pen_width: u32,
    pixels: RgbImage,
}

impl RasterSurface {
    /// Creates a blank surface.  `pen_width` of 0 is coerced to 1.
    pub fn new(width: u32, height: u32, pen_width: u32) -> Self {
        Self {
            width,
            height,
            pen_width: pen_width.max(1),
            pixels: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether any ink has been drawn since the last clear.
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| *p == BACKGROUND)
    }

    /// Stamps a pen-sized block centred on (x, y), clamped to the canvas.
    fn stamp(&mut self, x: i64, y: i64) {
        let half = i64::from(self.pen_width) / 2;
        let reach = i64::from(self.pen_width) - half;
        for py in (y - half)..(y + reach) {
            for px in (x - half)..(x + reach) {
                if px >= 0 && py >= 0 && px < i64::from(self.width) && py < i64::from(self.height)
                {
                    self.pixels.put_pixel(px as u32, py as u32, INK);
                }
            }
        }
    }
}

impl RenderSink for RasterSurface {
    fn draw_segment(&mut self, segment: &Segment) {
        // Bresenham stepping between the two canvas points.
        let mut x = i64::from(segment.from.x);
        let mut y = i64::from(segment.from.y);
        let x1 = i64::from(segment.to.x);
        let y1 = i64::from(segment.to.y);

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn clear(&mut self) {
        self.pixels = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
    }

    fn export(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        match format {
            ExportFormat::Png => {
                PngEncoder::new(&mut buffer).write_image(
                    self.pixels.as_raw(),
                    self.width,
                    self.height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            ExportFormat::Jpeg { quality } => {
                JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
                    self.pixels.as_raw(),
                    self.width,
                    self.height,
                    ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigpad_core::Point;

    fn segment(x0: u32, y0: u32, x1: u32, y1: u32) -> Segment {
        Segment {
            from: Point { x: x0, y: y0 },
            to: Point { x: x1, y: y1 },
        }
    }

    #[test]
    fn test_new_surface_is_blank() {
        let surface = RasterSurface::new(100, 100, 2);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_draw_segment_inks_endpoints() {
        let mut surface = RasterSurface::new(100, 100, 1);
        surface.draw_segment(&segment(10, 10, 20, 20));

        assert_eq!(*surface.pixels.get_pixel(10, 10), INK);
        assert_eq!(*surface.pixels.get_pixel(20, 20), INK);
        assert!(!surface.is_blank());
    }

    #[test]
    fn test_clear_restores_background() {
        let mut surface = RasterSurface::new(100, 100, 2);
        surface.draw_segment(&segment(0, 0, 99, 99));
        assert!(!surface.is_blank());

        surface.clear();
        assert!(surface.is_blank());
    }

    #[test]
    fn test_segment_touching_canvas_edge_does_not_panic() {
        // Points mapped from sample == max_x land exactly on the edge;
        // the pen block around them must clamp, not panic.
        let mut surface = RasterSurface::new(100, 100, 4);
        surface.draw_segment(&segment(0, 0, 100, 100));
        surface.draw_segment(&segment(99, 0, 99, 99));
        assert!(!surface.is_blank());
    }

    #[test]
    fn test_png_export_carries_magic_bytes() {
        let surface = RasterSurface::new(32, 32, 2);
        let bytes = surface.export(ExportFormat::Png).expect("encode");
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_jpeg_export_carries_magic_bytes() {
        let surface = RasterSurface::new(32, 32, 2);
        let bytes = surface
            .export(ExportFormat::Jpeg { quality: 92 })
            .expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_export_is_pure_with_respect_to_surface_state() {
        let mut surface = RasterSurface::new(64, 64, 2);
        surface.draw_segment(&segment(5, 5, 40, 40));

        let first = surface.export(ExportFormat::Png).expect("encode");
        let second = surface.export(ExportFormat::Png).expect("encode");
        assert_eq!(first, second);
    }
}

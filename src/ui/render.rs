use crate::loader::DecodedImage;
use crate::viewport::PanOffset;
use crate::zoom::{self, Size};

pub const BG_COLOR: (u8, u8, u8) = (31, 31, 31);
const CHECKER_LIGHT: (u8, u8, u8) = (58, 58, 58);
const CHECKER_DARK: (u8, u8, u8) = (40, 40, 40);
const CHECKER_CELL: u32 = 12;
const PLACEHOLDER_COLOR: (u8, u8, u8, u8) = (0, 0, 0, 160);
const OVERLAY_DIM: (u8, u8, u8, u8) = (0, 0, 0, 150);
const OVERLAY_PANEL: (u8, u8, u8, u8) = (70, 70, 90, 200);
const ERROR_BAR: (u8, u8, u8, u8) = (200, 50, 50, 220);
const INFO_BAR: (u8, u8, u8, u8) = (60, 140, 80, 220);
const NOTICE_BAR_HEIGHT: u32 = 4;

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

fn blend(dst: u32, r: u8, g: u8, b: u8, a: u32) -> u32 {
    if a >= 255 {
        return rgb(r, g, b);
    }
    let inv = 255 - a;
    let (dr, dg, db) = unpack_rgb(dst);
    rgb(
        ((r as u32 * a + dr as u32 * inv) / 255) as u8,
        ((g as u32 * a + dg as u32 * inv) / 255) as u8,
        ((b as u32 * a + db as u32 * inv) / 255) as u8,
    )
}

/// A borrowed framebuffer, `width * height` pixels, row-major.
pub struct Frame<'a> {
    pub pixels: &'a mut [u32],
    pub width: u32,
    pub height: u32,
}

impl<'a> Frame<'a> {
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32) -> Self {
        debug_assert!(pixels.len() >= (width * height) as usize);
        Self { pixels, width, height }
    }

    pub fn fill(&mut self, color: (u8, u8, u8)) {
        self.pixels.fill(rgb(color.0, color.1, color.2));
    }

    pub fn checkerboard(&mut self, cell: u32, light: (u8, u8, u8), dark: (u8, u8, u8)) {
        let light = rgb(light.0, light.1, light.2);
        let dark = rgb(dark.0, dark.1, dark.2);
        let cell = cell.max(1);
        for y in 0..self.height {
            let row = (y * self.width) as usize;
            for x in 0..self.width {
                let odd = ((x / cell) + (y / cell)) % 2 == 1;
                self.pixels[row + x as usize] = if odd { dark } else { light };
            }
        }
    }

    /// Fill a rectangle, alpha blended. Parts outside the frame are clipped.
    pub fn fill_rect(&mut self, rx: i32, ry: i32, rw: u32, rh: u32, color: (u8, u8, u8, u8)) {
        let x_start = rx.max(0) as u32;
        let y_start = ry.max(0) as u32;
        let x_end = (rx as i64 + rw as i64).clamp(0, self.width as i64) as u32;
        let y_end = (ry as i64 + rh as i64).clamp(0, self.height as i64) as u32;
        let a = color.3 as u32;
        for y in y_start..y_end {
            for x in x_start..x_end {
                let off = (y * self.width + x) as usize;
                self.pixels[off] = blend(self.pixels[off], color.0, color.1, color.2, a);
            }
        }
    }

    /// Nearest-neighbour blit of an RGBA image with its top-left at
    /// `(x0, y0)`, blending source alpha over the frame.
    pub fn blit_scaled(&mut self, img: &DecodedImage, x0: f64, y0: f64, scale: f64) {
        if scale <= 0.0 || img.width == 0 || img.height == 0 {
            return;
        }
        let draw_w = img.width as f64 * scale;
        let draw_h = img.height as f64 * scale;
        let dx_start = x0.max(0.0) as u32;
        let dy_start = y0.max(0.0) as u32;
        let dx_end = (x0 + draw_w).ceil().clamp(0.0, self.width as f64) as u32;
        let dy_end = (y0 + draw_h).ceil().clamp(0.0, self.height as f64) as u32;
        let inv_scale = 1.0 / scale;
        let src = &img.rgba_bytes;

        for dy in dy_start..dy_end {
            let sy = ((dy as f64 + 0.5 - y0) * inv_scale) as i64;
            if sy < 0 || sy >= img.height as i64 {
                continue;
            }
            for dx in dx_start..dx_end {
                let sx = ((dx as f64 + 0.5 - x0) * inv_scale) as i64;
                if sx < 0 || sx >= img.width as i64 {
                    continue;
                }
                let si = (sy as usize * img.width as usize + sx as usize) * 4;
                let di = (dy * self.width + dx) as usize;
                let sa = src[si + 3] as u32;
                if sa > 0 {
                    self.pixels[di] = blend(self.pixels[di], src[si], src[si + 1], src[si + 2], sa);
                }
            }
        }
    }
}

/// Top-left corner of an image of `image` pixels drawn at `scale`, centered
/// in the frame and shifted by `pan`.
pub fn image_origin(frame: Size, image: Size, scale: f64, pan: PanOffset) -> (f64, f64) {
    let x = (frame.width as f64 - image.width as f64 * scale) / 2.0 + pan.x;
    let y = (frame.height as f64 - image.height as f64 * scale) / 2.0 + pan.y;
    (x.round(), y.round())
}

/// Everything one frame shows.
pub struct Scene<'a> {
    pub image: Option<&'a DecodedImage>,
    /// Render scale from the controller; `None` falls back to contain.
    pub scale: Option<f64>,
    pub pan: PanOffset,
    pub translucent: bool,
    /// Video or an item whose decode is not available.
    pub placeholder: bool,
    pub settings_open: bool,
    /// `Some(is_error)` while a notice is showing.
    pub notice: Option<bool>,
}

pub fn draw(frame: &mut Frame, scene: &Scene) {
    if scene.translucent {
        frame.checkerboard(CHECKER_CELL, CHECKER_LIGHT, CHECKER_DARK);
    } else {
        frame.fill(BG_COLOR);
    }

    let size = Size::new(frame.width, frame.height);
    match scene.image {
        Some(img) => {
            let image = Size::new(img.width, img.height);
            let scale = scene
                .scale
                .unwrap_or_else(|| zoom::contain_scale(image, size));
            let (x0, y0) = image_origin(size, image, scale, scene.pan);
            frame.blit_scaled(img, x0, y0, scale);
        }
        None if scene.placeholder => {
            let inset_w = frame.width / 8;
            let inset_h = frame.height / 8;
            frame.fill_rect(
                inset_w as i32,
                inset_h as i32,
                frame.width.saturating_sub(inset_w * 2),
                frame.height.saturating_sub(inset_h * 2),
                PLACEHOLDER_COLOR,
            );
        }
        None => {}
    }

    if let Some(is_error) = scene.notice {
        let color = if is_error { ERROR_BAR } else { INFO_BAR };
        frame.fill_rect(0, 0, frame.width, NOTICE_BAR_HEIGHT, color);
    }

    if scene.settings_open {
        frame.fill_rect(0, 0, frame.width, frame.height, OVERLAY_DIM);
        let panel_w = frame.width / 2;
        let panel_h = frame.height / 3;
        frame.fill_rect(
            ((frame.width - panel_w) / 2) as i32,
            ((frame.height - panel_h) / 2) as i32,
            panel_w,
            panel_h,
            OVERLAY_PANEL,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> DecodedImage {
        DecodedImage {
            rgba_bytes: px.repeat((width * height) as usize),
            width,
            height,
        }
    }

    #[test]
    fn packs_and_blends_colors() {
        assert_eq!(rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(blend(rgb(0, 0, 0), 255, 255, 255, 255), rgb(255, 255, 255));
        assert_eq!(blend(rgb(0, 0, 0), 255, 0, 0, 0), rgb(0, 0, 0));
        assert_eq!(blend(rgb(0, 0, 0), 254, 0, 0, 128), rgb(127, 0, 0));
    }

    #[test]
    fn fill_rect_clips_to_the_frame() {
        let mut buf = vec![0u32; 16];
        let mut frame = Frame::new(&mut buf, 4, 4);
        frame.fill_rect(-2, 2, 4, 10, (255, 255, 255, 255));
        let white = rgb(255, 255, 255);
        assert_eq!(buf[8], white);
        assert_eq!(buf[9], white);
        assert_eq!(buf[10], 0);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn origin_centers_and_applies_pan() {
        let frame = Size::new(100, 80);
        let image = Size::new(50, 40);
        assert_eq!(image_origin(frame, image, 1.0, PanOffset::default()), (25.0, 20.0));
        let pan = PanOffset { x: -5.0, y: 10.0 };
        assert_eq!(image_origin(frame, image, 2.0, pan), (-5.0, 10.0));
    }

    #[test]
    fn blit_scales_with_nearest_neighbour() {
        let img = DecodedImage {
            rgba_bytes: vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
            width: 2,
            height: 2,
        };
        let mut buf = vec![0u32; 16];
        let mut frame = Frame::new(&mut buf, 4, 4);
        frame.blit_scaled(&img, 0.0, 0.0, 2.0);

        assert_eq!(buf[0], rgb(255, 0, 0));
        assert_eq!(buf[5], rgb(255, 0, 0));
        assert_eq!(buf[3], rgb(0, 255, 0));
        assert_eq!(buf[12], rgb(0, 0, 255));
        assert_eq!(buf[15], rgb(255, 255, 255));
    }

    #[test]
    fn blit_skips_transparent_pixels_and_offscreen_parts() {
        let img = solid(4, 4, [10, 20, 30, 0]);
        let mut buf = vec![rgb(1, 2, 3); 16];
        let mut frame = Frame::new(&mut buf, 4, 4);
        frame.blit_scaled(&img, 0.0, 0.0, 1.0);
        assert!(buf.iter().all(|&p| p == rgb(1, 2, 3)));

        let img = solid(4, 4, [9, 9, 9, 255]);
        let mut frame = Frame::new(&mut buf, 4, 4);
        frame.blit_scaled(&img, 2.0, -2.0, 1.0);
        assert_eq!(buf[2], rgb(9, 9, 9));
        assert_eq!(buf[1], rgb(1, 2, 3));
        assert_eq!(buf[8 + 3], rgb(1, 2, 3));
    }

    #[test]
    fn draw_uses_the_background_setting() {
        let mut buf = vec![0u32; 64];
        let scene = Scene {
            image: None,
            scale: None,
            pan: PanOffset::default(),
            translucent: false,
            placeholder: false,
            settings_open: false,
            notice: None,
        };
        draw(&mut Frame::new(&mut buf, 8, 8), &scene);
        assert!(buf.iter().all(|&p| p == rgb(BG_COLOR.0, BG_COLOR.1, BG_COLOR.2)));

        let scene = Scene {
            translucent: true,
            ..scene
        };
        draw(&mut Frame::new(&mut buf, 8, 8), &scene);
        assert!(buf.iter().all(|&p| p != rgb(BG_COLOR.0, BG_COLOR.1, BG_COLOR.2)));
    }

    #[test]
    fn settings_overlay_dims_the_frame() {
        let img = solid(8, 8, [255, 255, 255, 255]);
        let mut buf = vec![0u32; 64];
        let scene = Scene {
            image: Some(&img),
            scale: Some(1.0),
            pan: PanOffset::default(),
            translucent: false,
            placeholder: false,
            settings_open: true,
            notice: None,
        };
        draw(&mut Frame::new(&mut buf, 8, 8), &scene);
        assert!(buf.iter().all(|&p| p != rgb(255, 255, 255)));
    }
}

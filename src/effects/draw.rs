//! Software raster primitives for effect rendering
//!
//! Shapes are rasterised onto a `Canvas`. `Blend` mixes each shape straight
//! into the frame with a fixed opacity; `Overlay` collects several shapes and
//! is composited once, so overlapping shapes share a single opacity.

use image::RgbaImage;

/// RGB colour
pub type Color = [u8; 3];

pub const WHITE: Color = [255, 255, 255];

/// Pixel sink that shapes are drawn onto
pub trait Canvas {
    /// Canvas size in pixels
    fn size(&self) -> (u32, u32);

    /// Write one in-bounds pixel
    fn put(&mut self, x: u32, y: u32, color: Color);
}

/// Blend a colour into an RGBA pixel, leaving alpha untouched
pub fn blend_pixel(image: &mut RgbaImage, x: u32, y: u32, color: Color, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x, y);
    for c in 0..3 {
        let mixed = color[c] as f32 * alpha + pixel[c] as f32 * (1.0 - alpha);
        pixel[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

/// Draws directly into a frame with a fixed opacity
pub struct Blend<'a> {
    image: &'a mut RgbaImage,
    alpha: f32,
}

impl<'a> Blend<'a> {
    pub fn new(image: &'a mut RgbaImage, alpha: f32) -> Self {
        Self { image, alpha }
    }
}

impl Canvas for Blend<'_> {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        blend_pixel(self.image, x, y, color, self.alpha);
    }
}

/// Opaque shape layer composited onto a frame in one pass
pub struct Overlay {
    width: u32,
    height: u32,
    pixels: Vec<Option<Color>>,
}

impl Overlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; (width * height) as usize],
        }
    }

    /// Number of pixels covered by any shape
    pub fn covered(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_some()).count()
    }

    /// Blend every covered pixel into the frame
    pub fn composite(&self, image: &mut RgbaImage, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let (width, height) = image.dimensions();
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                if let Some(color) = self.pixels[(y * self.width + x) as usize] {
                    blend_pixel(image, x, y, color, alpha);
                }
            }
        }
    }
}

impl Canvas for Overlay {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = Some(color);
    }
}

/// Inclusive pixel range covering `[min, max]`, clamped to `[0, limit)`
fn span(min: f32, max: f32, limit: u32) -> Option<(u32, u32)> {
    if limit == 0 || max < 0.0 || min > (limit - 1) as f32 {
        return None;
    }
    let start = min.ceil().max(0.0) as u32;
    let end = (max.floor() as i64).min(limit as i64 - 1);
    if end < start as i64 {
        return None;
    }
    Some((start, end as u32))
}

/// Filled disc
pub fn fill_circle(canvas: &mut impl Canvas, cx: f32, cy: f32, radius: f32, color: Color) {
    if radius <= 0.0 {
        return;
    }
    let (width, height) = canvas.size();
    let Some((y0, y1)) = span(cy - radius, cy + radius, height) else {
        return;
    };
    let r2 = radius * radius;

    for y in y0..=y1 {
        let dy = y as f32 - cy;
        let half = (r2 - dy * dy).max(0.0).sqrt();
        if let Some((x0, x1)) = span(cx - half, cx + half, width) {
            for x in x0..=x1 {
                canvas.put(x, y, color);
            }
        }
    }
}

/// Filled polygon (even-odd rule); every covered pixel is written once
pub fn fill_polygon(canvas: &mut impl Canvas, points: &[(f32, f32)], color: Color) {
    if points.len() < 3 {
        return;
    }
    let (width, height) = canvas.size();
    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let Some((y0, y1)) = span(min_y, max_y, height) else {
        return;
    };

    let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
    for y in y0..=y1 {
        let yf = y as f32;
        crossings.clear();

        for i in 0..points.len() {
            let (xa, ya) = points[i];
            let (xb, yb) = points[(i + 1) % points.len()];
            if (ya <= yf && yb > yf) || (yb <= yf && ya > yf) {
                crossings.push(xa + (yf - ya) * (xb - xa) / (yb - ya));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for pair in crossings.chunks_exact(2) {
            if let Some((x0, x1)) = span(pair[0], pair[1], width) {
                for x in x0..=x1 {
                    canvas.put(x, y, color);
                }
            }
        }
    }
}

/// Line segment of the given thickness, drawn as a filled quad
pub fn thick_line(
    canvas: &mut impl Canvas,
    from: (f32, f32),
    to: (f32, f32),
    thickness: f32,
    color: Color,
) {
    let half = thickness.max(1.0) / 2.0;
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let length = (dx * dx + dy * dy).sqrt();

    if length < f32::EPSILON {
        fill_circle(canvas, from.0, from.1, half, color);
        return;
    }

    // Perpendicular offset
    let nx = -dy / length * half;
    let ny = dx / length * half;
    let quad = [
        (from.0 + nx, from.1 + ny),
        (to.0 + nx, to.1 + ny),
        (to.0 - nx, to.1 - ny),
        (from.0 - nx, from.1 - ny),
    ];
    fill_polygon(canvas, &quad, color);
}

/// Five-pointed star outline (alternating outer/inner radius), starting at `rotation_deg`
pub fn star_points(cx: f32, cy: f32, outer: f32, inner: f32, rotation_deg: f32) -> Vec<(f32, f32)> {
    (0..10)
        .map(|i| {
            let angle = (rotation_deg + i as f32 * 36.0).to_radians();
            let r = if i % 2 == 0 { outer } else { inner };
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect()
}

/// Corners of a `w` x `h` rectangle centred on (cx, cy), rotated by `rotation_deg`
pub fn rotated_rect(cx: f32, cy: f32, w: f32, h: f32, rotation_deg: f32) -> [(f32, f32); 4] {
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    let corners = [(-w / 2.0, -h / 2.0), (w / 2.0, -h / 2.0), (w / 2.0, h / 2.0), (-w / 2.0, h / 2.0)];
    corners.map(|(x, y)| (cx + x * cos - y * sin, cy + x * sin + y * cos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn black(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn test_blend_pixel_weights() {
        let mut image = black(1, 1);
        blend_pixel(&mut image, 0, 0, [200, 100, 0], 0.5);
        assert_eq!(image.get_pixel(0, 0).0, [100, 50, 0, 255]);

        blend_pixel(&mut image, 0, 0, [255, 255, 255], 0.0);
        assert_eq!(image.get_pixel(0, 0).0, [100, 50, 0, 255]);

        blend_pixel(&mut image, 0, 0, [255, 255, 255], 1.0);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_fill_circle_area() {
        let mut overlay = Overlay::new(100, 100);
        fill_circle(&mut overlay, 50.0, 50.0, 20.0, WHITE);
        let area = overlay.covered() as f32;
        let expected = std::f32::consts::PI * 400.0;
        assert!((area - expected).abs() / expected < 0.05, "area {}", area);
    }

    #[test]
    fn test_circle_clipped_at_edges() {
        let mut overlay = Overlay::new(10, 10);
        fill_circle(&mut overlay, -50.0, -50.0, 5.0, WHITE);
        assert_eq!(overlay.covered(), 0);
        fill_circle(&mut overlay, 0.0, 0.0, 3.0, WHITE);
        assert!(overlay.covered() > 0);
    }

    #[test]
    fn test_fill_polygon_square() {
        let mut overlay = Overlay::new(20, 20);
        fill_polygon(&mut overlay, &[(2.0, 2.0), (12.0, 2.0), (12.0, 12.0), (2.0, 12.0)], WHITE);
        // Rows 2..=11 (half-open in y), columns 2..=12
        assert_eq!(overlay.covered(), 10 * 11);
    }

    #[test]
    fn test_thick_line_covers_path() {
        let mut overlay = Overlay::new(50, 50);
        thick_line(&mut overlay, (5.0, 25.0), (45.0, 25.0), 3.0, WHITE);
        let covered = overlay.covered();
        assert!(covered >= 40 * 2 && covered <= 41 * 4, "covered {}", covered);
    }

    #[test]
    fn test_overlay_composite_single_opacity() {
        let mut overlay = Overlay::new(4, 4);
        // Two overlapping shapes still blend once
        fill_circle(&mut overlay, 1.0, 1.0, 1.5, [255, 0, 0]);
        fill_circle(&mut overlay, 1.0, 1.0, 1.5, [255, 0, 0]);

        let mut image = black(4, 4);
        overlay.composite(&mut image, 0.6);
        assert_eq!(image.get_pixel(1, 1).0, [153, 0, 0, 255]);
        assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_star_and_rect_geometry() {
        let star = star_points(0.0, 0.0, 10.0, 5.0, 0.0);
        assert_eq!(star.len(), 10);
        assert!((star[0].0 - 10.0).abs() < 1e-4);

        let rect = rotated_rect(0.0, 0.0, 4.0, 2.0, 90.0);
        assert!((rect[0].0 - 1.0).abs() < 1e-4);
        assert!((rect[0].1 + 2.0).abs() < 1e-4);
    }
}

//! A persistent RGB drawing surface.
//!
//! The canvas is never cleared between frames. Trails come from painting a
//! translucent background rectangle over the previous frame, and glow comes
//! from drawing in [`Blend::Screen`] mode, where overlapping light only ever
//! brightens.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn to_u8(self) -> (u8, u8, u8) {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }
}

/// Convert HSL (hue in degrees, saturation and lightness in percent) to RGB.
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    Rgb::new(r + m, g + m, b + m)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    /// Paint over: `dst * (1 - a) + src * a`.
    #[default]
    SourceOver,
    /// Additive-style lighten: `dst + a * src * (1 - dst)`.
    Screen,
}

pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    blend: Blend,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
            blend: Blend::SourceOver,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    /// Resize and clear to black.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, Rgb::BLACK);
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    pub fn set_blend(&mut self, blend: Blend) {
        self.blend = blend;
    }

    pub fn blend(&self) -> Blend {
        self.blend
    }

    /// Cover the whole surface with `color` at `alpha`.
    pub fn fill_rect(&mut self, color: Rgb, alpha: f32) {
        let blend = self.blend;
        for dst in &mut self.pixels {
            *dst = compose(blend, *dst, color, alpha);
        }
    }

    pub fn plot(&mut self, x: f32, y: f32, color: Rgb, alpha: f32) {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        self.pixels[idx] = compose(self.blend, self.pixels[idx], color, alpha);
    }

    /// DDA line from `(x0, y0)` to `(x1, y1)`, touching each cell once. The
    /// segment is clipped to the canvas first, so only visible cells are
    /// walked.
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb, alpha: f32) {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(x0, y0, x1, y1) else {
            return;
        };
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;

        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = x0 + dx * t;
            let y = y0 + dy * t;
            let cell = (x.floor() as i64, y.floor() as i64);
            if last == Some(cell) {
                continue;
            }
            last = Some(cell);
            self.plot(x, y, color, alpha);
        }
    }

    /// Liang-Barsky clip of a segment against `[0, width] x [0, height]`.
    fn clip(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(f32, f32, f32, f32)> {
        let (x0, y0, x1, y1) = (x0 as f64, y0 as f64, x1 as f64, y1 as f64);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let (w, h) = (self.width as f64, self.height as f64);

        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        for (p, q) in [(-dx, x0), (dx, w - x0), (-dy, y0), (dy, h - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }

        Some((
            (x0 + dx * t0) as f32,
            (y0 + dy * t0) as f32,
            (x0 + dx * t1) as f32,
            (y0 + dy * t1) as f32,
        ))
    }

    /// Filled disc. Radii under half a cell still light the centre cell.
    pub fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb, alpha: f32) {
        if !cx.is_finite() || !cy.is_finite() || !radius.is_finite() {
            return;
        }
        if radius < 0.5 {
            self.plot(cx, cy, color, alpha);
            return;
        }
        let r2 = radius * radius;
        let (min_x, max_x) = (
            (cx - radius).floor().max(0.0),
            (cx + radius).ceil().min(self.width as f32),
        );
        let (min_y, max_y) = (
            (cy - radius).floor().max(0.0),
            (cy + radius).ceil().min(self.height as f32),
        );
        let mut y = min_y;
        while y <= max_y {
            let mut x = min_x;
            while x <= max_x {
                let (ddx, ddy) = (x + 0.5 - cx, y + 0.5 - cy);
                if ddx * ddx + ddy * ddy <= r2 {
                    self.plot(x, y, color, alpha);
                }
                x += 1.0;
            }
            y += 1.0;
        }
    }
}

fn compose(blend: Blend, dst: Rgb, src: Rgb, alpha: f32) -> Rgb {
    let a = alpha.clamp(0.0, 1.0);
    let channel = |d: f32, s: f32| match blend {
        Blend::SourceOver => d * (1.0 - a) + s * a,
        Blend::Screen => d + a * s * (1.0 - d),
    };
    Rgb::new(
        channel(dst.r, src.r),
        channel(dst.g, src.g),
        channel(dst.b, src.b),
    )
}

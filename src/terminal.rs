//! Truecolor half-block output.

use std::io::{self, Write};

use crate::canvas::Canvas;

const STATUS_FG: (u8, u8, u8) = (212, 175, 55);
const STATUS_BG: (u8, u8, u8) = (12, 10, 18);

/// Writes a canvas to a truecolor terminal.
///
/// Each cell shows two canvas rows: the upper pixel as the background colour
/// and the lower one as the foreground of a `▄`. Colour escapes are only
/// emitted when the colour changes along a row. The whole frame is built in
/// one buffer and written at once.
#[derive(Debug, Default)]
pub struct Presenter {
    output_buf: Vec<u8>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `canvas` from the top-left corner, then `status` on terminal row
    /// `status_row` (zero-based), clipped to the canvas width.
    pub fn present(
        &mut self,
        canvas: &Canvas,
        status: &str,
        status_row: u16,
        out: &mut impl Write,
    ) -> io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let (width, height) = (canvas.width(), canvas.height());
        for y in (0..height).step_by(2) {
            let mut prev_top = None;
            let mut prev_bot = None;
            for x in 0..width {
                let top = canvas.pixel(x, y).to_u8();
                let bot = if y + 1 < height {
                    canvas.pixel(x, y + 1).to_u8()
                } else {
                    top
                };

                if prev_top != Some(top) {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_top = Some(top);
                }
                if prev_bot != Some(bot) {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    prev_bot = Some(bot);
                }
                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            if y + 2 < height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        write!(
            self.output_buf,
            "\x1b[{};1H\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m",
            status_row + 1,
            STATUS_BG.0,
            STATUS_BG.1,
            STATUS_BG.2,
            STATUS_FG.0,
            STATUS_FG.1,
            STATUS_FG.2
        )?;
        let shown: String = status.chars().take(width).collect();
        self.output_buf.extend_from_slice(shown.as_bytes());
        self.output_buf.extend_from_slice(b"\x1b[K\x1b[0m");

        out.write_all(&self.output_buf)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgb;

    fn render(canvas: &Canvas, status: &str) -> String {
        let mut out = Vec::new();
        Presenter::new().present(canvas, status, 2, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_one_half_block_per_cell() {
        let canvas = Canvas::new(5, 4);
        let text = render(&canvas, "");
        assert!(text.starts_with("\x1b[H"));
        assert_eq!(text.matches('▄').count(), 10);
        assert_eq!(text.matches("\r\n").count(), 1);
    }

    #[test]
    fn test_colors_only_emitted_on_change() {
        let mut canvas = Canvas::new(4, 2);
        canvas.clear(Rgb::BLACK);
        let text = render(&canvas, "");
        // one background and one foreground escape for the uniform row
        assert_eq!(text.matches("\x1b[48;2;0;0;0m").count(), 1);
        assert_eq!(text.matches("\x1b[38;2;0;0;0m").count(), 1);

        canvas.plot(2.0, 1.0, Rgb::WHITE, 1.0);
        let text = render(&canvas, "");
        assert_eq!(text.matches("\x1b[38;2;255;255;255m").count(), 1);
        assert_eq!(text.matches("\x1b[38;2;0;0;0m").count(), 2);
    }

    #[test]
    fn test_odd_height_repeats_last_row() {
        let mut canvas = Canvas::new(1, 3);
        canvas.plot(0.0, 2.0, Rgb::WHITE, 1.0);
        let text = render(&canvas, "");
        assert!(text.contains("\x1b[48;2;255;255;255m\x1b[38;2;255;255;255m▄"));
    }

    #[test]
    fn test_status_line_is_clipped() {
        let canvas = Canvas::new(6, 2);
        let text = render(&canvas, "The Moon · willow");
        assert!(text.contains("\x1b[3;1H"));
        assert!(text.contains("The Mo\x1b[K"));
        assert!(!text.contains("willow"));
    }
}

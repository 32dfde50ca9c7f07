//! Placeholder image rendering
//!
//! Used whenever a real image cannot be produced. Draws a vertical gradient,
//! the start of the prompt and a caption with a built-in 5x7 bitmap font.
//! Rendering is deterministic: same prompt and size give the same file.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::errors::AppResult;
use crate::models::Dimensions;

const BACKGROUND_TOP: [u8; 3] = [53, 73, 94];
const BACKGROUND_BOTTOM: [u8; 3] = [24, 33, 43];
const TEXT_COLOR: Rgb<u8> = Rgb([236, 240, 241]);
const CAPTION_COLOR: Rgb<u8> = Rgb([149, 165, 166]);

const PROMPT_CHARS: usize = 60;
const CAPTION: &str = "AI GENERATED PLACEHOLDER";

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Glyph plus one column of spacing
const CELL_WIDTH: u32 = GLYPH_WIDTH + 1;
const LINE_HEIGHT: u32 = GLYPH_HEIGHT + 3;

/// Render a placeholder of exactly `size` into `output`. The format
/// follows the file extension.
pub fn render(prompt: &str, size: Dimensions, output: &Path) -> AppResult<()> {
    draw(prompt, size).save(output)?;
    Ok(())
}

/// Text shown on the placeholder
pub fn placeholder_text(prompt: &str) -> String {
    let prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = prompt.chars().take(PROMPT_CHARS).collect();
    format!("{}...", truncated)
}

pub fn draw(prompt: &str, size: Dimensions) -> RgbImage {
    let width = size.width.max(1);
    let height = size.height.max(1);

    let mut img = RgbImage::from_fn(width, height, |_, y| {
        let t = y as f32 / height as f32;
        let channel = |i: usize| {
            let top = BACKGROUND_TOP[i] as f32;
            let bottom = BACKGROUND_BOTTOM[i] as f32;
            (top + (bottom - top) * t).round() as u8
        };
        Rgb([channel(0), channel(1), channel(2)])
    });

    let scale = (width / 256).max(1);
    let columns = ((width * 4 / 5) / (CELL_WIDTH * scale)).max(1) as usize;
    let lines = wrap(&placeholder_text(prompt), columns);

    let block_height = lines.len() as u32 * LINE_HEIGHT * scale;
    let mut y = height.saturating_sub(block_height) / 2;
    for line in &lines {
        draw_line(&mut img, line, y, scale, TEXT_COLOR);
        y += LINE_HEIGHT * scale;
    }

    let caption_scale = (scale / 2).max(1);
    let caption_y = height.saturating_sub(LINE_HEIGHT * caption_scale * 2);
    draw_line(&mut img, CAPTION, caption_y, caption_scale, CAPTION_COLOR);

    img
}

/// Word wrap; words longer than a line are cut
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(columns) {
            let piece: String = piece.iter().collect();
            let needed = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 1 + piece.chars().count()
            };
            if needed > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Draw one horizontally centred line, clipping anything off-canvas
fn draw_line(img: &mut RgbImage, line: &str, top: u32, scale: u32, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let line_width = line.chars().count() as u32 * CELL_WIDTH * scale;
    let mut x = width.saturating_sub(line_width) / 2;

    for c in line.chars() {
        let rows = glyph(c);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = x + col * scale + dx;
                        let py = top + row as u32 * scale + dy;
                        if px < width && py < height {
                            img.put_pixel(px, py, color);
                        }
                    }
                }
            }
        }
        x += CELL_WIDTH * scale;
    }
}

/// 5x7 glyph rows, most significant of the low five bits is the left column
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '"' => [0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        ';' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x04, 0x08],
        ' ' => [0x00; 7],
        // '?' и всё, чего нет в шрифте
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

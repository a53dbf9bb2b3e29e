//! Tray icon rasterization
//!
//! Draws the 3x2 activity grid into a 32x32 RGBA image, with the category letter
//! underneath when one is set. An optional themed backdrop sits behind everything; the
//! project accent runs down the left edge and the context bar along the bottom.

use crate::config::Theme;
use crate::view::tray_model::{IconStyle, TrayModel};
use image::{Rgba, RgbaImage};

/// Icon width and height in pixels
pub const ICON_SIZE: u32 = 32;

const SQUARE: u32 = 8;
const GAP: u32 = 2;
const GRID_LEFT: u32 = 2;
const GRID_TOP_WITH_LETTER: u32 = 2;
const GRID_TOP_ALONE: u32 = 7;
const GLYPH_LEFT: u32 = 13;
const GLYPH_TOP: u32 = 23;

const ACCENT_WIDTH: u32 = 2;
const BAR_TOP: u32 = ICON_SIZE - 2;
/// Same span as the grid
const BAR_MAX_WIDTH: u16 = 28;

const LETTER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LIGHT_LETTER_COLOR: Rgba<u8> = Rgba([30, 41, 59, 255]);
const DARK_BACKDROP: [u8; 3] = [15, 23, 42];
const LIGHT_BACKDROP: [u8; 3] = [241, 245, 249];
const DIM_RGB: [u8; 3] = [100, 100, 100];

/// 5x7 glyphs for A-Z, one byte per row, bit 4 is the leftmost column
const GLYPHS: [[u8; 7]; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
    [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
    [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
];

/// Glyph rows for an ASCII letter
pub fn glyph(letter: char) -> Option<&'static [u8; 7]> {
    let upper = u8::try_from(letter.to_ascii_uppercase()).ok()?;
    GLYPHS.get(usize::from(upper.checked_sub(b'A')?))
}

/// Draw `model` as a 32x32 RGBA image
pub fn render_icon(model: &TrayModel) -> RgbaImage {
    let mut image = RgbaImage::new(ICON_SIZE, ICON_SIZE);
    draw_backdrop(&mut image, &model.style);
    let glyph = model.letter.and_then(glyph);
    let top = if glyph.is_some() {
        GRID_TOP_WITH_LETTER
    } else {
        GRID_TOP_ALONE
    };

    let lit = with_alpha(model.color, model.opacity);
    let dim = with_alpha(DIM_RGB, model.opacity * 50.0 / 255.0);

    for index in 0..6u8 {
        let col = u32::from(index % 3);
        let row = u32::from(index / 3);
        let x0 = GRID_LEFT + col * (SQUARE + GAP);
        let y0 = top + row * (SQUARE + GAP);
        let color = if model.lit_squares.contains(&index) { lit } else { dim };
        fill_square(&mut image, x0, y0, color);
    }

    if let Some(rows) = glyph {
        let letter_color = match model.style.theme {
            Theme::Dark => LETTER_COLOR,
            Theme::Light => LIGHT_LETTER_COLOR,
        };
        for (dy, bits) in (0u32..).zip(rows.iter()) {
            for dx in 0..5u32 {
                if bits & (0x10 >> dx) != 0 {
                    image.put_pixel(GLYPH_LEFT + dx, GLYPH_TOP + dy, letter_color);
                }
            }
        }
    }

    if let Some(accent) = model.style.accent {
        let color = with_alpha(accent, 1.0);
        for y in GRID_TOP_WITH_LETTER..BAR_TOP {
            for x in 0..ACCENT_WIDTH {
                image.put_pixel(x, y, color);
            }
        }
    }

    if let Some(bar) = model.style.context_bar {
        let color = with_alpha(bar.color, 1.0);
        let width = (bar.fraction.clamp(0.0, 1.0) * f32::from(BAR_MAX_WIDTH)).round();
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "width is clamped to 0..=BAR_MAX_WIDTH"
        )]
        let width = (width as u32).max(1);
        for y in BAR_TOP..ICON_SIZE {
            for x in GRID_LEFT..GRID_LEFT + width {
                image.put_pixel(x, y, color);
            }
        }
    }

    image
}

/// Themed plate behind the grid with the four corner pixels left clear
fn draw_backdrop(image: &mut RgbaImage, style: &IconStyle) {
    if style.background_opacity == 0 {
        return;
    }
    let [r, g, b] = match style.theme {
        Theme::Dark => DARK_BACKDROP,
        Theme::Light => LIGHT_BACKDROP,
    };
    let color = Rgba([r, g, b, style.background_opacity]);
    let last = ICON_SIZE - 1;
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            if (x == 0 || x == last) && (y == 0 || y == last) {
                continue;
            }
            image.put_pixel(x, y, color);
        }
    }
}

/// Raw RGBA bytes plus dimensions, as tray icon APIs expect
pub fn icon_rgba(model: &TrayModel) -> (Vec<u8>, u32, u32) {
    let image = render_icon(model);
    let (width, height) = image.dimensions();
    (image.into_raw(), width, height)
}

/// Square with the two outer corners of each edge cut, for a rounded look
fn fill_square(image: &mut RgbaImage, x0: u32, y0: u32, color: Rgba<u8>) {
    for dy in 0..SQUARE {
        for dx in 0..SQUARE {
            let corner = (dx == 0 || dx == SQUARE - 1) && (dy == 0 || dy == SQUARE - 1);
            if !corner {
                image.put_pixel(x0 + dx, y0 + dy, color);
            }
        }
    }
}

fn with_alpha(rgb: [u8; 3], opacity: f32) -> Rgba<u8> {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round();
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "alpha is clamped to 0..=255"
    )]
    let alpha = alpha as u8;
    Rgba([rgb[0], rgb[1], rgb[2], alpha])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::activity::LitSquares;
    use crate::view::tray_model::ContextBar;

    fn model(lit: &[u8], letter: Option<char>) -> TrayModel {
        TrayModel {
            color: [6, 182, 212],
            lit_squares: lit.iter().copied().collect::<LitSquares>(),
            opacity: 1.0,
            letter,
            tooltip: String::new(),
            flashing: false,
            style: IconStyle::default(),
        }
    }

    #[test]
    fn test_glyph_lookup() {
        assert_eq!(glyph('a'), glyph('A'));
        assert!(glyph('Z').is_some());
        assert!(glyph('7').is_none());
        assert!(glyph('é').is_none());
    }

    #[test]
    fn test_lit_and_dim_squares() {
        let image = render_icon(&model(&[0], None));
        assert_eq!(image.dimensions(), (ICON_SIZE, ICON_SIZE));

        let lit = image.get_pixel(GRID_LEFT + 3, GRID_TOP_ALONE + 3);
        assert_eq!(lit.0, [6, 182, 212, 255]);

        let dim = image.get_pixel(GRID_LEFT + SQUARE + GAP + 3, GRID_TOP_ALONE + 3);
        assert_eq!(dim.0, [100, 100, 100, 50]);

        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_letter_moves_grid_up() {
        let image = render_icon(&model(&[0], Some('E')));
        assert_eq!(image.get_pixel(GRID_LEFT + 3, GRID_TOP_WITH_LETTER + 3).0[3], 255);
        // Top row of "E" is fully set
        for dx in 0..5 {
            assert_eq!(*image.get_pixel(GLYPH_LEFT + dx, GLYPH_TOP), LETTER_COLOR);
        }
    }

    #[test]
    fn test_opacity_sets_alpha() {
        let mut m = model(&[1], None);
        m.opacity = 0.5;
        let image = render_icon(&m);
        let pixel = image.get_pixel(GRID_LEFT + SQUARE + GAP + 3, GRID_TOP_ALONE + 3);
        assert_eq!(pixel.0[3], 128);
    }

    #[test]
    fn test_backdrop_follows_theme_and_opacity() {
        let mut m = model(&[], None);
        m.style.background_opacity = 220;
        let dark = render_icon(&m);
        assert_eq!(dark.get_pixel(1, 1).0, [15, 23, 42, 220]);
        assert_eq!(dark.get_pixel(0, 0).0, [0, 0, 0, 0]);

        m.style.theme = Theme::Light;
        m.letter = Some('E');
        let light = render_icon(&m);
        assert_eq!(light.get_pixel(1, 1).0, [241, 245, 249, 220]);
        assert_eq!(*light.get_pixel(GLYPH_LEFT, GLYPH_TOP), LIGHT_LETTER_COLOR);
    }

    #[test]
    fn test_context_bar_and_accent() {
        let mut m = model(&[], None);
        m.style.context_bar = Some(ContextBar {
            fraction: 0.5,
            color: [239, 68, 68],
        });
        m.style.accent = Some([168, 85, 247]);
        let image = render_icon(&m);

        assert_eq!(image.get_pixel(GRID_LEFT, BAR_TOP).0, [239, 68, 68, 255]);
        assert_eq!(image.get_pixel(GRID_LEFT + 13, ICON_SIZE - 1).0, [239, 68, 68, 255]);
        assert_eq!(image.get_pixel(GRID_LEFT + 14, BAR_TOP).0[3], 0);

        assert_eq!(image.get_pixel(0, 10).0, [168, 85, 247, 255]);
        assert_eq!(image.get_pixel(ACCENT_WIDTH, 0).0[3], 0);
    }

    #[test]
    fn test_icon_rgba_length() {
        let (rgba, width, height) = icon_rgba(&model(&[], None));
        assert_eq!((width, height), (32, 32));
        assert_eq!(rgba.len(), 32 * 32 * 4);
    }
}

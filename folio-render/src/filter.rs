use folio_core::{RenderImage, Theme};
use rayon::prelude::*;

const HIGH_CONTRAST_THRESHOLD: u16 = 128 * 3;

/// Recolours an RGBA raster for the given reading theme.
pub fn apply_theme(image: &mut RenderImage, theme: Theme) {
    let recolor: fn(&mut [u8]) = match theme {
        Theme::Normal => return,
        Theme::Dark => invert,
        Theme::Sepia => sepia,
        Theme::HighContrast => high_contrast,
    };
    image.pixels.par_chunks_exact_mut(4).for_each(recolor);
}

fn invert(pixel: &mut [u8]) {
    pixel[0] = 255 - pixel[0];
    pixel[1] = 255 - pixel[1];
    pixel[2] = 255 - pixel[2];
}

fn sepia(pixel: &mut [u8]) {
    let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
    pixel[0] = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8;
    pixel[1] = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8;
    pixel[2] = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8;
}

// Light text on black: invert, then snap each pixel to black or white.
fn high_contrast(pixel: &mut [u8]) {
    let sum = pixel[0] as u16 + pixel[1] as u16 + pixel[2] as u16;
    let value = if sum >= HIGH_CONTRAST_THRESHOLD { 0 } else { 255 };
    pixel[0] = value;
    pixel[1] = value;
    pixel[2] = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(pixels: &[u8]) -> RenderImage {
        RenderImage {
            width: (pixels.len() / 4) as u32,
            height: 1,
            pixels: pixels.to_vec(),
        }
    }

    #[test]
    fn normal_theme_leaves_pixels_alone() {
        let mut img = image(&[10, 20, 30, 255]);
        apply_theme(&mut img, Theme::Normal);
        assert_eq!(img.pixels, vec![10, 20, 30, 255]);
    }

    #[test]
    fn dark_theme_inverts_colour_but_not_alpha() {
        let mut img = image(&[255, 255, 255, 200, 0, 10, 20, 255]);
        apply_theme(&mut img, Theme::Dark);
        assert_eq!(img.pixels, vec![0, 0, 0, 200, 255, 245, 235, 255]);
    }

    #[test]
    fn sepia_warms_white_and_clamps() {
        let mut img = image(&[255, 255, 255, 255]);
        apply_theme(&mut img, Theme::Sepia);
        assert_eq!(&img.pixels[..3], &[255, 255, 238]);
    }

    #[test]
    fn high_contrast_produces_pure_black_and_white() {
        let mut img = image(&[250, 240, 230, 255, 40, 50, 60, 255]);
        apply_theme(&mut img, Theme::HighContrast);
        assert_eq!(img.pixels, vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}

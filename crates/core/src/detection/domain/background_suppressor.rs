use crate::imaging::equalize::{equalize_tiles, DEFAULT_CLIP_LIMIT, DEFAULT_TILE_GRID};
use crate::imaging::gaussian::blur_sigma;
use crate::imaging::morphology::{white_top_hat, StructuringElement};
use crate::shared::GrayGrid;

/// Standard deviation of the denoising blur applied before the top-hat.
pub const DENOISE_SIGMA: f64 = 1.0;

/// Output of background suppression.
///
/// `remapped` is the intensity grid after the brightness curve and optional
/// equalization; brightness filtering is measured on it. `residual` is the
/// top-hat response that gets thresholded.
#[derive(Clone, Debug)]
pub struct SuppressedFrame {
    pub remapped: GrayGrid,
    pub residual: GrayGrid,
}

/// Removes slowly varying background so that only sub-kernel bright spots remain.
pub struct BackgroundSuppressor {
    gamma_lut: Option<[u8; 256]>,
    equalize: bool,
    element: StructuringElement,
}

impl BackgroundSuppressor {
    /// `kernel_size` is the structuring-element diameter; it is forced odd and
    /// at least 3. A gamma that is non-positive or within 1e-3 of 1 skips the
    /// brightness curve.
    pub fn new(gamma: f64, equalize: bool, kernel_size: usize) -> Self {
        Self {
            gamma_lut: gamma_lut(gamma),
            equalize,
            element: StructuringElement::ellipse(kernel_size.max(3) | 1),
        }
    }

    pub fn suppress(&self, intensity: &GrayGrid) -> SuppressedFrame {
        let mut remapped = match &self.gamma_lut {
            Some(lut) => intensity.mapv(|v| lut[v as usize]),
            None => intensity.clone(),
        };
        if self.equalize {
            remapped = equalize_tiles(&remapped, DEFAULT_TILE_GRID, DEFAULT_CLIP_LIMIT);
        }

        let smoothed = blur_sigma(&remapped, DENOISE_SIGMA);
        let residual = white_top_hat(&smoothed, &self.element);
        SuppressedFrame { remapped, residual }
    }
}

/// 256-entry table for `255 * (v / 255)^(1 / gamma)`, truncated.
pub fn gamma_lut(gamma: f64) -> Option<[u8; 256]> {
    if gamma.is_nan() || gamma <= 0.0 || (gamma - 1.0).abs() < 1e-3 {
        return None;
    }
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = ((i as f64 / 255.0).powf(inv) * 255.0).clamp(0.0, 255.0) as u8;
    }
    Some(lut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0)]
    #[case(1.0005)]
    #[case(0.0)]
    #[case(-2.0)]
    #[case(f64::NAN)]
    fn test_gamma_lut_skipped(#[case] gamma: f64) {
        assert!(gamma_lut(gamma).is_none());
    }

    #[test]
    fn test_gamma_lut_keeps_extremes() {
        let lut = gamma_lut(1.4).unwrap();
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn test_gamma_above_one_brightens_midtones() {
        let lut = gamma_lut(1.4).unwrap();
        assert!(lut[64] > 64);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_gamma_below_one_darkens_midtones() {
        let lut = gamma_lut(0.5).unwrap();
        // (128/255)^2 * 255 = 64.25
        assert_eq!(lut[128], 64);
    }

    #[test]
    fn test_all_zero_frame_gives_zero_residual() {
        let suppressor = BackgroundSuppressor::new(1.4, true, 9);
        let out = suppressor.suppress(&GrayGrid::zeros((32, 32)));
        assert!(out.residual.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_flat_background_removed() {
        let suppressor = BackgroundSuppressor::new(1.0, false, 9);
        let out = suppressor.suppress(&GrayGrid::from_elem((32, 32), 140));
        assert!(out.residual.iter().all(|&v| v == 0));
        assert!(out.remapped.iter().all(|&v| v == 140));
    }

    #[test]
    fn test_small_spot_survives_broad_glow_does_not() {
        let mut grid = GrayGrid::from_elem((60, 60), 20);
        // Broad glow, much wider than the kernel.
        for y in 0..60 {
            for x in 30..60 {
                grid[[y, x]] = 120;
            }
        }
        // Small light on the dark side.
        for y in 14..17 {
            for x in 10..13 {
                grid[[y, x]] = 250;
            }
        }
        let suppressor = BackgroundSuppressor::new(1.0, false, 9);
        let out = suppressor.suppress(&grid);

        assert!(out.residual[[15, 11]] > 100);
        assert_eq!(out.residual[[30, 45]], 0);
    }

    #[test]
    fn test_output_dimensions_match_input() {
        let suppressor = BackgroundSuppressor::new(1.4, true, 4);
        let out = suppressor.suppress(&GrayGrid::zeros((17, 23)));
        assert_eq!(out.residual.dim(), (17, 23));
        assert_eq!(out.remapped.dim(), (17, 23));
    }
}

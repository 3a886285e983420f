//! Directional perceptual color distance.
//!
//! A redmean-style weighted Euclidean distance in RGB space, extended with
//! two corrective rules for saturated blues. The function is NOT symmetric:
//! the first argument must be the sampled image pixel and the second a
//! palette candidate. Swapping them changes which corrections fire. Scores
//! are only meaningful for ranking candidates against the same sample.

/// Weighted dissimilarity between a sampled pixel and a palette candidate.
///
/// Channel weights follow the redmean approximation with the blue weight
/// raised by 1.25x. Two directional rules apply on top:
///
/// - if `sample` is strongly blue (blue > 160 and blue > green + 35) the
///   blue weight is raised 2.5x before the base term is computed;
/// - if `sample` reads as blue (blue > red + 15 and blue > green + 15) while
///   `candidate` reads as green (green > blue + 30), the result is
///   multiplied by 10 so blue pixels never land on green palette entries.
///
/// Callers must always pass the image pixel as `sample` and the palette
/// color as `candidate`.
pub fn color_distance(sample: [u8; 3], candidate: [u8; 3]) -> f64 {
    let [sr, sg, sb] = [sample[0] as i32, sample[1] as i32, sample[2] as i32];
    let [cr, cg, cb] = [
        candidate[0] as i32,
        candidate[1] as i32,
        candidate[2] as i32,
    ];

    let mean_r = (sr + cr) as f64 / 2.0;
    let w_r = 2.0 + mean_r / 256.0;
    let w_g = 4.0;
    let mut w_b = (2.0 + (255.0 - mean_r) / 256.0) * 1.25;

    // Strongly blue samples keep their blue channel dominant in the score.
    if sb > 160 && sb > sg + 35 {
        w_b *= 2.5;
    }

    let dr = (sr - cr) as f64;
    let dg = (sg - cg) as f64;
    let db = (sb - cb) as f64;
    let mut dist = w_r * dr * dr + w_g * dg * dg + w_b * db * db;

    // Blue samples must not resolve to green candidates.
    if sb > sr + 15 && sb > sg + 15 && cg > cb + 30 {
        dist *= 10.0;
    }

    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_colors_have_zero_distance() {
        assert_eq!(color_distance([0, 0, 0], [0, 0, 0]), 0.0);
        assert_eq!(color_distance([254, 255, 255], [254, 255, 255]), 0.0);
        assert_eq!(color_distance([72, 35, 184], [72, 35, 184]), 0.0);
    }

    #[test]
    fn test_distance_is_nonnegative() {
        let probes = [
            [0u8, 0, 0],
            [255, 255, 255],
            [10, 10, 220],
            [40, 150, 20],
            [200, 30, 40],
        ];
        for a in probes {
            for b in probes {
                assert!(color_distance(a, b) >= 0.0);
            }
        }
    }

    #[test]
    fn test_blue_sample_prefers_blue_candidate_over_green() {
        // A clearly blue pixel against a green and a blue candidate. The
        // green candidate must lose by a wide margin once the guard fires.
        let sample = [10, 10, 220];
        let green = [40, 150, 20];
        let blue = [20, 20, 200];
        let to_green = color_distance(sample, green);
        let to_blue = color_distance(sample, blue);
        assert!(
            to_blue < to_green,
            "blue candidate {} should beat green candidate {}",
            to_blue,
            to_green
        );
        // The guard multiplies, it does not merely nudge.
        assert!(to_green > to_blue * 100.0);
    }

    #[test]
    fn test_guard_is_directional() {
        // Passing the green color in the sample position disables the guard,
        // so the score drops dramatically relative to the guarded direction.
        let blue = [10, 10, 220];
        let green = [40, 150, 20];
        assert!(color_distance(blue, green) > color_distance(green, blue) * 5.0);
    }

    #[test]
    fn test_blue_dominance_reweighting() {
        // Two samples with the same channel deltas to the candidate; the
        // strongly blue one weighs its blue delta heavier.
        let candidate = [50, 50, 150];
        let dominant_blue = [70, 60, 200]; // blue > 160 and blue > green + 35
        let mild_blue = [70, 60, 150]; // below both thresholds
        let shifted = [50, 50, 100]; // same deltas from mild_blue as candidate from dominant_blue
        let d_dominant = color_distance(dominant_blue, candidate);
        let d_mild = color_distance(mild_blue, shifted);
        assert!(d_dominant > d_mild);
    }
}

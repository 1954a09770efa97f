//! Per-frame quality and content scores.
//!
//! Everything here is a pure function of a single [`Frame`]. The pixel math
//! follows the 8-bit conventions of common vision libraries so that scores
//! line up with thresholds tuned elsewhere: BT.601 luma in 14-bit fixed
//! point, a 4-neighbour Laplacian with reflect-101 borders, and HSV with
//! saturation scaled to `0..=255`.

use log::trace;

use crate::frame::Frame;

// BT.601 luma weights scaled by 2^14.
const LUMA_SHIFT: u32 = 14;
const LUMA_B: u32 = 1868;
const LUMA_G: u32 = 9617;
const LUMA_R: u32 = 4899;

/// Thresholds for the "bright, desaturated surface" proxy used to detect
/// steel parts in frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteelHeuristic {
    /// A pixel must be strictly brighter than this (HSV value, `0..=255`).
    pub min_brightness: u8,
    /// A pixel must be strictly less saturated than this (`0..=255`).
    pub max_saturation: u8,
    /// Share of the frame, in `0.0..=1.0`, that steel-like pixels must
    /// strictly exceed.
    pub min_area_fraction: f64,
}

impl Default for SteelHeuristic {
    fn default() -> Self {
        Self {
            min_brightness: 200,
            max_saturation: 50,
            min_area_fraction: 0.01,
        }
    }
}

impl SteelHeuristic {
    /// Whether a single BGR pixel looks like bare steel.
    #[must_use]
    pub fn matches(&self, [b, g, r]: [u8; 3]) -> bool {
        let (value, saturation) = value_saturation(b, g, r);
        value > self.min_brightness && saturation < self.max_saturation
    }
}

/// Single-channel luminance of a frame.
#[derive(Debug, Clone)]
pub struct LumaPlane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl LumaPlane {
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        let data = frame.pixels().map(|[b, g, r]| luma(b, g, r)).collect();
        Self {
            width: frame.width(),
            height: frame.height(),
            data,
        }
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        let sum: u64 = self.data.iter().map(|&y| u64::from(y)).sum();
        sum as f64 / self.data.len() as f64
    }

    /// Population variance of the Laplacian response. High for frames with
    /// crisp edges, near zero for flat or smeared ones.
    #[must_use]
    pub fn laplacian_variance(&self) -> f64 {
        let (w, h) = (self.width, self.height);
        let mut sum = 0i128;
        let mut sum_sq = 0i128;
        for y in 0..h {
            let up = reflect_101(y as isize - 1, h);
            let down = reflect_101(y as isize + 1, h);
            for x in 0..w {
                let left = reflect_101(x as isize - 1, w);
                let right = reflect_101(x as isize + 1, w);
                let response = i128::from(self.at(x, up))
                    + i128::from(self.at(x, down))
                    + i128::from(self.at(left, y))
                    + i128::from(self.at(right, y))
                    - 4 * i128::from(self.at(x, y));
                sum += response;
                sum_sq += response * response;
            }
        }

        // n * Σx² - (Σx)² is exact in integers; divide once at the end.
        let n = (w * h) as i128;
        (n * sum_sq - sum * sum) as f64 / (n * n) as f64
    }

    #[inline(always)]
    fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Mirrors an out-of-range index back into `0..len` without repeating the
/// edge sample (`-1 -> 1`, `len -> len - 2`).
const fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    if i < 0 {
        (-i) as usize
    } else if i > last {
        (2 * last - i) as usize
    } else {
        i as usize
    }
}

#[inline(always)]
const fn luma(b: u8, g: u8, r: u8) -> u8 {
    let y = b as u32 * LUMA_B + g as u32 * LUMA_G + r as u32 * LUMA_R + (1 << (LUMA_SHIFT - 1));
    (y >> LUMA_SHIFT) as u8
}

/// HSV value and saturation of a BGR pixel, both on `0..=255`.
#[inline(always)]
const fn value_saturation(b: u8, g: u8, r: u8) -> (u8, u8) {
    let max = if b > g { b } else { g };
    let max = if max > r { max } else { r };
    let min = if b < g { b } else { g };
    let min = if min < r { min } else { r };
    if max == 0 {
        return (0, 0);
    }
    let diff = (max - min) as u32;
    let v = max as u32;
    (max, ((255 * diff + v / 2) / v) as u8)
}

/// Variance of the Laplacian of the frame's luminance.
#[must_use]
pub fn blur_score(frame: &Frame) -> f64 {
    LumaPlane::from_frame(frame).laplacian_variance()
}

/// Mean luminance of the frame, `0.0..=255.0`.
#[must_use]
pub fn blackout_score(frame: &Frame) -> f64 {
    LumaPlane::from_frame(frame).mean()
}

#[must_use]
pub fn is_blurry(frame: &Frame, threshold: f64) -> bool {
    blur_score(frame) < threshold
}

#[must_use]
pub fn is_blacked_out(frame: &Frame, threshold: f64) -> bool {
    blackout_score(frame) < threshold
}

#[must_use]
pub fn steel_pixel_count(frame: &Frame, heuristic: &SteelHeuristic) -> usize {
    frame.pixels().filter(|&px| heuristic.matches(px)).count()
}

#[must_use]
pub fn contains_steel(frame: &Frame, heuristic: &SteelHeuristic) -> bool {
    steel_pixel_count(frame, heuristic) as f64
        > heuristic.min_area_fraction * frame.pixel_count() as f64
}

/// All three scores for one frame, sharing a single luminance conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub blur_score: f64,
    pub blackout_score: f64,
    pub steel_present: bool,
}

impl FrameMetrics {
    #[must_use]
    pub fn measure(frame: &Frame, heuristic: &SteelHeuristic) -> Self {
        let luma = LumaPlane::from_frame(frame);
        let metrics = Self {
            blur_score: luma.laplacian_variance(),
            blackout_score: luma.mean(),
            steel_present: contains_steel(frame, heuristic),
        };
        trace!(
            "blur={:.1} luma={:.1} steel={}",
            metrics.blur_score, metrics.blackout_score, metrics.steel_present
        );
        metrics
    }

    /// Blurry or blacked out under the given thresholds.
    #[must_use]
    pub fn is_bad(&self, blur_threshold: f64, blackout_threshold: f64) -> bool {
        self.blur_score < blur_threshold || self.blackout_score < blackout_threshold
    }
}

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Rec. 709 luma weights used by the bright-pass threshold.
pub const LUMINANCE_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// One-sided weights of the 9-tap separable Gaussian kernel.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

pub const DEFAULT_BLUR_ITERATIONS: u32 = 10;

pub fn luminance(color: Vec3) -> f32 {
    color.dot(LUMINANCE_WEIGHTS)
}

/// Keeps the lit colour when its luminance exceeds `threshold`, black
/// otherwise.
pub fn bright_pass(color: Vec3, threshold: f32) -> Vec3 {
    if luminance(color) > threshold {
        color
    } else {
        Vec3::ZERO
    }
}

/// Largest `f32` below one; `1 - exp(-x)` rounds up to 1.0 past x ~ 17.
pub const TONE_MAP_CEILING: f32 = 1.0 - f32::EPSILON / 2.0;

/// Exponential exposure mapping `1 - exp(-color * exposure)`.
pub fn tone_map(color: Vec3, exposure: f32) -> Vec3 {
    (Vec3::ONE - (-color * exposure).exp()).min(Vec3::splat(TONE_MAP_CEILING))
}

/// Adds the blurred bright colour when bloom is enabled, then tone maps.
pub fn compose(base: Vec3, blurred: Vec3, bloom: bool, exposure: f32) -> Vec3 {
    let hdr = if bloom { base + blurred } else { base };
    tone_map(hdr, exposure)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlurTarget {
    Bright,
    PingPong(usize),
}

impl BlurTarget {
    /// Position of the target in a `[bright, ping_pong[0], ping_pong[1]]`
    /// table.
    pub fn slot(self) -> usize {
        match self {
            BlurTarget::Bright => 0,
            BlurTarget::PingPong(index) => 1 + index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurStep {
    pub source: BlurTarget,
    pub destination: usize,
    pub horizontal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlurSchedule {
    steps: Vec<BlurStep>,
    output: BlurTarget,
}

impl BlurSchedule {
    /// Starts horizontal, flips direction every iteration and writes to
    /// `ping_pong[horizontal as usize]`. The first iteration reads the
    /// bright attachment, later ones read the previously written target.
    pub fn new(iterations: u32) -> Self {
        let mut steps = Vec::with_capacity(iterations as usize);
        let mut horizontal = true;
        let mut source = BlurTarget::Bright;
        for _ in 0..iterations {
            let destination = horizontal as usize;
            steps.push(BlurStep {
                source,
                destination,
                horizontal,
            });
            source = BlurTarget::PingPong(destination);
            horizontal = !horizontal;
        }
        Self {
            steps,
            output: source,
        }
    }

    pub fn steps(&self) -> &[BlurStep] {
        &self.steps
    }

    /// Target holding the final blurred result. With zero iterations this
    /// is the unblurred bright attachment.
    pub fn output(&self) -> BlurTarget {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomSettings {
    pub enabled: bool,
    pub exposure: f32,
    pub threshold: f32,
    pub iterations: u32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exposure: 1.0,
            threshold: 1.0,
            iterations: DEFAULT_BLUR_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_map_stays_below_one() {
        for exposure in [0.05, 0.2, 1.0, 2.0] {
            for value in [0.0, 0.5, 1.0, 2.5, 5.0, 20.0, 1e4, f32::MAX] {
                let mapped = tone_map(Vec3::splat(value), exposure);
                assert!(mapped.min_element() >= 0.0);
                assert!(mapped.max_element() < 1.0);
            }
        }
    }

    #[test]
    fn unit_white_with_low_exposure() {
        let mapped = tone_map(Vec3::ONE, 0.2);
        let expected = 1.0 - (-0.2f32).exp();
        assert!((mapped - Vec3::splat(expected)).abs().max_element() < 1e-6);
        assert!((expected - 0.1813).abs() < 1e-4);
    }

    #[test]
    fn disabled_bloom_matches_zero_blur() {
        let base = Vec3::new(0.3, 1.7, 4.0);
        let blurred = Vec3::new(2.0, 0.5, 0.1);
        assert_eq!(
            compose(base, blurred, false, 1.0),
            compose(base, Vec3::ZERO, true, 1.0)
        );
        assert_ne!(
            compose(base, blurred, true, 1.0),
            compose(base, blurred, false, 1.0)
        );
    }

    #[test]
    fn bright_pass_thresholds_on_luminance() {
        assert_eq!(bright_pass(Vec3::splat(0.9), 1.0), Vec3::ZERO);
        let hot = Vec3::new(3.0, 2.0, 1.0);
        assert_eq!(bright_pass(hot, 1.0), hot);
    }

    #[test]
    fn kernel_is_normalised() {
        let total = GAUSSIAN_WEIGHTS[0] + 2.0 * GAUSSIAN_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn default_schedule_ends_in_first_buffer() {
        let schedule = BlurSchedule::new(DEFAULT_BLUR_ITERATIONS);
        assert_eq!(schedule.steps().len(), 10);
        assert_eq!(schedule.output(), BlurTarget::PingPong(0));
        let last = schedule.steps().last().unwrap();
        assert!(!last.horizontal);
        assert_eq!(last.destination, 0);
    }

    #[test]
    fn schedule_parity_matches_iteration_count() {
        for iterations in 1..16u32 {
            let schedule = BlurSchedule::new(iterations);
            assert_eq!(
                schedule.output(),
                BlurTarget::PingPong((iterations % 2) as usize)
            );
        }
    }

    #[test]
    fn schedule_alternates_and_chains() {
        let schedule = BlurSchedule::new(4);
        let steps = schedule.steps();
        assert_eq!(steps[0].source, BlurTarget::Bright);
        assert!(steps[0].horizontal);
        for pair in steps.windows(2) {
            assert_ne!(pair[0].horizontal, pair[1].horizontal);
            assert_eq!(pair[1].source, BlurTarget::PingPong(pair[0].destination));
            assert_ne!(pair[1].destination, pair[0].destination);
        }
    }

    #[test]
    fn zero_iterations_reads_bright_target() {
        let schedule = BlurSchedule::new(0);
        assert!(schedule.steps().is_empty());
        assert_eq!(schedule.output(), BlurTarget::Bright);
        assert_eq!(schedule.output().slot(), 0);
    }
}

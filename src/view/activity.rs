//! 3x2 activity grid animation
//!
//! Squares are indexed 0-5 in row-major order. The indicator is stepped by the controller
//! loop; [`ActivityIndicator::step`] only advances once the pattern interval has elapsed.

use crate::config::{AttentionConfig, PatternConfig, PatternMode};
use crate::utils::random_below;
use smallvec::SmallVec;
use std::time::{Duration, Instant};

/// Number of squares in the grid
pub const GRID_SQUARES: u8 = 6;

/// Shortest step interval, regardless of speed multipliers
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_LIT_RANGE: [u8; 2] = [2, 4];

/// Lit square indices for one frame
pub type LitSquares = SmallVec<[u8; 6]>;

/// Animated state of the square grid
#[derive(Debug, Clone)]
pub struct ActivityIndicator {
    pattern: PatternConfig,
    color: [u8; 3],
    opacity: f32,
    lit: LitSquares,
    frame: usize,
    interval: Option<Duration>,
    next_step: Instant,
    phase_origin: Instant,
}

impl ActivityIndicator {
    /// Indicator showing nothing until configured
    pub fn new(now: Instant) -> Self {
        Self {
            pattern: PatternConfig::default(),
            color: [0, 0, 0],
            opacity: AttentionConfig::default().midpoint(),
            lit: LitSquares::new(),
            frame: 0,
            interval: None,
            next_step: now,
            phase_origin: now,
        }
    }

    /// Switch to a new pattern and restart from its first frame
    ///
    /// `speed` scales the step rate (2.0 steps twice as fast). With `animate` false
    /// the first frame is shown and never advances.
    pub fn configure(
        &mut self,
        pattern: PatternConfig,
        color: [u8; 3],
        attention: &AttentionConfig,
        speed: f64,
        animate: bool,
        now: Instant,
    ) {
        self.lit = first_frame(&pattern);
        self.frame = 1;
        self.color = color;
        self.opacity = attention.midpoint();
        self.interval = if animate && pattern.mode != PatternMode::Static {
            step_interval(pattern.interval, speed)
        } else {
            None
        };
        self.next_step = self.interval.map_or(now, |interval| now + interval);
        self.phase_origin = now;
        self.pattern = pattern;
    }

    /// Advance the animation if its interval has elapsed
    ///
    /// Returns whether the visible frame changed.
    pub fn step(&mut self, now: Instant) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        if now < self.next_step {
            return false;
        }
        self.next_step = now + interval;

        let before = (self.lit.clone(), self.opacity);
        match self.pattern.mode {
            PatternMode::Sequence => {
                let sequence = &self.pattern.sequence;
                self.lit = if sequence.is_empty() {
                    LitSquares::new()
                } else {
                    sequence[self.frame % sequence.len()].iter().copied().collect()
                };
                self.frame = self.frame.wrapping_add(1);
            }
            PatternMode::Random => {
                let [lo, hi] = self.pattern.lit_range.unwrap_or(DEFAULT_LIT_RANGE);
                let lo = lo.min(GRID_SQUARES);
                let hi = hi.clamp(lo, GRID_SQUARES);
                let count = usize::from(lo) + random_below(usize::from(hi - lo) + 1);
                self.lit = random_squares(count);
            }
            PatternMode::Breathe => {
                self.lit = (0..GRID_SQUARES).collect();
                let t = now.saturating_duration_since(self.phase_origin).as_secs_f32();
                self.opacity = 0.35f32.mul_add((t * 2.0).sin(), 0.65);
            }
            PatternMode::Static => self.lit = first_frame(&self.pattern),
        }
        before != (self.lit.clone(), self.opacity)
    }

    /// Lit square indices of the current frame
    pub fn lit_squares(&self) -> &[u8] {
        &self.lit
    }

    /// Whether square `index` is lit
    pub fn is_lit(&self, index: u8) -> bool {
        self.lit.contains(&index)
    }

    /// Color of lit squares
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// Opacity of lit squares (0.0 - 1.0)
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Time between steps, `None` while static
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Pattern currently shown
    pub fn pattern(&self) -> &PatternConfig {
        &self.pattern
    }
}

/// Step interval for a pattern, `None` when the pattern does not animate
pub fn step_interval(interval_secs: f64, speed: f64) -> Option<Duration> {
    if !interval_secs.is_finite() || interval_secs <= 0.0 {
        return None;
    }
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    let micros = (interval_secs * 1_000_000.0 / speed).round();
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "float to int casts saturate"
    )]
    let interval = Duration::from_micros(micros as u64);
    Some(interval.max(MIN_INTERVAL))
}

fn first_frame(pattern: &PatternConfig) -> LitSquares {
    pattern
        .sequence
        .first()
        .map(|frame| frame.iter().copied().collect())
        .unwrap_or_default()
}

/// `count` distinct squares, sorted
fn random_squares(count: usize) -> LitSquares {
    let mut pool: LitSquares = (0..GRID_SQUARES).collect();
    let count = count.min(pool.len());
    for i in 0..count {
        let j = i + random_below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool.sort_unstable();
    pool
}

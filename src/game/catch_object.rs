use serde::{Deserialize, Serialize};

// Playfield and catcher constants (osu!catch lazer values).
pub const PLAYFIELD_WIDTH: f32 = 512.0;
pub const CATCHER_BASE_SIZE: f32 = 106.75;
// Fraction of the catcher sprite that actually catches.
pub const ALLOWED_CATCH_RANGE: f32 = 0.8;
pub const DEFAULT_CIRCLE_SIZE: f32 = 5.0;

// Speeds in playfield units per millisecond.
pub const BASE_DASH_SPEED: f64 = 1.0;
pub const BASE_WALK_SPEED: f64 = BASE_DASH_SPEED / 2.0;

pub const FRUIT_SCORE: i32 = 300;
pub const DROPLET_SCORE: i32 = 20;
pub const TINY_DROPLET_SCORE: i32 = 1;
pub const BANANA_SCORE: i32 = 1;

#[inline(always)]
pub fn catcher_scale(circle_size: f32) -> f32 {
    1.0 - 0.7 * (circle_size - 5.0) / 5.0
}

/// Full catch width for a beatmap circle size.
#[inline(always)]
pub fn catch_width(circle_size: f32) -> f32 {
    CATCHER_BASE_SIZE * catcher_scale(circle_size).abs() * ALLOWED_CATCH_RANGE
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Fruit,
    Droplet,
    TinyDroplet,
    Banana,
}

impl ObjectKind {
    #[inline(always)]
    pub const fn score(self) -> i32 {
        match self {
            Self::Fruit => FRUIT_SCORE,
            Self::Droplet => DROPLET_SCORE,
            Self::TinyDroplet => TINY_DROPLET_SCORE,
            Self::Banana => BANANA_SCORE,
        }
    }

    /// Small objects that cannot be caught mid hyperdash.
    #[inline(always)]
    pub const fn skipped_during_hyper_dash(self) -> bool {
        matches!(self, Self::TinyDroplet | Self::Banana)
    }
}

/// One catchable object on the timeline.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchObject {
    /// Milliseconds.
    pub time: f64,
    pub x: f32,
    #[serde(default)]
    pub kind: ObjectKind,
    /// Where catching this object throws the catcher, if it is a hyperdash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper_dash_target: Option<f32>,
    /// Overrides the kind's score value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

impl CatchObject {
    pub const fn new(time: f64, x: f32, kind: ObjectKind) -> Self {
        Self { time, x, kind, hyper_dash_target: None, score: None }
    }

    pub const fn fruit(time: f64, x: f32) -> Self {
        Self::new(time, x, ObjectKind::Fruit)
    }

    pub const fn with_hyper_dash(mut self, target: f32) -> Self {
        self.hyper_dash_target = Some(target);
        self
    }

    pub const fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    #[inline(always)]
    pub const fn grants_boost(&self) -> bool {
        self.hyper_dash_target.is_some()
    }

    #[inline(always)]
    pub fn score_value(&self) -> i32 {
        self.score.unwrap_or(self.kind.score())
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.x.is_finite()
            && self.hyper_dash_target.is_none_or(f32::is_finite)
    }
}

/// Orders objects for planning and drops the ones a hyperdash flies over.
///
/// Simultaneous objects keep their relative order, except that hyperdash
/// objects go last. After a hyperdash, tiny droplets and bananas are dropped
/// until the next object of another kind.
pub fn prepare_timeline(objects: &[CatchObject]) -> Vec<CatchObject> {
    let mut sorted = objects.to_vec();
    sorted.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.grants_boost().cmp(&b.grants_boost()))
    });

    let mut skipping = false;
    sorted.retain(|obj| {
        if skipping && obj.kind.skipped_during_hyper_dash() {
            return false;
        }
        skipping = obj.grants_boost();
        true
    });
    sorted
}

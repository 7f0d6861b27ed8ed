use serde::{Deserialize, Serialize};

/// Keyframe of catcher motion. `dashing` describes the movement that ends at
/// this frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub time: f64,
    pub x: f32,
    #[serde(default)]
    pub dashing: bool,
}

/// Time-ordered keyframes. Playback interpolates linearly between frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub frames: Vec<ReplayFrame>,
}

impl Replay {
    pub fn push(&mut self, time: f64, x: f32, dashing: bool) {
        debug_assert!(
            self.frames.last().is_none_or(|f| f.time <= time),
            "replay frames must not go back in time"
        );
        self.frames.push(ReplayFrame { time, x, dashing });
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the first frame strictly after `time`.
    #[inline(always)]
    fn next_index(&self, time: f64) -> usize {
        self.frames.partition_point(|f| f.time <= time)
    }

    /// Catcher position at `time`, holding the first/last frame outside the
    /// replay's time span.
    pub fn position_at(&self, time: f64) -> Option<f32> {
        let first = self.frames.first()?;
        let i = self.next_index(time);
        if i == 0 {
            return Some(first.x);
        }
        let current = &self.frames[i - 1];
        let Some(next) = self.frames.get(i) else {
            return Some(current.x);
        };

        let span = next.time - current.time;
        if span <= 0.0 {
            return Some(next.x);
        }
        let t = ((time - current.time) / span) as f32;
        Some(current.x + (next.x - current.x) * t)
    }

    /// Fastest movement between two consecutive frames, in units per ms.
    pub fn max_speed(&self) -> f64 {
        self.frames
            .windows(2)
            .filter(|w| w[1].time > w[0].time)
            .map(|w| f64::from((w[1].x - w[0].x).abs()) / (w[1].time - w[0].time))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::Replay;

    fn sample() -> Replay {
        let mut replay = Replay::default();
        replay.push(0.0, 100.0, false);
        replay.push(100.0, 200.0, true);
        replay.push(300.0, 200.0, false);
        replay.push(300.0, 250.0, true);
        replay
    }

    #[test]
    fn interpolates_between_frames() {
        let replay = sample();
        assert_eq!(replay.position_at(50.0), Some(150.0));
        assert_eq!(replay.position_at(100.0), Some(200.0));
        assert_eq!(replay.position_at(200.0), Some(200.0));
    }

    #[test]
    fn holds_position_outside_the_span() {
        let replay = sample();
        assert_eq!(replay.position_at(-10.0), Some(100.0));
        assert_eq!(replay.position_at(1000.0), Some(250.0));
        assert_eq!(Replay::default().position_at(0.0), None);
    }

    #[test]
    fn max_speed_skips_instant_frames() {
        let replay = sample();
        assert!((replay.max_speed() - 1.0).abs() < 1e-9);
        assert_eq!(replay.len(), 4);
    }
}

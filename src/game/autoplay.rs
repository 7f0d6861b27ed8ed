use log::{debug, trace};
use thiserror::Error;

use crate::game::catch_object::{
    self, BASE_DASH_SPEED, BASE_WALK_SPEED, CatchObject, DEFAULT_CIRCLE_SIZE, PLAYFIELD_WIDTH,
};
use crate::game::replay::Replay;
use crate::game::step_function::{StepFunction, StepFunctionError};

// The catcher settles at the playfield centre well before the first object.
const SETTLE_FROM_MS: f64 = -10000.0;
const SETTLE_AT_MS: f64 = -1000.0;
const SETTLE_LEAD_MS: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot plan an empty timeline")]
    EmptyTimeline,
    #[error("object {index} has a non-finite time or position")]
    NonFiniteObject { index: usize },
    #[error("invalid agent model: {0}")]
    InvalidAgent(&'static str),
    #[error(transparent)]
    StepFunction(#[from] StepFunctionError),
}

/// Movement limits of the catcher.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AgentModel {
    /// Units per ms without dashing.
    pub walk_speed: f64,
    /// Units per ms while dashing.
    pub dash_speed: f64,
    /// Full width of the catching area.
    pub catch_width: f32,
    /// Positions are confined to `[0, playfield_width]`.
    pub playfield_width: f32,
}

impl Default for AgentModel {
    fn default() -> Self {
        Self::from_circle_size(DEFAULT_CIRCLE_SIZE)
    }
}

impl AgentModel {
    pub fn from_circle_size(circle_size: f32) -> Self {
        Self {
            walk_speed: BASE_WALK_SPEED,
            dash_speed: BASE_DASH_SPEED,
            catch_width: catch_object::catch_width(circle_size),
            playfield_width: PLAYFIELD_WIDTH,
        }
    }

    #[inline(always)]
    pub fn half_catch_width(&self) -> f32 {
        self.catch_width / 2.0
    }

    #[inline(always)]
    pub fn start_x(&self) -> f32 {
        self.playfield_width / 2.0
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.walk_speed > 0.0 && self.walk_speed.is_finite()) {
            return Err(PlanError::InvalidAgent("walk speed must be positive"));
        }
        if !(self.dash_speed > self.walk_speed && self.dash_speed.is_finite()) {
            return Err(PlanError::InvalidAgent("dash speed must exceed walk speed"));
        }
        if !(self.catch_width > 0.0 && self.catch_width.is_finite()) {
            return Err(PlanError::InvalidAgent("catch width must be positive"));
        }
        if !(self.playfield_width > 0.0 && self.playfield_width.is_finite()) {
            return Err(PlanError::InvalidAgent("playfield width must be positive"));
        }
        Ok(())
    }
}

/// Best score still obtainable from each position at one decision time.
#[derive(Clone, Debug)]
struct ScoreStep {
    time: f64,
    score: StepFunction,
}

#[derive(Clone, Debug)]
pub struct Plan {
    pub replay: Replay,
    /// Total score the replay is expected to collect.
    pub expected_score: i32,
}

/// Plans a score-optimal catcher trajectory for `objects`.
///
/// Objects need not be sorted. The returned replay starts with the catcher
/// resting at the playfield centre.
pub fn plan(objects: &[CatchObject], agent: &AgentModel) -> Result<Plan, PlanError> {
    agent.validate()?;
    if objects.is_empty() {
        return Err(PlanError::EmptyTimeline);
    }
    if let Some(index) = objects.iter().position(|o| !o.is_finite()) {
        return Err(PlanError::NonFiniteObject { index });
    }

    let received = objects.len();
    let objects = catch_object::prepare_timeline(objects);
    let steps = build_score_steps(&objects, agent)?;
    debug!(
        "Built {} score steps for {received} objects ({} after hyperdash filtering).",
        steps.len(),
        objects.len()
    );
    choose_positions(&objects, &steps, agent)
}

/// Backward pass. Returns one step per distinct object time, in time order,
/// followed by the empty step after the last object.
fn build_score_steps(
    objects: &[CatchObject],
    agent: &AgentModel,
) -> Result<Vec<ScoreStep>, PlanError> {
    let last = objects.last().ok_or(PlanError::EmptyTimeline)?;
    let half_width = agent.half_catch_width();

    // Built back to front; reversed at the end. The trailing step must be
    // strictly later than every object, even where `+ 1.0` is absorbed.
    let mut steps = vec![ScoreStep {
        time: (last.time + 1.0).max(last.time.next_up()),
        score: StepFunction::new(0.0, agent.playfield_width)?,
    }];

    for obj in objects.iter().rev() {
        let head = &steps[steps.len() - 1];
        if obj.time != head.time {
            let reach = (agent.dash_speed * (head.time - obj.time)) as f32;
            // Window max keeps the result inside the playfield domain.
            let score = if reach > 0.0 {
                head.score.sliding_window_max(reach)?
            } else {
                head.score.clone()
            };
            steps.push(ScoreStep { time: obj.time, score });
        }

        let n = steps.len();
        if let Some(target) = obj.hyper_dash_target {
            // Catching a hyperdash throws the catcher to the target, so the
            // catch area is worth whatever is reachable from there.
            let distance = (target - obj.x).abs();
            if distance > 0.0 {
                let best = steps[n - 2].score.max(obj.x - distance, obj.x + distance);
                steps[n - 1].score.set(obj.x - half_width, obj.x + half_width, best);
            }
        }
        steps[n - 1]
            .score
            .add(obj.x - half_width, obj.x + half_width, obj.score_value());
    }

    steps.reverse();
    if log::log_enabled!(log::Level::Trace) {
        for step in &steps {
            trace!("t={}ms: {}", step.time, step.score);
        }
    }
    Ok(steps)
}

/// Forward pass: pick a position per step and emit the movement to it.
fn choose_positions(
    objects: &[CatchObject],
    steps: &[ScoreStep],
    agent: &AgentModel,
) -> Result<Plan, PlanError> {
    let half_width = agent.half_catch_width();
    let settle_at = SETTLE_AT_MS.min(objects[0].time - SETTLE_LEAD_MS);

    let mut mover = Mover::new(agent, agent.start_x(), settle_at + SETTLE_FROM_MS - SETTLE_AT_MS);
    mover.move_to(agent.start_x(), settle_at);

    let mut expected_score = None;
    let mut hyper_dash_distance = 0.0_f32;
    let mut pending = objects.iter().peekable();

    // The trailing step only seeds the backward pass.
    for step in &steps[..steps.len() - 1] {
        let reach = if hyper_dash_distance > 0.0 {
            hyper_dash_distance
        } else {
            (agent.dash_speed * (step.time - mover.time)) as f32
        };
        let (lo, up) = (mover.x - reach, mover.x + reach);
        let best = step.score.max(lo, up);
        expected_score.get_or_insert(best);

        // Standing still is enough when it keeps the maximum off a boundary.
        // Otherwise go where the most error is tolerated.
        let next_x = if !(lo < up) || step.score.distance_to_smaller(mover.x, best)? > 0.0 {
            mover.x
        } else {
            step.score.optimal_point(lo, up)?
        };
        trace!(
            "t={}ms: range [{lo}, {up}] best {best}, {} -> {next_x}",
            step.time, mover.x
        );
        mover.move_to(next_x, step.time);

        hyper_dash_distance = 0.0;
        while let Some(obj) = pending.next_if(|o| o.time <= step.time) {
            hyper_dash_distance = match obj.hyper_dash_target {
                Some(target) if (mover.x - obj.x).abs() <= half_width => (target - mover.x).abs(),
                _ => 0.0,
            };
        }
    }

    let expected_score = expected_score.unwrap_or_default();
    debug!(
        "Planned {} replay frames, expected score {expected_score}, top speed {:.3}.",
        mover.replay.len(),
        mover.replay.max_speed()
    );
    Ok(Plan { replay: mover.replay, expected_score })
}

/// Emits frames moving the catcher between decision points.
struct Mover {
    walk_speed: f64,
    dash_speed: f64,
    x: f32,
    time: f64,
    replay: Replay,
}

impl Mover {
    fn new(agent: &AgentModel, x: f32, time: f64) -> Self {
        Self {
            walk_speed: agent.walk_speed,
            dash_speed: agent.dash_speed,
            x,
            time,
            replay: Replay::default(),
        }
    }

    /// Reaches `target` exactly at `time`: walk when walking is fast enough,
    /// otherwise dash first and walk the remainder. A move that is too far
    /// even for dashing (a hyperdash) becomes a single dashing frame.
    fn move_to(&mut self, target: f32, time: f64) {
        let distance = f64::from((target - self.x).abs());
        let available = time - self.time;

        if available <= 0.0 {
            self.replay.push(time, target, distance > 0.0);
        } else if distance / available > self.walk_speed {
            let dash_time =
                (distance - self.walk_speed * available) / (self.dash_speed - self.walk_speed);
            if dash_time <= available {
                let mid = self.x + (target - self.x).signum() * (dash_time * self.dash_speed) as f32;
                self.replay.push(self.time + dash_time, mid, true);
                self.replay.push(time, target, false);
            } else {
                self.replay.push(time, target, true);
            }
        } else {
            self.replay.push(self.time + distance / self.walk_speed, target, false);
            self.replay.push(time, target, false);
        }

        self.time = time;
        self.x = target;
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentModel, PlanError, plan};
    use crate::game::catch_object::{CatchObject, ObjectKind};
    use crate::game::replay::Replay;

    fn agent(catch_width: f32) -> AgentModel {
        AgentModel {
            walk_speed: 0.5,
            dash_speed: 1.0,
            catch_width,
            playfield_width: 512.0,
        }
    }

    fn assert_never_faster_than_dash(replay: &Replay, dash_speed: f64) {
        assert!(
            replay.max_speed() <= dash_speed + 1e-3,
            "impossible movement: {replay:?}"
        );
        for w in replay.frames.windows(2) {
            assert!(w[0].time <= w[1].time, "frames go back in time: {w:?}");
            if w[0].time == w[1].time {
                assert!((w[1].x - w[0].x).abs() < 1e-3, "teleport at {}: {w:?}", w[0].time);
            }
        }
    }

    #[test]
    fn catches_three_fruits_without_impossible_movement() {
        let objects = [
            CatchObject::fruit(0.0, 0.0),
            CatchObject::fruit(500.0, 400.0),
            CatchObject::fruit(1000.0, 0.0),
        ];
        let agent = agent(80.0);
        let plan = plan(&objects, &agent).unwrap();

        assert_eq!(plan.expected_score, 900);
        for obj in &objects {
            let x = plan.replay.position_at(obj.time).unwrap();
            assert!((x - obj.x).abs() <= 80.0, "missed {obj:?} at {x}");
            assert!((x - obj.x).abs() <= agent.half_catch_width());
        }
        assert_never_faster_than_dash(&plan.replay, agent.dash_speed);
        assert!(plan.replay.frames.iter().any(|f| f.dashing));
    }

    #[test]
    fn prefers_the_centre_of_the_catch_area() {
        let objects = [CatchObject::fruit(0.0, 0.0), CatchObject::fruit(500.0, 400.0)];
        let plan = plan(&objects, &agent(80.0)).unwrap();
        // Against the wall the robust spot is halfway into the catch area.
        assert_eq!(plan.replay.position_at(0.0), Some(20.0));
        assert_eq!(plan.replay.position_at(500.0), Some(400.0));
    }

    #[test]
    fn stays_put_when_already_optimal() {
        let objects = [
            CatchObject::fruit(1000.0, 256.0),
            CatchObject::fruit(2000.0, 270.0),
        ];
        let plan = plan(&objects, &agent(80.0)).unwrap();
        assert!(plan.replay.frames.iter().all(|f| f.x == 256.0), "{:?}", plan.replay);
        assert_eq!(plan.expected_score, 600);
    }

    #[test]
    fn trades_a_far_fruit_for_reachable_ones() {
        // The first fruit is out of reach of the second pair; the pair wins.
        let objects = [
            CatchObject::fruit(0.0, 10.0),
            CatchObject::fruit(100.0, 500.0),
            CatchObject::fruit(100.0, 500.0),
        ];
        let plan = plan(&objects, &agent(60.0)).unwrap();
        assert_eq!(plan.expected_score, 600);
        let x = plan.replay.position_at(100.0).unwrap();
        assert!((x - 500.0).abs() <= 30.0);
        assert_never_faster_than_dash(&plan.replay, 1.0);
    }

    #[test]
    fn hyper_dash_reaches_otherwise_unreachable_fruit() {
        let objects = [
            CatchObject::fruit(0.0, 0.0).with_hyper_dash(500.0),
            CatchObject::fruit(100.0, 500.0),
        ];
        let plan = plan(&objects, &agent(80.0)).unwrap();
        assert_eq!(plan.expected_score, 600);

        let x = plan.replay.position_at(100.0).unwrap();
        assert!((x - 500.0).abs() <= 40.0, "landed at {x}");
        let last = plan.replay.frames.last().unwrap();
        assert_eq!(last.time, 100.0);
        assert!(last.dashing);
    }

    #[test]
    fn short_hyper_dash_hop_is_walked() {
        let objects = [
            CatchObject::fruit(0.0, 256.0).with_hyper_dash(266.0),
            CatchObject::fruit(100.0, 300.0),
        ];
        let plan = plan(&objects, &agent(85.4)).unwrap();
        assert_eq!(plan.expected_score, 600);

        let last = plan.replay.frames.last().unwrap();
        assert_eq!((last.time, last.x), (100.0, 266.0));
        assert!(plan.replay.frames.iter().all(|f| !f.dashing), "{:?}", plan.replay);
    }

    #[test]
    fn huge_object_times_still_get_a_step() {
        let agent = agent(80.0);
        let single = plan(&[CatchObject::fruit(1e17, 100.0)], &agent).unwrap();
        assert_eq!(single.expected_score, 300);
        let last = single.replay.frames.last().unwrap();
        assert_eq!(last.time, 1e17);
        assert!((last.x - 100.0).abs() <= agent.half_catch_width());

        let hyper = plan(&[CatchObject::fruit(1e17, 0.0).with_hyper_dash(100.0)], &agent).unwrap();
        assert_eq!(hyper.expected_score, 300);
    }

    #[test]
    fn droplets_count_towards_expected_score() {
        let objects = [
            CatchObject::fruit(0.0, 200.0),
            CatchObject::new(50.0, 210.0, ObjectKind::Droplet),
            CatchObject::new(75.0, 215.0, ObjectKind::TinyDroplet),
            CatchObject::fruit(100.0, 220.0),
        ];
        let plan = plan(&objects, &agent(80.0)).unwrap();
        assert_eq!(plan.expected_score, 621);
    }

    #[test]
    fn planning_is_deterministic() {
        let objects = [
            CatchObject::fruit(0.0, 50.0),
            CatchObject::fruit(300.0, 450.0),
            CatchObject::new(400.0, 300.0, ObjectKind::Droplet),
            CatchObject::fruit(700.0, 100.0).with_hyper_dash(480.0),
            CatchObject::fruit(800.0, 480.0),
        ];
        let first = plan(&objects, &AgentModel::default()).unwrap();
        let second = plan(&objects, &AgentModel::default()).unwrap();
        assert_eq!(first.replay, second.replay);
        assert_eq!(first.expected_score, second.expected_score);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(plan(&[], &agent(80.0)), Err(PlanError::EmptyTimeline)));
        assert!(matches!(
            plan(&[CatchObject::fruit(f64::NAN, 0.0)], &agent(80.0)),
            Err(PlanError::NonFiniteObject { index: 0 })
        ));
        let slow_dash = AgentModel { dash_speed: 0.25, ..agent(80.0) };
        assert!(matches!(
            plan(&[CatchObject::fruit(0.0, 0.0)], &slow_dash),
            Err(PlanError::InvalidAgent(_))
        ));
    }
}

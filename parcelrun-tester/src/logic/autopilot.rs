//! Scripted driver standing in for physics and input.
//!
//! The autopilot drives a headless [`GameSession`] through whole days: it
//! "travels" to the assigned target for a random stretch of time, rolls for
//! collisions and repair kits on the way, docks by feeding proximity speed
//! samples, and then steers the skill-check needle according to its
//! [`DrivingStyle`]. After every tick it checks the session invariants.

use anyhow::Result;
use parcelrun_game::{
    Collision, EventKind, GameEvent, GameSession, MemoryScoreStore, MinigamePhase, ObstacleKind,
    ScoreRecord, SessionState, TargetId, TickInput, World, WorldPosition,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub const DEFAULT_TICK_RATE: f32 = 30.0;
pub const DEFAULT_MAX_TICKS: u32 = 30 * 60 * 30;
const WORLD_TARGETS: u32 = 8;
const WORLD_ZONES: u32 = 12;
const MAX_RESTARTS: u32 = 50;

/// How the autopilot handles the road and the needle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrivingStyle {
    /// Chases the safe zone and avoids most obstacles.
    Careful,
    /// Slams into hard obstacles and ignores repair kits.
    Reckless,
    /// Random needle input, average luck on the road.
    Erratic,
}

impl DrivingStyle {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Careful => "Careful",
            Self::Reckless => "Reckless",
            Self::Erratic => "Erratic",
        }
    }

    /// Collision chance per second of travel.
    const fn collision_rate(self) -> f64 {
        match self {
            Self::Careful => 0.01,
            Self::Reckless => 0.4,
            Self::Erratic => 0.08,
        }
    }

    const fn repair_kit_rate(self) -> f64 {
        match self {
            Self::Careful => 0.2,
            Self::Reckless => 0.0,
            Self::Erratic => 0.05,
        }
    }

    fn collision(self, rng: &mut ChaCha20Rng) -> Collision {
        match self {
            Self::Reckless => Collision {
                obstacle: ObstacleKind::Hard,
                impact_speed: rng.gen_range(6.0..12.0),
            },
            Self::Careful | Self::Erratic => Collision {
                obstacle: if rng.gen_bool(0.5) {
                    ObstacleKind::Soft
                } else {
                    ObstacleKind::Hard
                },
                impact_speed: rng.gen_range(0.5..6.0),
            },
        }
    }

    fn steer(self, rng: &mut ChaCha20Rng, needle: f32, velocity: f32, center: f32) -> f32 {
        match self {
            Self::Careful => ((center - needle) / 40.0 - velocity / 120.0).clamp(-1.0, 1.0),
            Self::Reckless => ((center - needle) / 200.0).clamp(-1.0, 1.0),
            Self::Erratic => rng.gen_range(-1.0..=1.0),
        }
    }
}

/// Assertion hook run after an autopilot run completes.
type RunExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct RunExpectation(RunExpectationFn);

impl std::fmt::Debug for RunExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunExpectation").finish()
    }
}

impl RunExpectation {
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for RunExpectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// What an autopilot run should do and what it must satisfy.
#[derive(Debug, Clone)]
pub struct AutopilotPlan {
    pub style: DrivingStyle,
    pub days: u32,
    pub max_ticks: u32,
    pub tick_rate: f32,
    pub verify_replay: bool,
    pub expectations: Vec<RunExpectation>,
}

impl AutopilotPlan {
    #[must_use]
    pub const fn new(style: DrivingStyle, days: u32) -> Self {
        Self {
            style,
            days,
            max_ticks: DEFAULT_MAX_TICKS,
            tick_rate: DEFAULT_TICK_RATE,
            verify_replay: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Run every seed twice and require identical summaries.
    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.verify_replay = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<RunExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Complete record of an autopilot run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: u32,
    pub records: Vec<ScoreRecord>,
    pub tips: Vec<u32>,
    pub failed_deliveries: u32,
    pub collisions: u32,
    pub destructions: u32,
    pub repair_kits: u32,
    pub biome_changes: u32,
    pub restarts: u32,
    pub violations: Vec<String>,
    pub halted: bool,
}

impl RunSummary {
    #[must_use]
    pub fn days_completed(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.tips.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum Leg {
    Travel { target: TargetId, remaining: f32 },
    SkillCheck { target: TargetId },
}

#[derive(Debug, Default)]
struct EventTally {
    tips: Vec<u32>,
    failed: u32,
    collisions: u32,
    destructions: u32,
    biome_changes: u32,
}

/// Headless deterministic runner for the session logic.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    verbose: bool,
}

impl Autopilot {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_plan(&self, plan: &AutopilotPlan, seed: u64) -> RunSummary {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let world = random_world(&mut rng);
        let store = MemoryScoreStore::new();
        let mut summary = RunSummary {
            seed,
            ..RunSummary::default()
        };

        let session = match GameSession::with_defaults(world, store.clone(), seed) {
            Ok(session) => session,
            Err(err) => {
                summary.violations.push(format!("session refused to start: {err}"));
                summary.halted = true;
                return summary;
            }
        };
        let tally = subscribe_tally(&session);
        let dt = 1.0 / plan.tick_rate;
        let days_wanted = usize::try_from(plan.days).unwrap_or(usize::MAX);
        let mut leg: Option<Leg> = None;

        while store.records().len() < days_wanted {
            if summary.ticks >= plan.max_ticks {
                summary.halted = true;
                break;
            }

            if !session.snapshot().is_day_active() {
                leg = None;
                if summary.restarts > MAX_RESTARTS {
                    summary.violations.push("vehicle kept getting destroyed".to_string());
                    summary.halted = true;
                    break;
                }
                let destroyed = tally.borrow().destructions > summary.restarts;
                let started = if destroyed {
                    summary.restarts += 1;
                    session.restart_day()
                } else {
                    session.start_day()
                };
                if let Err(err) = started {
                    summary.violations.push(format!("day failed to start: {err}"));
                    summary.halted = true;
                    break;
                }
                log::debug!("seed {seed}: day {} started", session.snapshot().current_day());
                if self.verbose && destroyed {
                    println!(
                        "  🔧 Seed {seed}: vehicle destroyed, replaying day {}",
                        session.snapshot().current_day()
                    );
                }
            }

            let mut input = TickInput::default();
            leg = match leg {
                None => session.snapshot().assigned_target().map(|target| Leg::Travel {
                    target,
                    remaining: rng.gen_range(1.5..5.0),
                }),
                Some(Leg::Travel { target, remaining }) => {
                    roll_road_events(&session, plan.style, &mut rng, dt, &mut summary);
                    if remaining > dt {
                        Some(Leg::Travel {
                            target,
                            remaining: remaining - dt,
                        })
                    } else {
                        dock(&session, target);
                        Some(Leg::SkillCheck { target })
                    }
                }
                Some(Leg::SkillCheck { target }) => match session.minigame_snapshot() {
                    Some(check) => {
                        if check.phase() == MinigamePhase::Active {
                            input.steer_axis = plan.style.steer(
                                &mut rng,
                                check.needle_position(),
                                check.needle_velocity(),
                                check.safe_zone_center(),
                            );
                        }
                        Some(Leg::SkillCheck { target })
                    }
                    None => {
                        session.vehicle_exited(target);
                        None
                    }
                },
            };

            session.tick(dt, &input);
            summary.ticks += 1;

            let state = session.snapshot();
            for violation in check_invariants(&state) {
                summary
                    .violations
                    .push(format!("tick {}: {violation}", summary.ticks));
            }
            if summary.violations.len() > 20 {
                summary.halted = true;
                break;
            }
        }

        let tally = tally.borrow();
        summary.records = store.records();
        summary.tips.clone_from(&tally.tips);
        summary.failed_deliveries = tally.failed;
        summary.collisions = tally.collisions;
        summary.destructions = tally.destructions;
        summary.biome_changes = tally.biome_changes;
        summary
    }
}

fn random_world(rng: &mut ChaCha20Rng) -> World {
    let positions: Vec<WorldPosition> = (0..WORLD_TARGETS)
        .map(|_| {
            WorldPosition::new(
                rng.gen_range(-200.0..200.0),
                0.0,
                rng.gen_range(-200.0..200.0),
            )
        })
        .collect();
    World::from_positions(&positions, WORLD_ZONES)
}

fn subscribe_tally(session: &GameSession<MemoryScoreStore>) -> Rc<RefCell<EventTally>> {
    let tally = Rc::new(RefCell::new(EventTally::default()));
    for kind in [
        EventKind::DeliveryCompleted,
        EventKind::DeliveryFailed,
        EventKind::VehicleCollidedWithObstacle,
        EventKind::VehicleDestroyed,
        EventKind::BiomeChanged,
    ] {
        let sink = Rc::clone(&tally);
        session.subscribe(kind, move |event, _| {
            let mut tally = sink.borrow_mut();
            match event {
                GameEvent::DeliveryCompleted { tip, .. } => tally.tips.push(*tip),
                GameEvent::DeliveryFailed { .. } => tally.failed += 1,
                GameEvent::VehicleCollidedWithObstacle { .. } => tally.collisions += 1,
                GameEvent::VehicleDestroyed => tally.destructions += 1,
                GameEvent::BiomeChanged { .. } => tally.biome_changes += 1,
                _ => {}
            }
        });
    }
    tally
}

fn roll_road_events(
    session: &GameSession<MemoryScoreStore>,
    style: DrivingStyle,
    rng: &mut ChaCha20Rng,
    dt: f32,
    summary: &mut RunSummary,
) {
    let dt = f64::from(dt);
    if rng.gen_bool((style.collision_rate() * dt).min(1.0)) {
        session.obstacle_collision(style.collision(rng));
    }
    let worn = session.snapshot().vehicle_health() < 0.6;
    if worn && rng.gen_bool((style.repair_kit_rate() * dt).min(1.0)) {
        session.collect_repair_kit();
        summary.repair_kits += 1;
    }
}

/// Roll into the target volume, brake and press interact.
fn dock(session: &GameSession<MemoryScoreStore>, target: TargetId) {
    session.vehicle_entered(target);
    for speed in [4.0, 1.2, 0.3, 0.05] {
        session.vehicle_speed(target, speed);
    }
    session.interact_pressed();
}

/// Session invariants that must hold after every tick.
#[must_use]
pub fn check_invariants(state: &SessionState) -> Vec<String> {
    let mut violations = Vec::new();
    if state.completed_today() > state.targets_for_day() {
        violations.push(format!(
            "completed {} exceeds quota {}",
            state.completed_today(),
            state.targets_for_day()
        ));
    }
    if state.is_minigame_active() && !state.is_day_active() {
        violations.push("skill-check running outside a day".to_string());
    }
    if !(0.0..=1.0).contains(&state.vehicle_health()) {
        violations.push(format!("health {} out of range", state.vehicle_health()));
    }
    if state.is_day_active() && state.assigned_target().is_none() {
        violations.push("day running without an assigned target".to_string());
    }
    if !state.is_day_active() && state.assigned_target().is_some() {
        violations.push("target assigned between days".to_string());
    }
    if !state.total_time_today().is_finite() || state.total_time_today() < 0.0 {
        violations.push(format!("day timer {} invalid", state.total_time_today()));
    }
    violations
}

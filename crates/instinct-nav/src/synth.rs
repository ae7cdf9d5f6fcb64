use instinct_core::{AgentId, Vec3};
use thiserror::Error;
use tracing::debug;

use crate::{NavPath, NavWorld};

/// Sample radii tried by [`try_move_agent`], as multiples of the requested radius.
pub const SAMPLE_RADIUS_MULTIPLIERS: [f32; 3] = [1.0, 1.5, 2.25];

pub const MIN_SAMPLE_RADIUS: f32 = 0.35;

/// Why a move request was not committed.
///
/// Every variant means "stay put this tick"; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavFailure {
    #[error("agent has no pose")]
    MissingPose,
    #[error("agent has no motion actuator")]
    MissingActuator,
    #[error("no walkable point within {radius:.2}m of the target")]
    NoWalkableSample { radius: f32 },
    #[error("no acceptable path to the target")]
    Unreachable,
    #[error("path length {length:.2}m exceeds budget {budget:.2}m")]
    OverBudget { length: f32, budget: f32 },
}

impl NavFailure {
    /// Agent-level integration problem rather than ordinary inability to move.
    pub fn is_integration_error(&self) -> bool {
        matches!(self, NavFailure::MissingPose | NavFailure::MissingActuator)
    }

    // Later ladder stages are more informative than earlier ones.
    fn stage(&self) -> u8 {
        match self {
            NavFailure::MissingPose | NavFailure::MissingActuator => 0,
            NavFailure::NoWalkableSample { .. } => 1,
            NavFailure::Unreachable => 2,
            NavFailure::OverBudget { .. } => 3,
        }
    }
}

/// A request to walk toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub target: Vec3,
    pub sample_radius: f32,
    /// Longest acceptable path; non-positive disables the check.
    pub max_path_length: f32,
    pub speed: f32,
    pub acceleration: Option<f32>,
    pub stopping_distance: Option<f32>,
    pub allow_partial: bool,
}

impl MoveRequest {
    pub fn new(target: Vec3, sample_radius: f32, max_path_length: f32, speed: f32) -> Self {
        Self {
            target,
            sample_radius,
            max_path_length,
            speed,
            acceleration: None,
            stopping_distance: None,
            allow_partial: false,
        }
    }

    pub fn acceleration(mut self, acceleration: f32) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn stopping_distance(mut self, distance: f32) -> Self {
        self.stopping_distance = Some(distance);
        self
    }

    pub fn allow_partial(mut self) -> Self {
        self.allow_partial = true;
        self
    }
}

/// What was committed to the actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct NavCommit {
    pub destination: Vec3,
    pub path_length: f32,
    pub sample_radius: f32,
    pub partial: bool,
}

/// Snap `request.target` onto walkable ground, path to it and commit the path.
///
/// Each radius in [`SAMPLE_RADIUS_MULTIPLIERS`] is tried in order and the first
/// candidate that passes every filter wins. On any failure the actuator is left
/// untouched.
pub fn try_move_agent<W>(
    world: &mut W,
    agent: W::Agent,
    request: &MoveRequest,
) -> Result<NavCommit, NavFailure>
where
    W: NavWorld,
{
    let result = plan(world, agent, request).and_then(|(path, commit)| {
        let actuator = world
            .actuator_mut(agent)
            .ok_or(NavFailure::MissingActuator)?;
        actuator.set_speed(request.speed.max(0.1));
        if let Some(acceleration) = request.acceleration.filter(|a| *a > 0.0) {
            actuator.set_acceleration(acceleration);
        }
        if let Some(distance) = request.stopping_distance.filter(|d| *d >= 0.0) {
            actuator.set_stopping_distance(distance);
        }
        actuator.set_auto_braking(false);
        actuator.set_path(path);
        Ok(commit)
    });

    if let Err(failure) = &result {
        debug!(
            agent = agent.stable_id(),
            reason = %failure,
            "navigation request rejected"
        );
    }
    result
}

fn plan<W>(
    world: &W,
    agent: W::Agent,
    request: &MoveRequest,
) -> Result<(NavPath, NavCommit), NavFailure>
where
    W: NavWorld,
{
    let origin = world
        .pose(agent)
        .map(|pose| pose.position)
        .filter(|p| p.is_known())
        .ok_or(NavFailure::MissingPose)?;
    if world.actuator(agent).is_none() {
        return Err(NavFailure::MissingActuator);
    }

    let base_radius = request.sample_radius.max(MIN_SAMPLE_RADIUS);
    let mut failure = NavFailure::NoWalkableSample {
        radius: base_radius * SAMPLE_RADIUS_MULTIPLIERS[SAMPLE_RADIUS_MULTIPLIERS.len() - 1],
    };
    if !request.target.is_known() {
        return Err(failure);
    }

    let navigator = world.navigator();
    for multiplier in SAMPLE_RADIUS_MULTIPLIERS {
        let radius = base_radius * multiplier;
        let Some(destination) = navigator.sample_position(request.target, radius) else {
            continue;
        };

        let attempt = match navigator.find_path(origin, destination) {
            None => Err(NavFailure::Unreachable),
            Some(path) if !path.is_complete() && !request.allow_partial => {
                Err(NavFailure::Unreachable)
            }
            Some(path) => {
                let length = path.length();
                if request.max_path_length > 0.0 && length > request.max_path_length {
                    Err(NavFailure::OverBudget {
                        length,
                        budget: request.max_path_length,
                    })
                } else {
                    Ok(path)
                }
            }
        };

        match attempt {
            Ok(path) => {
                let commit = NavCommit {
                    destination,
                    path_length: path.length(),
                    sample_radius: radius,
                    partial: !path.is_complete(),
                };
                return Ok((path, commit));
            }
            Err(err) => {
                if err.stage() >= failure.stage() {
                    failure = err;
                }
            }
        }
    }

    Err(failure)
}

/// Sum of distances between consecutive corners; zero for fewer than two.
pub fn estimate_path_length(corners: &[Vec3]) -> f32 {
    corners
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).length())
        .sum()
}

/// Stable per-agent spread on the XZ plane, at most `radius` long.
///
/// Agents chasing the same point each aim at a slightly different spot.
pub fn agent_offset(hash: u64, radius: f32) -> Vec3 {
    if !(radius > 0.0) {
        return Vec3::ZERO;
    }
    let angle = ((hash % 360) as f32).to_radians();
    let scale = 0.35 + ((hash & 0xFF) as f32 / 255.0) * 0.65;
    Vec3::new(angle.cos(), 0.0, angle.sin()) * (radius * scale)
}

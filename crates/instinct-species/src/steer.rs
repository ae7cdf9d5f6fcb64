//! Movement helpers shared by every module.

use instinct_bt::{BtStatus, EvalContext};
use instinct_core::Vec3;
use instinct_nav::{agent_offset, try_move_agent, MoveRequest};

use crate::InstinctWorld;

pub const IDLE: &str = "Idle";

/// Commit `request` and label the action on success. Failure leaves the actuator as is.
pub fn move_to<W>(ctx: &mut EvalContext<'_, W>, label: &'static str, request: MoveRequest) -> bool
where
    W: InstinctWorld,
{
    match try_move_agent(&mut *ctx.world, ctx.agent, &request) {
        Ok(_) => {
            ctx.set_active_action(label);
            true
        }
        Err(_) => false,
    }
}

/// [`move_to`] mapped onto the usual "running or failed" action result.
pub fn move_or_fail<W>(ctx: &mut EvalContext<'_, W>, label: &'static str, request: MoveRequest) -> BtStatus
where
    W: InstinctWorld,
{
    if move_to(ctx, label, request) {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

/// Drop the committed path and pin the speed. No-op without an actuator.
pub fn halt<W>(ctx: &mut EvalContext<'_, W>, speed: f32)
where
    W: InstinctWorld,
{
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        actuator.reset_path();
        actuator.set_speed(speed);
    }
}

/// Per-agent spread so agents converging on one point do not stack.
pub fn spread<W>(ctx: &EvalContext<'_, W>, radius: f32) -> Vec3
where
    W: InstinctWorld,
{
    agent_offset(ctx.stable_id(), radius)
}

/// Final fallback of every tree. Never fails.
pub fn idle<W>(ctx: &mut EvalContext<'_, W>) -> BtStatus
where
    W: InstinctWorld,
{
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        if actuator.has_path() {
            actuator.reset_path();
        }
    }
    ctx.set_active_action(IDLE);
    BtStatus::Running
}

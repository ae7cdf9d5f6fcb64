use instinct_core::WorldView;

use crate::bt::{BtNode, BtStatus};
use crate::EvalContext;

/// Pure predicate over the context. Must not write anything.
pub type Predicate<W> = fn(&EvalContext<'_, W>) -> bool;

/// Predicate that is allowed to record what it observed.
pub type ObservingPredicate<W> = fn(&mut EvalContext<'_, W>) -> bool;

pub type ActionFn<W> = fn(&mut EvalContext<'_, W>) -> BtStatus;

/// Ticks children in order and returns the first result that is not `Failure`.
pub struct PrioritySelector<W>
where
    W: WorldView + 'static,
{
    name: &'static str,
    children: Vec<Box<dyn BtNode<W>>>,
}

impl<W> PrioritySelector<W>
where
    W: WorldView + 'static,
{
    pub fn new(name: &'static str, children: Vec<Box<dyn BtNode<W>>>) -> Self {
        Self { name, children }
    }

    pub fn children(&self) -> &[Box<dyn BtNode<W>>] {
        &self.children
    }
}

impl<W> BtNode<W> for PrioritySelector<W>
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        for child in &self.children {
            match child.tick(ctx) {
                BtStatus::Failure => continue,
                status => return status,
            }
        }
        BtStatus::Failure
    }
}

/// Ticks children in order and stops at the first result that is not `Success`.
pub struct Sequence<W>
where
    W: WorldView + 'static,
{
    name: &'static str,
    children: Vec<Box<dyn BtNode<W>>>,
}

impl<W> Sequence<W>
where
    W: WorldView + 'static,
{
    pub fn new(name: &'static str, children: Vec<Box<dyn BtNode<W>>>) -> Self {
        Self { name, children }
    }

    pub fn children(&self) -> &[Box<dyn BtNode<W>>] {
        &self.children
    }
}

impl<W> BtNode<W> for Sequence<W>
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        for child in &self.children {
            match child.tick(ctx) {
                BtStatus::Success => continue,
                status => return status,
            }
        }
        BtStatus::Success
    }
}

pub struct Condition<W>
where
    W: WorldView + 'static,
{
    name: &'static str,
    predicate: Predicate<W>,
}

impl<W> Condition<W>
where
    W: WorldView + 'static,
{
    pub fn new(name: &'static str, predicate: Predicate<W>) -> Self {
        Self { name, predicate }
    }
}

impl<W> BtNode<W> for Condition<W>
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        BtStatus::from_bool((self.predicate)(&*ctx))
    }
}

/// A condition with a documented write side effect.
///
/// Some checks record what they saw (e.g. latching an "observed" buffer while testing
/// whether the agent is observed). Keeping them a separate node kind makes every such
/// write visible in the tree definition.
pub struct ObservingCondition<W>
where
    W: WorldView + 'static,
{
    name: &'static str,
    check: ObservingPredicate<W>,
}

impl<W> ObservingCondition<W>
where
    W: WorldView + 'static,
{
    pub fn new(name: &'static str, check: ObservingPredicate<W>) -> Self {
        Self { name, check }
    }
}

impl<W> BtNode<W> for ObservingCondition<W>
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        BtStatus::from_bool((self.check)(ctx))
    }
}

pub struct Action<W>
where
    W: WorldView + 'static,
{
    name: &'static str,
    run: ActionFn<W>,
}

impl<W> Action<W>
where
    W: WorldView + 'static,
{
    pub fn new(name: &'static str, run: ActionFn<W>) -> Self {
        Self { name, run }
    }
}

impl<W> BtNode<W> for Action<W>
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        (self.run)(ctx)
    }
}

pub fn selector<W>(name: &'static str, children: Vec<Box<dyn BtNode<W>>>) -> Box<dyn BtNode<W>>
where
    W: WorldView + 'static,
{
    Box::new(PrioritySelector::new(name, children))
}

pub fn sequence<W>(name: &'static str, children: Vec<Box<dyn BtNode<W>>>) -> Box<dyn BtNode<W>>
where
    W: WorldView + 'static,
{
    Box::new(Sequence::new(name, children))
}

pub fn condition<W>(name: &'static str, predicate: Predicate<W>) -> Box<dyn BtNode<W>>
where
    W: WorldView + 'static,
{
    Box::new(Condition::new(name, predicate))
}

pub fn observing_condition<W>(
    name: &'static str,
    check: ObservingPredicate<W>,
) -> Box<dyn BtNode<W>>
where
    W: WorldView + 'static,
{
    Box::new(ObservingCondition::new(name, check))
}

pub fn action<W>(name: &'static str, run: ActionFn<W>) -> Box<dyn BtNode<W>>
where
    W: WorldView + 'static,
{
    Box::new(Action::new(name, run))
}

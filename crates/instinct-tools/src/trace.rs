#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Well-known event tags.
pub mod tags {
    pub const ATTACH: &str = "agent.attach";
    pub const DETACH: &str = "agent.detach";
    /// `detail` holds the new active action label.
    pub const ACTION: &str = "agent.action";
    /// The root returned Failure: a tree is missing its guaranteed leaf.
    pub const ROOT_FAILURE: &str = "agent.root_failure";
    pub const TICK_ERROR: &str = "agent.tick_error";
}

/// One recorded decision.
///
/// Plain data so it can be recorded during simulation and rendered later by tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    /// Stable id of the agent the event is about.
    pub agent: u64,
    pub detail: Option<Cow<'static, str>>,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            agent: 0,
            detail: None,
        }
    }

    pub fn with_agent(mut self, agent: u64) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<Cow<'static, str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |event| event.tag == tag)
    }

    /// Action labels an agent switched to, in order.
    pub fn actions_of(&self, agent: u64) -> Vec<&str> {
        self.with_tag(tags::ACTION)
            .filter(|event| event.agent == agent)
            .filter_map(|event| event.detail.as_deref())
            .collect()
    }

    /// How often each action label was entered across all agents.
    pub fn action_histogram(&self) -> BTreeMap<String, usize> {
        let mut histogram = BTreeMap::new();
        for event in self.with_tag(tags::ACTION) {
            if let Some(detail) = event.detail.as_deref() {
                *histogram.entry(detail.to_string()).or_insert(0) += 1;
            }
        }
        histogram
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Sink handle that can be given away while the caller keeps reading the log.
#[derive(Debug, Default, Clone)]
pub struct SharedTraceSink(Rc<RefCell<TraceLog>>);

impl SharedTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TraceLog {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for SharedTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

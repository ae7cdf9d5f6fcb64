//! Sand spider: fortifies a ring of choke points with webs and guards the lair.
//!
//! The spider webs every choke point on its current ring, then widens the ring until
//! it reaches past the territory. Webs the host reports as tripped or torn raise an
//! alert; the spider goes to look, searches the area, and weaves a replacement.

use std::collections::{BTreeMap, BTreeSet};

use instinct_bt::{
    action, condition, observing_condition, selector, sequence, BehaviorTree, BtStatus,
    EvalContext,
};
use instinct_core::{
    clamp01, lerp, Blackboard, BlockKey, DeterministicRng, FactBlock, LatchTimer, Species,
    TickContext, Vec3,
};
use instinct_nav::{MoveRequest, Navigator};

use crate::steer::{self, move_to, spread};
use crate::{InstinctWorld, SpeciesModule, WebId, WebSighting};

pub const SAND_SPIDER_FACTS: BlockKey<SandSpiderFacts> = BlockKey::new(9);

const MIN_PERIMETER: f32 = 6.0;
const RING_GROWTH: f32 = 5.0;
/// The ring stops growing this far past the territory edge.
const RING_OVERREACH: f32 = 10.0;
const RING_JITTER_DEGREES: f32 = 6.0;
const CHOKE_MATCH_DISTANCE: f32 = 4.0;
/// Seconds before an existing web is worth re-servicing.
pub const WEB_SERVICE_SECONDS: f32 = 45.0;
pub const URGENT_ALERT_SECONDS: f32 = 15.0;
pub const ALERT_SECONDS: f32 = 10.0;
const SEARCH_SECONDS: f32 = 10.0;
const FULL_ANGER_SECONDS: f32 = 20.0;
pub const STRIKE_DISTANCE: f32 = 1.75;
const RING_STREAM: u64 = 0x5D1;
const HIDE_STREAM: u64 = 0x5D2;
const SEARCH_STREAM: u64 = 0x5D3;

/// One spot on the ring where a web blocks a path into the lair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChokePoint {
    pub id: u32,
    pub position: Vec3,
    pub ring_radius: f32,
    pub has_web: bool,
    pub time_since_serviced: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandSpiderFacts {
    anchor: Vec3,
    perimeter: f32,
    chokes: Vec<ChokePoint>,
    next_choke: u32,
    webs: BTreeMap<WebId, Option<u32>>,
    occupied: BTreeSet<WebId>,
    hide_spot: Vec3,
    hide_refresh: LatchTimer,
    anger: LatchTimer,
    alert_position: Vec3,
    alert: LatchTimer,
    search: LatchTimer,
    searching: bool,
    fortify_target: Vec3,
    active_choke: Option<u32>,
}

impl Default for SandSpiderFacts {
    fn default() -> Self {
        Self {
            anchor: Vec3::UNKNOWN,
            perimeter: 0.0,
            chokes: Vec::new(),
            next_choke: 0,
            webs: BTreeMap::new(),
            occupied: BTreeSet::new(),
            hide_spot: Vec3::UNKNOWN,
            hide_refresh: LatchTimer::new(),
            anger: LatchTimer::new(),
            alert_position: Vec3::UNKNOWN,
            alert: LatchTimer::new(),
            search: LatchTimer::new(),
            searching: false,
            fortify_target: Vec3::UNKNOWN,
            active_choke: None,
        }
    }
}

impl FactBlock for SandSpiderFacts {
    fn name(&self) -> &'static str {
        "sand_spider"
    }

    fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.search.decay(dt);
        self.anger.decay(dt);
        self.hide_refresh.decay(dt);
        if self.alert.is_active() {
            self.alert.decay(dt);
            if !self.alert.is_active() {
                self.alert_position = Vec3::UNKNOWN;
                self.clear_search();
            }
        }
        for choke in &mut self.chokes {
            choke.time_since_serviced += dt;
        }
    }
}

impl SandSpiderFacts {
    pub fn is_fortified(&self) -> bool {
        self.anchor.is_known()
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn perimeter(&self) -> f32 {
        self.perimeter
    }

    pub fn chokes(&self) -> &[ChokePoint] {
        &self.chokes
    }

    pub fn fortify_target(&self) -> Vec3 {
        self.fortify_target
    }

    pub fn is_enraged(&self) -> bool {
        self.anger.is_active()
    }

    /// Zero when calm, one at full fury.
    pub fn aggression(&self) -> f32 {
        clamp01(self.anger.remaining() / FULL_ANGER_SECONDS)
    }

    pub fn anger(&mut self, seconds: f32) {
        self.anger.latch(seconds);
    }

    pub fn cool(&mut self, seconds: f32) {
        if seconds > 0.0 {
            self.anger.decay(seconds);
        }
    }

    pub fn alert_active(&self) -> bool {
        self.is_fortified() && self.alert.is_active() && self.alert_position.is_known()
    }

    pub fn alert_position(&self) -> Option<Vec3> {
        self.alert_active().then_some(self.alert_position)
    }

    /// Lay out the first ring around `center`. Later calls are ignored.
    pub fn ensure_fortification(
        &mut self,
        navigator: &dyn Navigator,
        rng: &mut impl DeterministicRng,
        center: Vec3,
        territory_radius: f32,
    ) {
        if self.is_fortified() || !center.is_known() {
            return;
        }
        self.anchor = center;
        self.hide_spot = center;
        self.perimeter = if territory_radius > 0.0 {
            (territory_radius * 0.75).max(MIN_PERIMETER)
        } else {
            8.0
        };
        self.build_ring(navigator, rng, self.perimeter);
    }

    fn build_ring(
        &mut self,
        navigator: &dyn Navigator,
        rng: &mut impl DeterministicRng,
        radius: f32,
    ) {
        let segments = (radius.round() as i32).clamp(6, 14);
        let increment = 360.0 / segments as f32;
        for i in 0..segments {
            let jitter = rng.next_f32_range(-RING_JITTER_DEGREES, RING_JITTER_DEGREES);
            let angle = (increment * i as f32 + jitter).to_radians();
            let guess = self.anchor + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius;
            let Some(position) = navigator.sample_position(guess, 3.5) else {
                continue;
            };
            self.chokes.push(ChokePoint {
                id: self.next_choke,
                position,
                ring_radius: radius,
                has_web: false,
                time_since_serviced: 0.0,
            });
            self.next_choke += 1;
        }
    }

    fn ring_secured(&self) -> bool {
        !self.chokes.is_empty()
            && self
                .chokes
                .iter()
                .filter(|c| c.ring_radius <= self.perimeter + 0.25)
                .all(|c| c.has_web)
    }

    /// Push the ring outward once every web on it is up.
    pub fn expand_if_secured(
        &mut self,
        navigator: &dyn Navigator,
        rng: &mut impl DeterministicRng,
        territory_radius: f32,
    ) -> bool {
        let limit = territory_radius + RING_OVERREACH;
        if !self.is_fortified() || self.perimeter >= limit || !self.ring_secured() {
            return false;
        }
        self.perimeter = (self.perimeter + RING_GROWTH).min(limit);
        self.build_ring(navigator, rng, self.perimeter);
        true
    }

    fn nearest_choke(&mut self, position: Vec3) -> Option<&mut ChokePoint> {
        self.chokes
            .iter_mut()
            .map(|c| (c.position.distance(position), c))
            .filter(|(d, _)| *d <= CHOKE_MATCH_DISTANCE)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }

    /// A web appeared at `position`; credit the choke point it covers.
    pub fn register_web(&mut self, web: WebId, position: Vec3) {
        let choke = self.nearest_choke(position).map(|c| {
            c.has_web = true;
            c.time_since_serviced = 0.0;
            c.id
        });
        self.webs.insert(web, choke);
    }

    /// Something tripped or tore a web near `position`.
    pub fn notify_disturbance(&mut self, position: Vec3, urgent: bool) {
        if !self.is_fortified() {
            return;
        }
        self.alert_position = position;
        if urgent {
            self.alert.latch(URGENT_ALERT_SECONDS);
            self.anger.latch(20.0);
        } else {
            self.alert.latch(ALERT_SECONDS);
            self.anger.latch(12.0);
        }
    }

    /// The web vanished; its choke point goes bare and becomes the next job.
    fn web_removed(&mut self, web: WebId) {
        let choke = self.webs.remove(&web).flatten();
        self.occupied.remove(&web);
        let mut position = self.anchor;
        if let Some(point) = choke.and_then(|id| self.chokes.iter_mut().find(|c| c.id == id)) {
            point.has_web = false;
            point.time_since_serviced = 0.0;
            position = point.position;
            self.fortify_target = point.position;
            self.active_choke = Some(point.id);
        }
        self.notify_disturbance(position, true);
    }

    /// Reconcile the webs the host reports with the ones this spider remembers.
    pub fn sync_webs(&mut self, sightings: &[WebSighting]) {
        if !self.is_fortified() {
            return;
        }
        let seen: BTreeSet<WebId> = sightings.iter().map(|w| w.id).collect();
        let lost: Vec<WebId> = self
            .webs
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        for web in lost {
            self.web_removed(web);
        }

        for sighting in sightings {
            if !self.webs.contains_key(&sighting.id) {
                self.register_web(sighting.id, sighting.position);
            }
            if sighting.occupied {
                if self.occupied.insert(sighting.id) {
                    self.notify_disturbance(sighting.position, false);
                }
            } else {
                self.occupied.remove(&sighting.id);
            }
        }
    }

    /// Pick the next choke point to web: bare ones first, oldest first, then stale webs.
    pub fn select_fortify_target(&mut self) -> bool {
        if !self.is_fortified() {
            return false;
        }
        if self.fortify_target.is_known() {
            return true;
        }
        let perimeter = self.perimeter;
        let candidate = self
            .chokes
            .iter()
            .filter(|c| c.ring_radius <= perimeter + 0.5)
            .filter(|c| !c.has_web || c.time_since_serviced >= WEB_SERVICE_SECONDS)
            .max_by(|a, b| {
                (!a.has_web)
                    .cmp(&!b.has_web)
                    .then(a.time_since_serviced.total_cmp(&b.time_since_serviced))
            })
            .copied();
        let Some(choke) = candidate else {
            return false;
        };
        self.fortify_target = choke.position;
        self.active_choke = Some(choke.id);
        true
    }

    pub fn clear_fortify_target(&mut self) {
        self.fortify_target = Vec3::UNKNOWN;
        self.active_choke = None;
    }

    /// A web went up. Credits the active choke point, else the nearest one.
    pub fn mark_serviced(&mut self, web: WebId, position: Vec3) {
        let choke = match self.active_choke {
            Some(id) => self.chokes.iter_mut().find(|c| c.id == id),
            None => self.nearest_choke(position),
        };
        let credited = choke.map(|c| {
            c.has_web = true;
            c.time_since_serviced = 0.0;
            c.id
        });
        self.webs.insert(web, credited);
        self.clear_fortify_target();
    }

    pub fn clear_alert(&mut self) {
        self.alert.clear();
        self.alert_position = Vec3::UNKNOWN;
    }

    /// Start the search countdown once per alert. The alert outlives the search.
    pub fn begin_search(&mut self) {
        if self.searching {
            return;
        }
        self.searching = true;
        self.search.latch(SEARCH_SECONDS);
        self.alert.latch(SEARCH_SECONDS + 0.5);
        self.anger.latch(SEARCH_SECONDS * 0.75);
    }

    pub fn search_started(&self) -> bool {
        self.searching
    }

    pub fn search_done(&self) -> bool {
        self.searching && self.search.remaining() <= 0.15
    }

    pub fn clear_search(&mut self) {
        self.searching = false;
        self.search.clear();
    }

    /// Current hiding spot near the anchor, re-rolled every few seconds.
    pub fn hide_spot(
        &mut self,
        navigator: &dyn Navigator,
        rng: &mut impl DeterministicRng,
    ) -> Vec3 {
        if !self.is_fortified() {
            return Vec3::UNKNOWN;
        }
        if !self.hide_refresh.is_active() || !self.hide_spot.is_known() {
            let offset = rng.inside_unit_circle() * (self.perimeter * 0.25).max(2.0);
            self.hide_spot = navigator
                .sample_position(self.anchor + offset, 4.0)
                .unwrap_or(self.anchor);
            self.hide_refresh.latch(rng.next_f32_range(5.0, 10.0));
        }
        self.hide_spot
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SandSpiderModule;

impl<W> SpeciesModule<W> for SandSpiderModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::SandSpider
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(SAND_SPIDER_FACTS, SandSpiderFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "SpiderRoot",
            vec![
                sequence(
                    "SpiderWebResponse",
                    vec![
                        condition("SpiderAlert", alert_active),
                        action("SpiderSetAnger", enrage),
                        action("MoveToAlert", move_to_alert),
                        action("SearchAlert", search_alert),
                        action("ReplaceWeb", place_web),
                    ],
                ),
                sequence(
                    "SpiderChase",
                    vec![
                        condition("SpiderTerritoryEngage", intruder_inside_territory),
                        action("SpiderRush", rush_intruder),
                        action("SpiderStrike", attempt_strike),
                    ],
                ),
                sequence(
                    "SpiderFortify",
                    vec![
                        observing_condition("SpiderNeedsFortify", needs_fortification),
                        action("MoveToChokePoint", move_to_fortification),
                        action("SpiderWeave", place_web),
                        action("SpiderRetreat", return_to_hide),
                    ],
                ),
                action("SpiderIdle", idle_around_lair),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::SandSpider, root)
    }

    fn on_observe(
        &self,
        world: &W,
        agent: W::Agent,
        tick: &TickContext,
        blackboard: &mut Blackboard,
    ) {
        let territory = blackboard.territory();
        let center = world
            .pose(agent)
            .map_or(territory.center, |pose| pose.position);
        let sightings = world.webs(agent);
        let mut rng = tick.rng_for_agent(agent, RING_STREAM);
        let Some(facts) = blackboard.block_mut(SAND_SPIDER_FACTS) else {
            return;
        };
        facts.ensure_fortification(world.navigator(), &mut rng, center, territory.radius);
        facts.sync_webs(&sightings);
        facts.expand_if_secured(world.navigator(), &mut rng, territory.radius);
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b SandSpiderFacts> {
    ctx.blackboard.block(SAND_SPIDER_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut SandSpiderFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(SAND_SPIDER_FACTS).map(apply)
}

fn perimeter<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> f32 {
    facts(ctx).map_or(MIN_PERIMETER, SandSpiderFacts::perimeter)
}

pub fn alert_active<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(SandSpiderFacts::alert_active)
}

pub fn intruder_inside_territory<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.player.visible && ctx.blackboard.player_inside_territory(ctx.position())
}

/// Selects a choke point to web when none is pending.
pub fn needs_fortification<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> bool {
    update(ctx, SandSpiderFacts::select_fortify_target).unwrap_or(false)
}

pub fn enrage<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    update(ctx, |f| f.anger(15.0));
    ctx.set_active_action("SpiderAngered");
    BtStatus::Success
}

/// Walk to the disturbance. Once the search has begun the spider is already there.
pub fn move_to_alert<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(facts) = facts(ctx) else {
        return BtStatus::Failure;
    };
    let Some(target) = facts.alert_position() else {
        return BtStatus::Failure;
    };
    if facts.search_started() || ctx.position().distance(target) < 1.2 {
        ctx.set_active_action("SpiderInvestigate");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(target, 4.0, perimeter(ctx) + 6.0, 4.75)
        .acceleration(9.0)
        .stopping_distance(0.45);
    if move_to(ctx, "SpiderInvestigate", request) {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

/// Poke around the disturbance until the search countdown runs out.
pub fn search_alert<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(anchor) = facts(ctx).and_then(SandSpiderFacts::alert_position) else {
        return BtStatus::Failure;
    };
    update(ctx, SandSpiderFacts::begin_search);
    if facts(ctx).is_some_and(SandSpiderFacts::search_done) {
        update(ctx, |f| {
            f.clear_search();
            f.clear_alert();
        });
        return BtStatus::Success;
    }

    let settled = ctx
        .world
        .actuator(ctx.agent)
        .map_or(true, |a| !a.has_path() || a.remaining_distance() <= 0.8);
    if settled {
        let mut rng = ctx.rng(SEARCH_STREAM);
        let offset = rng.inside_unit_circle().normalized() * rng.next_f32_range(0.35, 2.4);
        let request = MoveRequest::new(anchor + offset, 2.5, 12.0, 2.8)
            .acceleration(5.0)
            .stopping_distance(0.4)
            .allow_partial();
        move_to(ctx, "SpiderSearch", request);
    }
    ctx.set_active_action("SpiderSearch");
    BtStatus::Running
}

/// Spin a web where the spider stands.
pub fn place_web<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let position = ctx.position();
    let Some(web) = ctx.world.spin_web(ctx.agent, position) else {
        update(ctx, SandSpiderFacts::clear_fortify_target);
        return BtStatus::Failure;
    };
    update(ctx, |f| {
        f.mark_serviced(web, position);
        f.clear_search();
    });
    ctx.set_active_action("SpiderWebWeave");
    BtStatus::Success
}

pub fn move_to_fortification<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let target = facts(ctx).map_or(Vec3::UNKNOWN, SandSpiderFacts::fortify_target);
    if !target.is_known() {
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) < 1.05 {
        ctx.set_active_action("SpiderFortifyPosition");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(target, 3.5, perimeter(ctx) + 6.0, 3.85)
        .acceleration(8.5)
        .stopping_distance(0.55);
    if move_to(ctx, "SpiderFortify", request) {
        return BtStatus::Running;
    }
    update(ctx, SandSpiderFacts::clear_fortify_target);
    BtStatus::Failure
}

/// Cut the intruder off just short of it, harder the angrier the spider is.
pub fn rush_intruder<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let player = ctx.blackboard.player;
    if !player.visible || !player.last_known_position.is_known() {
        return BtStatus::Failure;
    }
    let own = ctx.position();
    if own.distance(player.last_known_position) <= STRIKE_DISTANCE {
        return BtStatus::Success;
    }
    let direction = (player.last_known_position - own).normalized();
    let cutoff = player.last_known_position - direction * 0.75 + spread(ctx, 1.5);
    let aggression = facts(ctx).map_or(0.0, SandSpiderFacts::aggression);
    let request = MoveRequest::new(
        cutoff,
        4.0,
        ctx.profile.territorial_radius * 1.25,
        6.0 * lerp(0.85, 1.35, aggression),
    )
    .acceleration(lerp(10.0, 16.0, aggression))
    .stopping_distance(0.35);
    if move_to(ctx, "SpiderChase", request) {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

pub fn attempt_strike<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let player = ctx.blackboard.player;
    if !player.visible {
        ctx.set_active_action("SpiderStrikeLost");
        return BtStatus::Failure;
    }
    if ctx.position().distance(player.last_known_position) <= STRIKE_DISTANCE {
        ctx.set_active_action("SpiderAttack");
        update(ctx, |f| f.anger(8.0));
        return BtStatus::Success;
    }
    ctx.set_active_action("SpiderPress");
    BtStatus::Running
}

fn hide_spot<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> Vec3 {
    let mut rng = ctx.rng(HIDE_STREAM);
    let fallback = ctx.blackboard.territory().center;
    let navigator = ctx.world.navigator();
    ctx.blackboard
        .block_mut(SAND_SPIDER_FACTS)
        .map(|f| f.hide_spot(navigator, &mut rng))
        .filter(|spot| spot.is_known())
        .unwrap_or(fallback)
}

pub fn return_to_hide<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let spot = hide_spot(ctx);
    if ctx.position().distance(spot) < 0.9 {
        update(ctx, |f| {
            f.clear_fortify_target();
            f.cool(2.0);
        });
        ctx.set_active_action("SpiderHide");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(spot, 3.0, perimeter(ctx) + 4.0, 3.1)
        .acceleration(6.0)
        .stopping_distance(0.6)
        .allow_partial();
    if move_to(ctx, "SpiderHide", request) {
        return BtStatus::Running;
    }
    update(ctx, |f| {
        f.clear_fortify_target();
        f.cool(1.5);
    });
    BtStatus::Failure
}

pub fn idle_around_lair<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let spot = hide_spot(ctx);
    if !spot.is_known() {
        return BtStatus::Failure;
    }
    let dt = ctx.dt();
    update(ctx, |f| f.cool(dt * 0.5));
    let jitter = ctx.rng(HIDE_STREAM).inside_unit_circle() * 0.6;
    let wander = (spot + spread(ctx, 2.5) + jitter).with_y(spot.y);
    let request = MoveRequest::new(wander, 2.5, perimeter(ctx) + 3.0, 2.2)
        .acceleration(4.5)
        .stopping_distance(0.5)
        .allow_partial();
    if move_to(ctx, "SpiderIdle", request) {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

//! Executes choreographies against a [`Stage`].
//!
//! The choreographer is the only writer of stage state. It runs at most one
//! choreography at a time; a new `execute` call supersedes the live run by
//! cancelling every channel that run touched before the new run writes its
//! baseline. Every tween is stamped with the run's [`Generation`] and a settle
//! report is only acted on when its owner is the live run, so nothing a
//! superseded run scheduled can reach the stage afterwards.
//!
//! Progress is cooperative: the caller drives time with [`Choreographer::tick`].

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::{channel::oneshot, FutureExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    choreography::{Choreography, Effect, Move, RunParams},
    intent::Intent,
    motion::{AnimationTicket, ChannelId, Generation},
    stage::{Facing, Stage},
};

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);
const RETIRED_CAPACITY: usize = 16;
const LANE_EPSILON: f32 = 0.5;

/// Lifecycle of one choreography run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running { phase: usize },
    Settled,
    Superseded,
}

impl RunState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Running { .. })
    }
}

/// Delivered through [`Completion`] when a run settles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub generation: Generation,
    pub intent: Intent,
    pub phases: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionState {
    Pending,
    Settled(RunReport),
    /// The run was superseded before it settled.
    Discarded,
}

/// Completion signal for one `execute` call.
///
/// Resolves to `Some(report)` when the run settles and to `None` when it is
/// superseded first.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<RunReport>,
    resolved: Option<CompletionState>,
}

impl Completion {
    fn new(receiver: oneshot::Receiver<RunReport>) -> Self {
        Self {
            receiver,
            resolved: None,
        }
    }

    /// Checks the signal without blocking.
    pub fn try_outcome(&mut self) -> CompletionState {
        if let Some(resolved) = &self.resolved {
            return resolved.clone();
        }
        let state = match self.receiver.try_recv() {
            Ok(Some(report)) => CompletionState::Settled(report),
            Ok(None) => return CompletionState::Pending,
            Err(oneshot::Canceled) => CompletionState::Discarded,
        };
        self.resolved = Some(state.clone());
        state
    }
}

impl Future for Completion {
    type Output = Option<RunReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.resolved.clone() {
            Some(CompletionState::Settled(report)) => Poll::Ready(Some(report)),
            Some(CompletionState::Discarded) => Poll::Ready(None),
            _ => self.receiver.poll_unpin(cx).map(Result::ok),
        }
    }
}

/// Returned by [`Choreographer::execute`].
#[derive(Debug)]
pub struct RunHandle {
    pub generation: Generation,
    pub completion: Completion,
}

#[derive(Debug)]
struct ChoreographyRun {
    generation: Generation,
    plan: Choreography,
    state: RunState,
    origin: BTreeMap<ChannelId, f32>,
    touched: BTreeSet<ChannelId>,
    pending: Vec<AnimationTicket>,
    elapsed: Duration,
    notify: Option<oneshot::Sender<RunReport>>,
}

impl ChoreographyRun {
    fn origin(&self, channel: ChannelId) -> f32 {
        self.origin.get(&channel).copied().unwrap_or(0.0)
    }
}

pub struct Choreographer {
    stage: Stage,
    generation: Generation,
    run: Option<ChoreographyRun>,
    retired: VecDeque<(Generation, RunState)>,
    frame_interval: Duration,
    frame_timer: Duration,
}

impl Choreographer {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            generation: Generation::default(),
            run: None,
            retired: VecDeque::with_capacity(RETIRED_CAPACITY),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frame_timer: Duration::ZERO,
        }
    }

    /// Sets how often sprite frames step while a run is live. Zero disables
    /// stepping.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Read-only view for the rendering layer.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn current_generation(&self) -> Generation {
        self.generation
    }

    /// Generation and state of the most recent run.
    pub fn state(&self) -> Option<(Generation, RunState)> {
        self.run.as_ref().map(|run| (run.generation, run.state))
    }

    /// State of a specific run, if it is the current run or one of the
    /// recently retired ones.
    pub fn state_of(&self, generation: Generation) -> Option<RunState> {
        if let Some(run) = self.run.as_ref().filter(|run| run.generation == generation) {
            return Some(run.state);
        }
        self.retired
            .iter()
            .find(|(retired, _)| *retired == generation)
            .map(|(_, state)| *state)
    }

    pub fn is_idle(&self) -> bool {
        self.run.as_ref().map_or(true, |run| !run.state.is_live())
    }

    /// Runs the built-in choreography for `intent`.
    pub fn execute(&mut self, intent: Intent, params: &RunParams) -> RunHandle {
        self.execute_plan(Choreography::for_intent(intent, params), params)
    }

    /// Runs an arbitrary plan, superseding any live run first.
    pub fn execute_plan(&mut self, plan: Choreography, params: &RunParams) -> RunHandle {
        let generation = self.generation.next();
        self.generation = generation;

        self.supersede(generation, &plan.channels());
        self.apply_seeds(params);
        self.stage.sprites.reset();
        self.frame_timer = Duration::ZERO;

        let origin = ChannelId::ALL
            .iter()
            .map(|id| (*id, self.stage.value(*id)))
            .collect();
        let (sender, receiver) = oneshot::channel();
        info!(
            run = %generation,
            intent = %plan.intent,
            phases = plan.phases.len(),
            duration = ?plan.duration(),
            "choreography started"
        );

        let mut run = ChoreographyRun {
            generation,
            plan,
            state: RunState::Pending,
            origin,
            touched: BTreeSet::new(),
            pending: Vec::new(),
            elapsed: Duration::ZERO,
            notify: Some(sender),
        };
        if run.plan.phases.is_empty() {
            settle(&mut run);
        } else {
            begin_phase(&mut self.stage, &mut run, 0);
            resolve_barriers(&mut self.stage, &mut run);
        }
        self.run = Some(run);

        RunHandle {
            generation,
            completion: Completion::new(receiver),
        }
    }

    /// Advances every channel by `dt` and moves the live run through any
    /// barriers that resolved.
    pub fn tick(&mut self, dt: Duration) {
        let settled = self.stage.advance(dt);

        let Some(run) = self.run.as_mut().filter(|run| run.state.is_live()) else {
            return;
        };
        run.elapsed += dt;

        if !self.frame_interval.is_zero() {
            self.frame_timer += dt;
            while self.frame_timer >= self.frame_interval {
                self.frame_timer -= self.frame_interval;
                self.stage.sprites.advance();
            }
        }

        for ticket in settled {
            if ticket.owner != run.generation {
                debug!(
                    run = %run.generation,
                    owner = %ticket.owner,
                    channel = %ticket.channel,
                    "stale completion ignored"
                );
                continue;
            }
            run.pending.retain(|pending| *pending != ticket);
        }

        resolve_barriers(&mut self.stage, run);
    }

    fn supersede(&mut self, by: Generation, needed: &[ChannelId]) {
        let Some(mut prior) = self.run.take() else {
            return;
        };
        if prior.state.is_live() {
            let overlapping = prior.touched.iter().any(|id| needed.contains(id));
            for id in &prior.touched {
                self.stage.channel_mut(*id).cancel();
            }
            prior.pending.clear();
            prior.state = RunState::Superseded;
            // dropping the sender discards the completion signal
            prior.notify = None;
            info!(
                run = %prior.generation,
                by = %by,
                overlapping,
                "choreography superseded"
            );
        }
        self.retire(prior.generation, prior.state);
    }

    fn retire(&mut self, generation: Generation, state: RunState) {
        if self.retired.len() >= RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back((generation, state));
    }

    fn apply_seeds(&mut self, params: &RunParams) {
        for id in ChannelId::ALL {
            if let Some(value) = params.seeds.get(id) {
                self.stage.channel_mut(id).set(value);
            }
        }
        if let Some(visible) = params.non_player_visible {
            self.stage.visibility.set(visible);
        }
    }
}

impl std::fmt::Debug for Choreographer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choreographer")
            .field("generation", &self.generation)
            .field("state", &self.state())
            .finish()
    }
}

fn begin_phase(stage: &mut Stage, run: &mut ChoreographyRun, index: usize) {
    run.state = RunState::Running { phase: index };
    let phase = &run.plan.phases[index];
    let resolved: Vec<(Move, f32)> = phase
        .moves
        .iter()
        .map(|m| {
            let target = m.target.resolve(stage.value(m.channel), run.origin(m.channel));
            (*m, target)
        })
        .collect();

    for effect in &phase.on_enter {
        apply_effect(stage, *effect, &resolved);
    }

    debug!(
        run = %run.generation,
        phase = index,
        moves = resolved.len(),
        duration = ?phase.duration(),
        "phase started"
    );

    run.pending.clear();
    for (m, target) in resolved {
        let channel = stage.channel_mut(m.channel);
        // a later move on the same channel replaces the earlier one in the barrier
        if let Some(replaced) = channel.cancel() {
            run.pending.retain(|pending| *pending != replaced);
        }
        let ticket = channel.animate_to(target, m.duration, m.easing, run.generation);
        run.touched.insert(m.channel);
        run.pending.push(ticket);
    }
}

fn resolve_barriers(stage: &mut Stage, run: &mut ChoreographyRun) {
    while let RunState::Running { phase } = run.state {
        if !run.pending.is_empty() {
            break;
        }
        for effect in &run.plan.phases[phase].on_settle {
            apply_effect(stage, *effect, &[]);
        }
        debug!(run = %run.generation, phase, "phase barrier resolved");

        if phase + 1 < run.plan.phases.len() {
            begin_phase(stage, run, phase + 1);
        } else {
            settle(run);
        }
    }
}

fn settle(run: &mut ChoreographyRun) {
    run.state = RunState::Settled;
    let report = RunReport {
        generation: run.generation,
        intent: run.plan.intent,
        phases: run.plan.phases.len(),
        elapsed: run.elapsed,
    };
    info!(run = %run.generation, intent = %run.plan.intent, elapsed = ?run.elapsed, "choreography settled");
    if let Some(notify) = run.notify.take() {
        // the caller may have dropped its handle
        let _ = notify.send(report);
    }
}

fn apply_effect(stage: &mut Stage, effect: Effect, moves: &[(Move, f32)]) {
    match effect {
        Effect::HideNonPlayer => stage.visibility.hide(),
        Effect::Face(facing) => stage.sprites.set_facing(facing),
        Effect::SteerTowardLane => {
            let Some((_, target)) = moves.iter().find(|(m, _)| m.channel == ChannelId::Lane) else {
                return;
            };
            let delta = target - stage.value(ChannelId::Lane);
            let facing = if delta < -LANE_EPSILON {
                Facing::NorthWest
            } else if delta > LANE_EPSILON {
                Facing::NorthEast
            } else {
                Facing::North
            };
            stage.sprites.set_facing(facing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        choreography::{ChannelSeeds, Phase, Target},
        motion::Easing,
        stage::SpriteFrameController,
    };

    const STEP: Duration = Duration::from_millis(10);

    fn choreographer() -> Choreographer {
        Choreographer::new(Stage::new(SpriteFrameController::new(4, 4)))
    }

    fn params() -> RunParams {
        RunParams {
            tile_size: 64.0,
            screen_width: 320.0,
            screen_height: 640.0,
            player_width: 32.0,
            non_player_height: 64.0,
            ..RunParams::default()
        }
        .with_seeds(ChannelSeeds {
            scroll: Some(0.0),
            lane: Some(144.0),
            non_player_offset: Some(100.0),
        })
        .with_non_player_visible(true)
    }

    fn run_for(choreo: &mut Choreographer, millis: u64) {
        for _ in 0..millis / 10 {
            choreo.tick(STEP);
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn proceed_scrolls_two_tiles() {
        let mut choreo = choreographer();
        let mut handle = choreo.execute(Intent::Proceed, &params());
        assert_eq!(choreo.state(), Some((handle.generation, RunState::Running { phase: 0 })));

        run_for(&mut choreo, 990);
        assert_eq!(handle.completion.try_outcome(), CompletionState::Pending);

        run_for(&mut choreo, 10);
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -128.0);
        assert!(choreo.is_idle());
        match handle.completion.try_outcome() {
            CompletionState::Settled(report) => {
                assert_eq!(report.intent, Intent::Proceed);
                assert_eq!(report.phases, 1);
                assert_eq!(report.elapsed, Duration::from_millis(1000));
            }
            other => panic!("expected settled run, got {other:?}"),
        }
    }

    #[test]
    fn undefined_channels_count_from_zero() {
        let mut choreo = choreographer();
        choreo.execute(Intent::Proceed, &RunParams::default());
        run_for(&mut choreo, 1000);
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -128.0);
    }

    #[test]
    fn stop_round_trips_scroll() {
        let mut choreo = choreographer();
        let seeded = params().with_seeds(ChannelSeeds {
            scroll: Some(-37.5),
            ..ChannelSeeds::default()
        });
        choreo.execute(Intent::Stop, &seeded);

        run_for(&mut choreo, 200);
        assert!(approx(choreo.stage().value(ChannelId::Scroll), -27.5));
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 1 }));

        run_for(&mut choreo, 300);
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -37.5);
        assert!(choreo.is_idle());

        // repeated stops keep returning to the same place
        for _ in 0..3 {
            choreo.execute(Intent::Stop, &RunParams::default());
            run_for(&mut choreo, 500);
            assert_eq!(choreo.stage().value(ChannelId::Scroll), -37.5);
        }
    }

    #[test]
    fn overtake_completes_at_center_with_non_player_hidden() {
        let mut choreo = choreographer();
        let params = params();
        let mut handle = choreo.execute(Intent::Overtake, &params);

        run_for(&mut choreo, 300);
        assert_eq!(choreo.stage().value(ChannelId::Lane), params.target_lane());
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -32.0);
        assert!(choreo.stage().visibility.is_visible());

        run_for(&mut choreo, 1000);
        assert!(!choreo.stage().visibility.is_visible());
        assert_eq!(
            choreo.stage().value(ChannelId::NonPlayerOffset),
            params.off_screen_offset()
        );
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 2 }));

        run_for(&mut choreo, 400);
        assert_eq!(choreo.stage().value(ChannelId::Lane), params.center_lane());
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -256.0);
        assert!(!choreo.stage().visibility.is_visible());
        assert_eq!(choreo.stage().sprites.facing(), Facing::North);
        assert!(matches!(
            handle.completion.try_outcome(),
            CompletionState::Settled(_)
        ));
    }

    #[test]
    fn interrupted_overtake_leaves_visibility_unchanged() {
        let mut choreo = choreographer();
        let mut first = choreo.execute(Intent::Overtake, &params());

        run_for(&mut choreo, 310);
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 1 }));
        assert!(choreo.stage().channel(ChannelId::NonPlayerOffset).is_animating());

        let second = choreo.execute(Intent::Proceed, &RunParams::default());
        assert_eq!(first.completion.try_outcome(), CompletionState::Discarded);
        assert_eq!(choreo.state_of(first.generation), Some(RunState::Superseded));
        assert!(!choreo.stage().channel(ChannelId::NonPlayerOffset).is_animating());
        assert!(!choreo.stage().channel(ChannelId::Lane).is_animating());
        let frozen_offset = choreo.stage().value(ChannelId::NonPlayerOffset);

        run_for(&mut choreo, 3000);
        assert!(choreo.stage().visibility.is_visible());
        assert_eq!(choreo.stage().value(ChannelId::NonPlayerOffset), frozen_offset);
        assert_eq!(choreo.state_of(second.generation), Some(RunState::Settled));
    }

    #[test]
    fn superseding_continues_from_interrupted_value() {
        let mut choreo = choreographer();
        choreo.execute(Intent::Proceed, &params());
        run_for(&mut choreo, 500);
        let midway = choreo.stage().value(ChannelId::Scroll);
        assert!(midway < 0.0 && midway > -128.0);

        choreo.execute(Intent::Proceed, &RunParams::default());
        assert_eq!(choreo.stage().value(ChannelId::Scroll), midway);

        run_for(&mut choreo, 1000);
        assert!(approx(choreo.stage().value(ChannelId::Scroll), midway - 128.0));
    }

    #[test]
    fn execute_resets_sprite_frames_synchronously() {
        let mut choreo = choreographer();
        choreo.execute(Intent::Overtake, &params());
        run_for(&mut choreo, 250);
        assert_eq!(choreo.stage().sprites.player_frame(), 2);
        assert_eq!(choreo.stage().sprites.facing(), Facing::NorthWest);

        choreo.execute(Intent::Stop, &RunParams::default());
        assert_eq!(choreo.stage().sprites.player_frame(), 0);
        assert_eq!(choreo.stage().sprites.non_player_frame(), 0);
        assert_eq!(choreo.stage().sprites.facing(), Facing::North);
    }

    #[test]
    fn overtake_steers_out_and_back() {
        let mut choreo = choreographer();
        choreo.execute(Intent::Overtake, &params());
        assert_eq!(choreo.stage().sprites.facing(), Facing::NorthWest);

        run_for(&mut choreo, 300);
        assert_eq!(choreo.stage().sprites.facing(), Facing::North);

        run_for(&mut choreo, 1000);
        assert_eq!(choreo.stage().sprites.facing(), Facing::NorthEast);
    }

    #[test]
    fn parallel_barrier_waits_for_slowest_member() {
        let mut choreo = choreographer();
        let plan = Choreography::new(
            Intent::Proceed,
            vec![
                Phase::parallel(vec![
                    Move::new(ChannelId::Lane, Target::To(10.0), 100, Easing::Linear),
                    Move::new(ChannelId::Scroll, Target::By(40.0), 400, Easing::Linear),
                ]),
                Phase::parallel(vec![Move::new(
                    ChannelId::NonPlayerOffset,
                    Target::To(1.0),
                    100,
                    Easing::Linear,
                )])
                .on_enter(Effect::HideNonPlayer),
            ],
        );
        choreo.execute_plan(plan, &params());

        run_for(&mut choreo, 150);
        assert!(!choreo.stage().channel(ChannelId::Lane).is_animating());
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 0 }));
        assert!(!choreo.stage().channel(ChannelId::NonPlayerOffset).is_animating());
        assert!(choreo.stage().visibility.is_visible());

        run_for(&mut choreo, 240);
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 0 }));

        run_for(&mut choreo, 10);
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 1 }));
        assert!(choreo.stage().channel(ChannelId::NonPlayerOffset).is_animating());
        assert!(!choreo.stage().visibility.is_visible());
    }

    #[test]
    fn repeated_channel_in_phase_waits_for_last_move() {
        let mut choreo = choreographer();
        let plan = Choreography::new(
            Intent::Proceed,
            vec![Phase::parallel(vec![
                Move::new(ChannelId::Scroll, Target::By(-10.0), 100, Easing::Linear),
                Move::new(ChannelId::Scroll, Target::By(-20.0), 200, Easing::Linear),
            ])],
        );
        let mut handle = choreo.execute_plan(plan, &params());

        run_for(&mut choreo, 190);
        assert_eq!(choreo.state().map(|s| s.1), Some(RunState::Running { phase: 0 }));

        run_for(&mut choreo, 10);
        assert!(choreo.is_idle());
        assert_eq!(choreo.stage().value(ChannelId::Scroll), -20.0);
        assert!(matches!(
            handle.completion.try_outcome(),
            CompletionState::Settled(_)
        ));
    }

    #[test]
    fn empty_plan_settles_immediately() {
        let mut choreo = choreographer();
        let handle = choreo.execute_plan(Choreography::new(Intent::Stop, Vec::new()), &params());
        assert!(choreo.is_idle());
        let report = futures::executor::block_on(handle.completion);
        assert_eq!(report.map(|r| r.phases), Some(0));
    }

    #[test]
    fn completion_future_resolves_none_when_superseded() {
        let mut choreo = choreographer();
        let first = choreo.execute(Intent::Stop, &params());
        let second = choreo.execute(Intent::Stop, &params());
        assert!(second.generation > first.generation);

        assert_eq!(futures::executor::block_on(first.completion), None);

        run_for(&mut choreo, 500);
        let report = futures::executor::block_on(second.completion);
        assert_eq!(report.map(|r| r.generation), Some(second.generation));
    }

    #[test]
    fn settled_runs_are_not_superseded() {
        let mut choreo = choreographer();
        let first = choreo.execute(Intent::Proceed, &params());
        run_for(&mut choreo, 1000);
        choreo.execute(Intent::Stop, &params());
        assert_eq!(choreo.state_of(first.generation), Some(RunState::Settled));
    }
}

//! Diffs each accepted snapshot against what is currently on screen and decides
//! which visual transitions fire. Every transition fires once per change.
//!
//! Score and objective changes are deferred, not dropped, while a banner covers
//! the HUD: the baseline keeps the last displayed values, so the first HUD cycle
//! afterwards diffs against what the viewer actually saw.

use crate::network::{ConnectionError, CycleOutcome};
use derivative::Derivative;
use enum_iterator::all;
use hud_common::{
    BOTTOM_OBJECTIVE_SLOTS,
    snapshot::{Snapshot, TeamState},
    team::{ObjectiveKind, Owner, Team},
};
use indexmap::IndexSet;
use log::{debug, info};
use serde::Serialize;

pub const PROMPT_TEXT: &str = "Press Start";

/// Frames of the "Connecting" dots animation, the last frame also shakes the banner
pub const LOADING_FRAMES: u32 = 4;

const FEED_TAGS: [&str; 4] = ["[Purple]", "[Orange]", "[Game]", "[Self]"];
const HIDDEN_TAGS: [&str; 2] = ["[UI]", "[Debug]"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveSlot {
    Top(usize),
    Central,
    Bottom(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    ShowConnecting {
        frame: u8,
        flourish: bool,
    },
    /// A failure that retrying alone will not fix
    ShowBlockingMessage(String),
    ShowPrompt(String),
    FadeInHud,
    FadeOutHud,
    /// Tracker started but no match clock yet
    ShowIdleBanner {
        version: String,
    },
    ClearBanner,
    /// One-shot highlight, the displayed value comes from `ScoreShown`
    ScoreChanged {
        team: Team,
        delta: i64,
    },
    ScoreShown {
        team: Team,
        score: u32,
        potential: Option<u32>,
    },
    Surrendered(Team),
    ObjectiveSecured {
        slot: ObjectiveSlot,
        owner: Team,
        kind: Option<ObjectiveKind>,
    },
    /// Back to the unclaimed rest visual, without animation
    ObjectiveCleared {
        slot: ObjectiveSlot,
    },
    EventFeedVisible(bool),
    AppendEvents(Vec<String>),
}

pub type TransitionSet = Vec<Transition>;

#[derive(Derivative)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Banner {
    #[derivative(Default)]
    Startup,
    Connecting,
    Blocked,
    Prompt,
    Idle,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationBaseline {
    /// The last applied snapshot. Scores and objectives only advance on HUD
    /// cycles, and `event_log` is not retained here.
    pub snapshot: Snapshot,
    processed_events: IndexSet<String>,
    event_history_limit: usize,
    /// Last `inMatch` seen on a ready cycle, prompts and failures leave it alone
    match_active: bool,
    /// A match started since the last HUD cycle, surrenders clear on the next one
    match_started: bool,
    failures: u32,
    banner: Banner,
}

impl ReconciliationBaseline {
    pub fn new(event_history_limit: usize) -> Self {
        Self {
            snapshot: Snapshot::default(),
            processed_events: IndexSet::new(),
            event_history_limit: event_history_limit.max(1),
            match_active: false,
            match_started: false,
            failures: 0,
            banner: Banner::Startup,
        }
    }

    pub fn banner(&self) -> Banner {
        self.banner
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn processed_events(&self) -> impl Iterator<Item = &str> {
        self.processed_events.iter().map(String::as_str)
    }

    /// Records every event not seen before and returns the ones worth showing,
    /// oldest first
    fn absorb_events(&mut self, log: &[String]) -> Vec<String> {
        let mut fresh = Vec::new();
        for event in log {
            if self.processed_events.contains(event) {
                continue;
            }
            self.processed_events.insert(event.clone());
            if is_feed_event(event) {
                fresh.push(event.clone());
            }
        }

        // Never forget an event the tracker is still sending, or it comes back
        // as fresh on the next cycle
        let limit = self.event_history_limit.max(log.len());
        let overflow = self.processed_events.len().saturating_sub(limit);
        if overflow > 0 {
            self.processed_events.drain(..overflow);
        }

        fresh
    }
}

/// Whether an event belongs in the viewer-facing feed
pub fn is_feed_event(event: &str) -> bool {
    !HIDDEN_TAGS.iter().any(|tag| event.contains(tag))
        && FEED_TAGS.iter().any(|tag| event.contains(tag))
        && !is_holding_noise(event)
}

/// `[Self] Holding 12 points` is repeated every few seconds while carrying points
fn is_holding_noise(event: &str) -> bool {
    let Some((_, rest)) = event.split_once("[Self] Holding ") else {
        return false;
    };
    let mut words = rest.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(count), Some(unit)) if count.parse::<u32>().is_ok() && unit.starts_with("point")
    )
}

pub fn reconcile(
    baseline: &ReconciliationBaseline,
    incoming: &Snapshot,
) -> (TransitionSet, ReconciliationBaseline) {
    let mut transitions = TransitionSet::new();
    let mut next = baseline.clone();
    next.failures = 0;

    if !incoming.ready {
        transitions.push(Transition::ShowPrompt(PROMPT_TEXT.to_string()));
        next.snapshot.ready = false;
        next.snapshot.in_match = false;
        next.banner = Banner::Prompt;
        return (transitions, next);
    }

    let shown = &baseline.snapshot;

    if incoming.in_match && !shown.in_match {
        transitions.push(Transition::FadeInHud);
    } else if !incoming.in_match && shown.in_match {
        transitions.push(Transition::FadeOutHud);
    }

    // The tracker clears to `match: false, seconds: 0` between matches, so the
    // edge has to be caught on idle cycles too
    if incoming.in_match && !baseline.match_active {
        next.match_started = true;
    }
    next.match_active = incoming.in_match;

    if incoming.profile != shown.profile && !incoming.profile.is_empty() {
        info!("Tracker profile is now {:?}", incoming.profile);
    }

    let mut snapshot = Snapshot {
        event_log: Vec::new(),
        ..incoming.clone()
    };

    if incoming.seconds_remaining == 0 {
        if shown.seconds_remaining != 0 || baseline.banner != Banner::Idle {
            transitions.push(Transition::ShowIdleBanner {
                version: incoming.version.clone(),
            });
        }
        next.banner = Banner::Idle;

        // Hold what is displayed until the HUD is back
        snapshot.purple = shown.purple.clone();
        snapshot.orange = shown.orange.clone();
        snapshot.top_objectives = shown.top_objectives;
        snapshot.central_objective = shown.central_objective;
        snapshot.bottom_objectives = shown.bottom_objectives.clone();
    } else {
        if baseline.banner != Banner::None {
            transitions.push(Transition::ClearBanner);
        }
        next.banner = Banner::None;

        let new_match = next.match_started;
        next.match_started = false;

        for team in all::<Team>() {
            *snapshot.team_mut(team) =
                diff_team(shown, incoming, team, new_match, &mut transitions);
        }
        diff_objectives(shown, incoming, &mut transitions);
    }

    if incoming.debug != shown.debug {
        transitions.push(Transition::EventFeedVisible(incoming.debug));
    }

    let fresh = next.absorb_events(&incoming.event_log);
    if !fresh.is_empty() {
        transitions.push(Transition::AppendEvents(fresh));
    }

    next.snapshot = snapshot;
    (transitions, next)
}

/// Returns the team state to retain. Surrender sticks until a new match starts.
fn diff_team(
    shown: &Snapshot,
    incoming: &Snapshot,
    team: Team,
    new_match: bool,
    transitions: &mut TransitionSet,
) -> TeamState {
    let was = shown.team(team);
    let now = incoming.team(team);
    let was_surrendered = was.surrendered && !new_match;
    let surrendered = was_surrendered || now.surrendered;

    if surrendered {
        if !was_surrendered {
            transitions.push(Transition::Surrendered(team));
        }
    } else {
        if now.score != was.score {
            transitions.push(Transition::ScoreChanged {
                team,
                delta: i64::from(now.score) - i64::from(was.score),
            });
        }
        let potential = incoming.potential_score(team);
        if was.surrendered || now.score != was.score || potential != shown.potential_score(team)
        {
            transitions.push(Transition::ScoreShown {
                team,
                score: now.score,
                potential,
            });
        }
    }

    TeamState {
        surrendered,
        ..now.clone()
    }
}

fn diff_objectives(shown: &Snapshot, incoming: &Snapshot, transitions: &mut TransitionSet) {
    let single_slots = shown
        .top_objectives
        .iter()
        .zip(incoming.top_objectives.iter())
        .enumerate()
        .map(|(i, (was, now))| (ObjectiveSlot::Top(i), *was, *now))
        .chain(std::iter::once((
            ObjectiveSlot::Central,
            shown.central_objective,
            incoming.central_objective,
        )));

    for (slot, was, now) in single_slots {
        match (was.team(), now.team()) {
            (_, Some(owner)) if was != now => transitions.push(Transition::ObjectiveSecured {
                slot,
                owner,
                kind: None,
            }),
            (Some(_), None) => {
                debug!("{slot:?} went back to unclaimed, resetting it");
                transitions.push(Transition::ObjectiveCleared { slot });
            }
            _ => {}
        }
    }

    for i in 0..BOTTOM_OBJECTIVE_SLOTS {
        let slot = ObjectiveSlot::Bottom(i);
        match (shown.bottom_objectives.get(i), incoming.bottom_objectives.get(i)) {
            (was, Some(now)) if was != Some(now) => {
                transitions.push(Transition::ObjectiveSecured {
                    slot,
                    owner: now.owner,
                    kind: Some(now.kind),
                })
            }
            (Some(_), None) => transitions.push(Transition::ObjectiveCleared { slot }),
            _ => {}
        }
    }
}

pub fn reconcile_failure(
    baseline: &ReconciliationBaseline,
    error: &ConnectionError,
) -> (TransitionSet, ReconciliationBaseline) {
    let mut next = baseline.clone();
    next.snapshot.ready = false;
    next.snapshot.in_match = false;
    next.failures = baseline.failures.saturating_add(1);

    let transition = match error {
        ConnectionError::VersionMismatch { .. } => {
            next.banner = Banner::Blocked;
            Transition::ShowBlockingMessage(error.to_string())
        }
        _ => {
            next.banner = Banner::Connecting;
            let frame = next.failures % LOADING_FRAMES;
            Transition::ShowConnecting {
                frame: frame as u8,
                flourish: frame == 0,
            }
        }
    };

    (vec![transition], next)
}

/// Owns the baseline and applies cycle outcomes in the order they were started
#[derive(Debug)]
pub struct Reconciler {
    baseline: ReconciliationBaseline,
    last_cycle: Option<u64>,
}

impl Reconciler {
    pub fn new(event_history_limit: usize) -> Self {
        Self {
            baseline: ReconciliationBaseline::new(event_history_limit),
            last_cycle: None,
        }
    }

    pub fn baseline(&self) -> &ReconciliationBaseline {
        &self.baseline
    }

    /// Reconciles `outcome` and passes the transitions to `hand_off`. The baseline
    /// only advances once `hand_off` has succeeded, a failed hand-off leaves it
    /// as it was. Outcomes from a cycle that is not newer than the last accepted
    /// one are discarded and return `None`.
    pub fn accept<R, E>(
        &mut self,
        outcome: &CycleOutcome,
        hand_off: impl FnOnce(&TransitionSet) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        if self.last_cycle.is_some_and(|last| outcome.cycle <= last) {
            debug!(
                "Discarding stale result of cycle {} (last applied {:?})",
                outcome.cycle, self.last_cycle
            );
            return None;
        }

        let (transitions, next) = match &outcome.result {
            Ok(snapshot) => reconcile(&self.baseline, snapshot),
            Err(e) => reconcile_failure(&self.baseline, e),
        };

        let handed = hand_off(&transitions);
        if handed.is_ok() {
            self.baseline = next;
            self.last_cycle = Some(outcome.cycle);
        }
        Some(handed)
    }
}

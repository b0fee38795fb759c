//! Turns transitions into render directives for the presentation layer.
//!
//! Every directive sets an absolute value (text, opacity, animation, image), so
//! applying a directive list twice looks the same as applying it once.

use crate::reconcile::{ObjectiveSlot, Transition, TransitionSet};
use hud_common::team::{Owner, Team};
use serde::Serialize;

mod banner;
mod events;
mod objectives;
mod scores;

pub const TITLE: &str = "UniteHUD";

/// Length of the match start and end fades
pub const MATCH_FADE_MILLIS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    BannerLabel,
    BannerLogo,
    HudBanner,
    HudContainer,
    TeamScoreContainer,
    ObjectivesContainer,
    TeamScore(Team),
    /// The animated part of the score, flashes when the team scores
    TeamScoreHighlight(Team),
    /// The "max" hint next to the score
    TeamPotential(Team),
    ObjectiveImage(ObjectiveSlot),
    /// One of the three ownership circles drawn over each objective
    ObjectiveOwner {
        slot: ObjectiveSlot,
        owner: Owner,
    },
    EventFeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    None,
    Scored,
    Secured,
    Shake,
    Spin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Text(String),
    Opacity(f32),
    /// Animates from whatever opacity is current
    FadeTo {
        opacity: f32,
        millis: u64,
    },
    Animation(Animation),
    Image(String),
    /// Appends the lines not already in the element, then drops all but the
    /// newest `keep_last`
    AppendUnique {
        lines: Vec<String>,
        keep_last: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDirective {
    pub target: Element,
    pub change: Change,
}

/// Collects the directives for one transition set. The `impl` blocks that fill
/// it live next to each group of elements.
#[derive(Debug, Default)]
struct DirectiveList {
    directives: Vec<RenderDirective>,
}

impl DirectiveList {
    fn set(&mut self, target: Element, change: Change) {
        self.directives.push(RenderDirective { target, change });
    }

    fn text(&mut self, target: Element, text: impl Into<String>) {
        self.set(target, Change::Text(text.into()));
    }

    fn opacity(&mut self, target: Element, opacity: f32) {
        self.set(target, Change::Opacity(opacity));
    }

    fn animation(&mut self, target: Element, animation: Animation) {
        self.set(target, Change::Animation(animation));
    }

    fn push(&mut self, transition: &Transition) {
        match transition {
            Transition::ShowConnecting { frame, flourish } => {
                self.connecting(*frame, *flourish)
            }
            Transition::ShowBlockingMessage(message) => self.cover(message, false),
            Transition::ShowPrompt(prompt) => self.cover(prompt, false),
            Transition::ShowIdleBanner { version } => self.idle(version),
            Transition::ClearBanner => self.uncover(),
            Transition::FadeInHud => self.fade_hud(1.0),
            Transition::FadeOutHud => self.fade_hud(0.0),
            Transition::ScoreChanged { team, delta } => self.score_changed(*team, *delta),
            Transition::ScoreShown {
                team,
                score,
                potential,
            } => self.score_shown(*team, *score, *potential),
            Transition::Surrendered(team) => self.surrendered(*team),
            Transition::ObjectiveSecured { slot, owner, kind } => {
                self.secured(*slot, *owner, *kind)
            }
            Transition::ObjectiveCleared { slot } => self.cleared(*slot),
            Transition::EventFeedVisible(visible) => self.feed_visible(*visible),
            Transition::AppendEvents(events) => self.append_events(events),
        }
    }
}

/// Maps transitions to directives, in transition order
pub fn project(transitions: &TransitionSet) -> Vec<RenderDirective> {
    let mut list = DirectiveList::default();
    for transition in transitions {
        list.push(transition);
    }
    list.directives
}

#[cfg(test)]
mod test {
    use super::*;
    use hud_common::team::ObjectiveKind;

    fn full_cycle() -> TransitionSet {
        vec![
            Transition::ClearBanner,
            Transition::FadeInHud,
            Transition::ScoreChanged {
                team: Team::Purple,
                delta: 15,
            },
            Transition::ScoreShown {
                team: Team::Purple,
                score: 15,
                potential: Some(35),
            },
            Transition::Surrendered(Team::Orange),
            Transition::ObjectiveSecured {
                slot: ObjectiveSlot::Top(1),
                owner: Team::Purple,
                kind: None,
            },
            Transition::ObjectiveSecured {
                slot: ObjectiveSlot::Bottom(0),
                owner: Team::Orange,
                kind: Some(ObjectiveKind::Registeel),
            },
            Transition::ObjectiveCleared {
                slot: ObjectiveSlot::Central,
            },
            Transition::EventFeedVisible(true),
            Transition::AppendEvents(vec!["[Game] Match started".to_string()]),
        ]
    }

    #[test]
    fn test_project_is_idempotent() {
        let transitions = full_cycle();
        let first = project(&transitions);
        assert!(!first.is_empty());
        assert_eq!(project(&transitions), first);
    }

    #[test]
    fn test_empty_set_projects_nothing() {
        assert_eq!(project(&TransitionSet::new()), vec![]);
    }

    #[test]
    fn test_project_keeps_transition_order() {
        let directives = project(&vec![
            Transition::FadeOutHud,
            Transition::ShowPrompt("Press Start".to_string()),
        ]);

        assert_eq!(
            directives[0],
            RenderDirective {
                target: Element::HudContainer,
                change: Change::FadeTo {
                    opacity: 0.0,
                    millis: MATCH_FADE_MILLIS
                },
            }
        );
        assert_eq!(
            directives[1],
            RenderDirective {
                target: Element::BannerLabel,
                change: Change::Text("Press Start".to_string()),
            }
        );
    }

    #[test]
    fn test_directive_json() {
        let directives = project(&vec![
            Transition::ScoreShown {
                team: Team::Orange,
                score: 42,
                potential: None,
            },
            Transition::ObjectiveCleared {
                slot: ObjectiveSlot::Bottom(2),
            },
        ]);

        let json = serde_json::to_value(&directives).unwrap();
        assert_eq!(
            json[0],
            serde_json::json!({"target": {"team_score": "orange"}, "change": {"text": "42"}})
        );
        assert_eq!(
            json[2],
            serde_json::json!({
                "target": {"objective_image": {"bottom": 2}},
                "change": {"image": "assets/img/sprites/registeel.png"}
            })
        );
        assert!(
            directives.iter().any(|d| d.target
                == Element::ObjectiveOwner {
                    slot: ObjectiveSlot::Bottom(2),
                    owner: Owner::None
                }
                && d.change == Change::Opacity(1.0))
        );
    }
}

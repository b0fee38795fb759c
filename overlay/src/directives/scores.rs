use super::{Animation, DirectiveList, Element};
use hud_common::team::Team;

const SURRENDERED_TEXT: &str = "SND";

impl DirectiveList {
    /// Losing points (a tracker correction) is shown without the highlight
    pub(super) fn score_changed(&mut self, team: Team, delta: i64) {
        let animation = if delta > 0 {
            Animation::Scored
        } else {
            Animation::None
        };
        self.animation(Element::TeamScoreHighlight(team), animation);
    }

    pub(super) fn score_shown(&mut self, team: Team, score: u32, potential: Option<u32>) {
        self.text(Element::TeamScore(team), score.to_string());
        self.text(
            Element::TeamPotential(team),
            potential.map(|max| format!("max {max}")).unwrap_or_default(),
        );
    }

    pub(super) fn surrendered(&mut self, team: Team) {
        self.text(Element::TeamScore(team), SURRENDERED_TEXT);
        self.text(Element::TeamPotential(team), "");
        self.animation(Element::TeamScoreHighlight(team), Animation::None);
    }
}

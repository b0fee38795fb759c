use super::{Animation, Change, DirectiveList, Element, MATCH_FADE_MILLIS, TITLE};

const LOADING_DOTS: [&str; 4] = ["", ".", "..", "..."];

/// The HUD banner stays dimmed behind any message
const COVERED_BANNER_OPACITY: f32 = 0.5;
const TITLE_LABEL_OPACITY: f32 = 0.25;

impl DirectiveList {
    /// Shows `message` over the HUD and hides scores and objectives
    pub(super) fn cover(&mut self, message: &str, flourish: bool) {
        self.text(Element::BannerLabel, message);
        self.opacity(Element::BannerLabel, 1.0);
        self.opacity(Element::HudBanner, COVERED_BANNER_OPACITY);
        self.opacity(Element::TeamScoreContainer, 0.0);
        self.opacity(Element::ObjectivesContainer, 0.0);

        let (shake, spin) = match flourish {
            true => (Animation::Shake, Animation::Spin),
            false => (Animation::None, Animation::None),
        };
        self.animation(Element::BannerLabel, shake);
        self.animation(Element::BannerLogo, spin);
    }

    pub(super) fn connecting(&mut self, frame: u8, flourish: bool) {
        let dots = LOADING_DOTS[usize::from(frame) % LOADING_DOTS.len()];
        self.cover(&format!("Connecting{dots}"), flourish);
    }

    pub(super) fn idle(&mut self, version: &str) {
        let label = if version.is_empty() {
            TITLE.to_string()
        } else {
            format!("{TITLE} {version}")
        };
        self.cover(&label, false);
        self.opacity(Element::BannerLabel, TITLE_LABEL_OPACITY);
    }

    /// Brings scores and objectives back exactly as they were covered
    pub(super) fn uncover(&mut self) {
        self.text(Element::BannerLabel, "");
        self.animation(Element::BannerLabel, Animation::None);
        self.animation(Element::BannerLogo, Animation::None);
        self.opacity(Element::HudBanner, 1.0);
        self.opacity(Element::TeamScoreContainer, 1.0);
        self.opacity(Element::ObjectivesContainer, 1.0);
    }

    pub(super) fn fade_hud(&mut self, opacity: f32) {
        self.set(
            Element::HudContainer,
            Change::FadeTo {
                opacity,
                millis: MATCH_FADE_MILLIS,
            },
        );
    }
}

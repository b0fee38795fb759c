use super::{Change, DirectiveList, Element};

/// Lines kept in the on-screen feed
pub const FEED_LINES: usize = 10;

const FEED_OPACITY: f32 = 0.9;

impl DirectiveList {
    pub(super) fn feed_visible(&mut self, visible: bool) {
        self.opacity(Element::EventFeed, if visible { FEED_OPACITY } else { 0.0 });
    }

    pub(super) fn append_events(&mut self, events: &[String]) {
        self.set(
            Element::EventFeed,
            Change::AppendUnique {
                lines: events.to_vec(),
                keep_last: FEED_LINES,
            },
        );
    }
}

#[cfg(test)]
mod test {
    use super::super::{RenderDirective, project};
    use super::*;
    use crate::reconcile::Transition;

    #[test]
    fn test_feed() {
        let events = vec![
            "[Purple] +15".to_string(),
            "[Game] Regieleki secured".to_string(),
        ];
        assert_eq!(
            project(&vec![
                Transition::EventFeedVisible(true),
                Transition::AppendEvents(events.clone())
            ]),
            vec![
                RenderDirective {
                    target: Element::EventFeed,
                    change: Change::Opacity(0.9),
                },
                RenderDirective {
                    target: Element::EventFeed,
                    change: Change::AppendUnique {
                        lines: events,
                        keep_last: 10
                    },
                },
            ]
        );

        assert_eq!(
            project(&vec![Transition::EventFeedVisible(false)])[0].change,
            Change::Opacity(0.0)
        );
    }
}

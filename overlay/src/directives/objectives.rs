use super::{Animation, Change, DirectiveList, Element};
use crate::reconcile::ObjectiveSlot;
use enum_iterator::all;
use hud_common::team::{ObjectiveKind, Owner, Team};

const SPRITES: &str = "assets/img/sprites";
const TOP_SPRITE: &str = "regieleki";
const CENTRAL_SPRITE: &str = "rayquaza";

const REST_OPACITY: f32 = 0.75;
const SECURED_OPACITY: f32 = 1.0;

fn sprite(slot: ObjectiveSlot, kind: Option<ObjectiveKind>) -> String {
    let name = match slot {
        ObjectiveSlot::Top(_) => TOP_SPRITE,
        ObjectiveSlot::Central => CENTRAL_SPRITE,
        ObjectiveSlot::Bottom(i) => kind.unwrap_or(ObjectiveKind::rest_for_slot(i)).as_str(),
    };
    format!("{SPRITES}/{name}.png")
}

impl DirectiveList {
    fn owner_circles(&mut self, slot: ObjectiveSlot, holder: Owner) {
        for owner in all::<Owner>() {
            let opacity = if owner == holder { 1.0 } else { 0.0 };
            self.opacity(Element::ObjectiveOwner { slot, owner }, opacity);
        }
    }

    pub(super) fn secured(&mut self, slot: ObjectiveSlot, owner: Team, kind: Option<ObjectiveKind>) {
        let image = Element::ObjectiveImage(slot);
        self.set(image, Change::Image(sprite(slot, kind)));
        self.opacity(image, SECURED_OPACITY);
        self.animation(image, Animation::Secured);
        self.owner_circles(slot, owner.into());

        // A top objective adds to what the owner can still bank
        if let ObjectiveSlot::Top(_) = slot {
            self.animation(Element::TeamPotential(owner), Animation::Scored);
        }
    }

    pub(super) fn cleared(&mut self, slot: ObjectiveSlot) {
        let image = Element::ObjectiveImage(slot);
        self.set(image, Change::Image(sprite(slot, None)));
        self.opacity(image, REST_OPACITY);
        self.animation(image, Animation::None);
        self.owner_circles(slot, Owner::None);
    }
}

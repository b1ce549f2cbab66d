use crate::fixed::Fixed;
use crate::netid::NetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThinkerRef {
    Confirmed(NetId),
    Predicted(NetId),
}

impl ThinkerRef {
    pub fn id(self) -> NetId {
        match self {
            ThinkerRef::Confirmed(id) | ThinkerRef::Predicted(id) => id,
        }
    }

    pub fn is_predicted(self) -> bool {
        matches!(self, ThinkerRef::Predicted(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sector {
    pub floor_height: Fixed,
    pub ceiling_height: Fixed,
    pub floor_pic: i32,
    pub thinkers: Vec<ThinkerRef>,
}

impl Sector {
    pub fn new(floor_height: Fixed, ceiling_height: Fixed) -> Self {
        Self {
            floor_height,
            ceiling_height,
            ..Default::default()
        }
    }

    pub fn has_thinker(&self) -> bool {
        !self.thinkers.is_empty()
    }

    pub fn detach(&mut self, reference: ThinkerRef) {
        self.thinkers.retain(|&r| r != reference);
    }

    pub fn detach_predicted(&mut self) -> Vec<NetId> {
        let predicted = self
            .thinkers
            .iter()
            .filter(|r| r.is_predicted())
            .map(|r| r.id())
            .collect();
        self.thinkers.retain(|r| !r.is_predicted());
        predicted
    }
}

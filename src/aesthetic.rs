// Aesthetic slots: color/shape/size/text bindings

use crate::field::{FieldRef, MeasureRef};
use crate::frame::ChannelFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Color,
    Shape,
    Size,
    Text,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Color, Channel::Shape, Channel::Size, Channel::Text];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AestheticSlot {
    pub field: Box<FieldRef>,
    #[serde(default)]
    pub frame: ChannelFrame,
}

impl AestheticSlot {
    pub fn new(field: impl Into<FieldRef>) -> Self {
        Self {
            field: Box::new(field.into()),
            frame: ChannelFrame::default(),
        }
    }
}

/// One optional slot per channel; the struct shape itself rules out two
/// bindings on the same channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AestheticSet {
    pub color: Option<AestheticSlot>,
    pub shape: Option<AestheticSlot>,
    pub size: Option<AestheticSlot>,
    pub text: Option<AestheticSlot>,
}

impl AestheticSet {
    pub fn get(&self, channel: Channel) -> Option<&AestheticSlot> {
        match channel {
            Channel::Color => self.color.as_ref(),
            Channel::Shape => self.shape.as_ref(),
            Channel::Size => self.size.as_ref(),
            Channel::Text => self.text.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, channel: Channel) -> &mut Option<AestheticSlot> {
        match channel {
            Channel::Color => &mut self.color,
            Channel::Shape => &mut self.shape,
            Channel::Size => &mut self.size,
            Channel::Text => &mut self.text,
        }
    }

    /// Binds `field` to `channel`, returning whatever was bound before.
    pub fn bind(&mut self, channel: Channel, field: impl Into<FieldRef>) -> Option<AestheticSlot> {
        self.slot_mut(channel).replace(AestheticSlot::new(field))
    }

    pub fn is_bound(&self, channel: Channel) -> bool {
        self.get(channel).is_some()
    }

    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|c| !self.is_bound(*c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &AestheticSlot)> {
        Channel::ALL
            .into_iter()
            .filter_map(move |c| self.get(c).map(|slot| (c, slot)))
    }

    /// Slots of this set, with the channels it leaves empty taken from
    /// `fallback`.
    pub fn layered<'a>(
        &'a self,
        fallback: &'a AestheticSet,
    ) -> impl Iterator<Item = (Channel, &'a AestheticSlot)> + 'a {
        Channel::ALL
            .into_iter()
            .filter_map(move |c| self.get(c).or_else(|| fallback.get(c)).map(|slot| (c, slot)))
    }

    pub fn layered_over(&self, fallback: &AestheticSet) -> AestheticSet {
        let mut out = AestheticSet::default();
        for (channel, slot) in self.layered(fallback) {
            *out.slot_mut(channel) = Some(slot.clone());
        }
        out
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.iter().map(|(_, slot)| slot.field.as_ref())
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldRef> {
        [&mut self.color, &mut self.shape, &mut self.size, &mut self.text]
            .into_iter()
            .filter_map(|slot| slot.as_mut().map(|s| s.field.as_mut()))
    }

    /// Bound fields that split the data into series (dimensions and discrete
    /// measures).
    pub fn dimension_fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.fields().filter(|f| !f.is_measure())
    }

    /// Aggregates bound to a channel, discrete or not.
    pub fn aggregates(&self) -> impl Iterator<Item = &MeasureRef> {
        self.fields().filter_map(|f| f.as_measure())
    }

    pub fn has_non_measure(&self) -> bool {
        self.dimension_fields().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AggregateFormula, DimensionRef};

    #[test]
    fn test_bind_replaces_slot() {
        let mut set = AestheticSet::default();
        assert!(set.bind(Channel::Color, DimensionRef::new("Region")).is_none());
        let old = set.bind(Channel::Color, DimensionRef::new("State"));
        assert_eq!(old.unwrap().field.name(), "Region");
        assert_eq!(set.iter().count(), 1);
    }

    #[test]
    fn test_dimension_and_aggregate_split() {
        let mut set = AestheticSet::default();
        set.bind(Channel::Color, DimensionRef::new("Region"));
        set.bind(Channel::Size, MeasureRef::new("Profit", AggregateFormula::Sum));
        assert!(set.has_non_measure());
        assert_eq!(set.dimension_fields().count(), 1);
        assert_eq!(set.aggregates().next().unwrap().full_name(), "Sum(Profit)");
    }
}

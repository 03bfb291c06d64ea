//! # Debug Export
//!
//! Dumps one archetype as JSON for diagnostics. The format carries no
//! compatibility guarantee.
//!
//! ```json
//! {
//!   "archetype": 2,
//!   "types": ["game::Position", "game::Velocity"],
//!   "slots": [
//!     { "slot": 0, "entity": 0, "components": { "game::Position": { "x": 0.0, "y": 0.0 } } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use super::archetype::{Archetype, ArchetypeId};
use super::component::ComponentType;
use super::entity::EntityId;
use crate::error::EcsResult;

/// Serializable snapshot of one archetype.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeDump {
    /// Archetype id.
    pub archetype: ArchetypeId,
    /// Component type names in signature order.
    pub types: Vec<&'static str>,
    /// One entry per slot.
    pub slots: Vec<SlotDump>,
}

/// One entity's row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotDump {
    /// Slot index.
    pub slot: usize,
    /// Owning entity.
    pub entity: EntityId,
    /// Component values keyed by type name.
    pub components: BTreeMap<&'static str, serde_json::Value>,
}

impl ArchetypeDump {
    /// Captures every slot of `archetype`.
    ///
    /// # Errors
    ///
    /// [`EcsError::Export`](crate::EcsError::Export) if a value fails to
    /// serialize.
    pub fn capture(archetype: &Archetype) -> EcsResult<Self> {
        let types = archetype
            .signature()
            .types()
            .iter()
            .map(ComponentType::name)
            .collect();

        let slots = archetype
            .entities()
            .iter()
            .enumerate()
            .map(|(slot, &entity)| {
                let components = archetype
                    .pools()
                    .map(|pool| Ok((pool.component().name(), pool.export(slot)?)))
                    .collect::<EcsResult<_>>()?;
                Ok(SlotDump {
                    slot,
                    entity,
                    components,
                })
            })
            .collect::<EcsResult<_>>()?;

        Ok(Self {
            archetype: archetype.id(),
            types,
            slots,
        })
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`EcsError::Export`](crate::EcsError::Export) on serialization failure.
    pub fn to_json_pretty(&self) -> EcsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::ecs::ArchetypeSignature;

    #[test]
    fn test_capture_empty() {
        let arch = Archetype::empty(&RegistryConfig::default());
        let dump = ArchetypeDump::capture(&arch).unwrap();

        assert_eq!(dump.archetype, ArchetypeId::EMPTY);
        assert!(dump.types.is_empty());
        assert!(dump.slots.is_empty());
    }

    #[test]
    fn test_capture_values() {
        let config = RegistryConfig::default();
        let signature = ArchetypeSignature::new(vec![
            ComponentType::of::<u32>(),
            ComponentType::of::<String>(),
        ]);
        let mut arch = Archetype::new(ArchetypeId::from_index(1), signature, &config).unwrap();
        let e = EntityId::from_raw(4);

        arch.add_component(e, 7u32).unwrap();
        // fills the String pool for the same slot
        let mut name_source = Archetype::new(
            ArchetypeId::from_index(2),
            ArchetypeSignature::new(vec![ComponentType::of::<String>()]),
            &config,
        )
        .unwrap();
        name_source.add_component(e, String::from("crate")).unwrap();
        name_source.copy_entity_to(e, &mut arch).unwrap();

        let dump = ArchetypeDump::capture(&arch).unwrap();
        assert_eq!(dump.types.len(), 2);
        assert_eq!(dump.slots.len(), 1);
        assert_eq!(dump.slots[0].entity, e);
        assert_eq!(dump.slots[0].components["u32"], serde_json::json!(7));
        assert_eq!(
            dump.slots[0].components["alloc::string::String"],
            serde_json::json!("crate")
        );

        let text = dump.to_json_pretty().unwrap();
        assert!(text.contains("\"entity\": 4"));
    }
}

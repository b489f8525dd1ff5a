pub mod entity;
pub mod snapshot;
pub mod tick;

pub use entity::{Entity, EntityConfig};
pub use snapshot::Snapshot;
pub use tick::tick;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use sim_math::Vec3;

    use crate::entity::{Entity, EntityConfig};

    pub fn dummy_entity(id: u64) -> Entity {
        Entity::spawn(id, Arc::new(EntityConfig::default()), Vec3::ZERO, 0)
    }
}

pub mod merge;
pub mod slug;
pub mod store;
pub mod types;

pub use store::{
    archive_entity, create_entity, get_entity_by_id, get_entity_by_slug, list_entities,
    update_entity_by_id, update_entity_by_slug,
};
pub use types::{EntityCollection, UserEntity};

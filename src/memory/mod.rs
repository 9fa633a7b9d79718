pub mod insert;
pub mod reset;
pub mod search;
pub mod similarity;
pub mod types;

pub use insert::insert_memories;
pub use reset::reset_user;
pub use search::{
    search_memories, search_memories_ranked, RankedSearchOptions, SearchDocument, SearchOptions,
    SearchResponse,
};
pub use types::{Memory, MemoryCreate, MemoryTag, MemoryType};

pub mod memory;
pub mod resolver;
pub mod store;
pub mod supabase;

pub use memory::{InMemoryAvailabilityStore, MemorySeed, SeedWeekly};
pub use resolver::{resolve_open_intervals, AvailabilityResolver};
pub use store::AvailabilityStore;
pub use supabase::SupabaseAvailabilityStore;

pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod memory;
pub mod notification;
pub mod realtime;
pub mod slots;
pub mod store;
pub mod supabase;

pub use booking::BookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use memory::InMemoryAppointmentStore;
pub use notification::{NotificationError, NotificationEvent, NotificationKind, NotificationSink, TracingNotificationSink};
pub use realtime::{InMemoryPresence, PresenceLookup, RealtimeNotificationHub};
pub use slots::SlotService;
pub use store::{AppointmentStore, CommitOutcome, InsertOutcome};
pub use supabase::SupabaseAppointmentStore;

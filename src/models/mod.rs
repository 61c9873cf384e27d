pub mod attendee;
pub mod event;
pub mod host;
pub mod session;

pub use attendee::{Attendee, RsvpStatus};
pub use event::{Event, EventSummary};
pub use host::Host;
pub use session::Session;

pub mod clock;
pub mod scheduler;
pub mod server;
pub mod subscribers;

pub use clock::{Clock, SystemClock};
pub use scheduler::run_scheduler;
pub use server::{HubCommand, HubServer};
pub use subscribers::{SubscriberId, SubscriberSet, Subscribers};

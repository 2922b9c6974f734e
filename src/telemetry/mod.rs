pub mod accumulator;
pub mod aggregator;
pub mod events;
pub mod filter;
pub mod finalizer;
pub mod history;
pub mod throttle;

pub use aggregator::Aggregator;
pub use events::Event;
pub use history::BoundedHistory;

pub mod collector;
pub mod reporter;
pub mod summary;
pub mod types;

pub use collector::MetricsCollector;
pub use summary::RunSummary;

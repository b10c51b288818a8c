//! Browser binding: the host seams over `web-sys`

pub mod log;
pub mod tree;
pub mod feed;
pub mod timers;
pub mod indicator;

pub use tree::{DomTree, MARKER_ATTRIBUTE};
pub use feed::{convert_records, BatchSink, DomFeed, DomSubscription};
pub use timers::{DomScheduler, TimerSink};
pub use indicator::ColourIndicator;

pub mod classify;
pub mod pipeline;
pub mod pool;
pub mod region;
pub mod source;
pub mod status;

pub use classify::{Classification, Classifier};
pub use pipeline::{run, JobContext, RunOptions};
pub use pool::{JobEvent, WorkerPool};
pub use source::{DataSource, SubscriptionData};
pub use status::{Phase, StatusTracker};

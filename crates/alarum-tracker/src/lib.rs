pub mod store;

pub use store::{QueryOp, RequestTracker, TrackedRequest};

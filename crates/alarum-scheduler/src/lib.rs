pub mod builder;
pub mod factory;

pub use builder::{RequestBuilder, Scheduler};
pub use factory::{ParamsValidity, RequestFactory, RequestParams};

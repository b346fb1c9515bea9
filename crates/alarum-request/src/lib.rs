pub mod claim;
pub mod endowment;
pub mod ledger;
pub mod payment;
pub mod request;
pub mod schedule;

pub use claim::ClaimState;
pub use endowment::{compute_endowment, validate_endowment};
pub use ledger::{DispatchError, Dispatcher, Ledger, MemoryLedger, RecordingDispatcher};
pub use payment::PaymentState;
pub use request::{
    AbortReason, CallSpec, CancelReceipt, ExecuteOutcome, ExecutionContext, Request, RequestMeta,
    RequestSnapshot,
};
pub use schedule::ScheduleWindow;

//! End-to-end lifecycle tests: schedule through the builder, discover via
//! the tracker, then claim, execute, cancel, and refund against the
//! request state machine, asserting solvency at every observable point.

use alarum_core::types::{AccountId, Balance, ChainTime};
use alarum_request::claim::ClaimState;
use alarum_request::ledger::{MemoryLedger, RecordingDispatcher};
use alarum_request::request::{AbortReason, ExecuteOutcome, ExecutionContext, Request};
use alarum_scheduler::{RequestBuilder, RequestFactory, Scheduler};
use alarum_tracker::{QueryOp, RequestTracker};

const BASE_PAYMENT: Balance = 10_000;
const ANCHOR: u128 = 20;

fn acct(tag: u8) -> AccountId {
    AccountId::from_bytes([tag; 32])
}

fn temp_tracker(name: &str) -> RequestTracker {
    let dir = std::env::temp_dir().join(format!("alarum_lifecycle_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    RequestTracker::open(&dir).expect("open temp tracker")
}

fn ctx(caller: AccountId, block: u64) -> ExecutionContext {
    ExecutionContext {
        caller,
        gas_price: ANCHOR,
        gas_provided: 1_000_000,
        chain: ChainTime::new(block, 0),
    }
}

/// Schedule the standard test request: window [1000, 1255), reserved 16,
/// freeze 10, claim window 255.
fn schedule_request(tracker: &RequestTracker, factory: &mut RequestFactory) -> Request {
    let requester = acct(1);
    let chain = ChainTime::new(100, 0);
    let builder = RequestBuilder::at_block(1_000)
        .destination(acct(9))
        .payload(b"wake".to_vec())
        .call_gas(200_000)
        .anchor_gas_price(ANCHOR)
        .base_payment(BASE_PAYMENT)
        .base_donation(100)
        .donation_benefactor(acct(2));
    let mut scheduler = Scheduler::new(factory, tracker);
    let (request, _) = scheduler
        .schedule(&requester, Balance::MAX, builder, &chain)
        .expect("schedule");
    request
}

#[test]
fn scheduled_request_is_discoverable_and_executable() {
    let tracker = temp_tracker("discover_execute");
    let mut factory = RequestFactory::new(acct(0xFA));
    let mut request = schedule_request(&tracker, &mut factory);

    // An executor polling the tracker finds the request by window start.
    let found = tracker
        .query(factory.id(), QueryOp::Gte, 500)
        .expect("query")
        .expect("a request is due");
    assert_eq!(found, request.id);
    assert_eq!(tracker.window_start_of(&found).unwrap(), Some(1_000));

    // Snapshot-driven readiness checks, then execution.
    let snap = request.snapshot();
    assert!(!snap.meta.was_called);
    assert!(snap.schedule.in_window(&ChainTime::new(1_100, 0)));

    let executor = acct(5);
    let mut ledger = MemoryLedger::new();
    let mut dispatcher = RecordingDispatcher::new(120_000);
    let outcome = request
        .execute(&ctx(executor.clone(), 1_100), &mut ledger, &mut dispatcher)
        .expect("execute");
    assert!(outcome.is_executed());
    assert!(request.is_solvent());
    assert!(ledger.balance_of(&executor) > 0, "executor was paid");
    assert!(ledger.balance_of(&acct(2)) > 0, "donation was swept");

    // Executed requests leave the index.
    tracker.remove_request(&request.id).expect("remove");
    assert!(!tracker.is_known_request(&request.id));
    assert_eq!(
        tracker.query(factory.id(), QueryOp::Gte, 0).unwrap(),
        None,
        "index is empty again"
    );
}

#[test]
fn reserved_window_scenario() {
    // window_start=1000, window_size=255, reserved=16; A claims with
    // deposit 2*payment+1; reserved window is [1000, 1016).
    let tracker = temp_tracker("reserved");
    let mut factory = RequestFactory::new(acct(0xFA));
    let mut request = schedule_request(&tracker, &mut factory);

    let a = acct(10);
    let b = acct(11);
    let stake = ClaimState::required_deposit(BASE_PAYMENT) + 1;
    request.claim(&ctx(a.clone(), 900), stake).expect("claim");
    assert!(request.is_solvent());

    let mut ledger = MemoryLedger::new();
    let mut dispatcher = RecordingDispatcher::new(120_000);

    // B is locked out at block 1005.
    let blocked = request
        .execute(&ctx(b, 1_005), &mut ledger, &mut dispatcher)
        .expect("blocked execute");
    assert_eq!(
        blocked,
        ExecuteOutcome::Aborted(AbortReason::ReservedForClaimer)
    );

    // A executes at block 1005 and recoups the deposit inside the payout.
    let outcome = request
        .execute(&ctx(a.clone(), 1_005), &mut ledger, &mut dispatcher)
        .expect("claimant execute");
    assert!(outcome.is_executed());
    assert!(request.meta.was_called && request.meta.was_successful);
    assert!(request.is_solvent());
    assert!(
        ledger.balance_of(&a) > stake,
        "payout covers the deposit plus payment and reimbursement"
    );
}

#[test]
fn stale_request_cancelled_for_reward_then_deposit_refunded() {
    let tracker = temp_tracker("stale_cancel");
    let mut factory = RequestFactory::new(acct(0xFA));
    let mut request = schedule_request(&tracker, &mut factory);

    let claimant = acct(10);
    let stake = ClaimState::required_deposit(BASE_PAYMENT) + 1;
    request
        .claim(&ctx(claimant.clone(), 950), stake)
        .expect("claim");

    // Nobody executed; the window closes at 1255. A janitor cancels.
    let janitor = acct(12);
    let mut ledger = MemoryLedger::new();
    let receipt = request
        .cancel(&ctx(janitor.clone(), 1_400), &mut ledger)
        .expect("cancel");
    assert!(receipt.reward > 0);
    assert_eq!(ledger.balance_of(&janitor), receipt.reward);
    assert!(request.meta.is_cancelled);
    assert!(request.is_solvent());

    // Cancel already returned the deposit; a refund finds nothing left.
    assert_eq!(ledger.balance_of(&claimant), stake);
    assert!(request
        .refund_claim_deposit(&ChainTime::new(1_400, 0), &mut ledger)
        .is_err());
}

#[test]
fn unexecuted_claim_deposit_survives_window_close() {
    let tracker = temp_tracker("deposit_refund");
    let mut factory = RequestFactory::new(acct(0xFA));
    let mut request = schedule_request(&tracker, &mut factory);

    let claimant = acct(10);
    let stake = ClaimState::required_deposit(BASE_PAYMENT) + 1;
    request
        .claim(&ctx(claimant.clone(), 950), stake)
        .expect("claim");

    // The window passes without execution or cancellation; the claimant
    // pulls the deposit back directly.
    let closed = ChainTime::new(1_300, 0);
    let mut ledger = MemoryLedger::new();
    let refunded = request
        .refund_claim_deposit(&closed, &mut ledger)
        .expect("refund");
    assert_eq!(refunded, stake);
    assert_eq!(ledger.balance_of(&claimant), stake);
    assert!(request.is_solvent());
}

#[test]
fn multiple_requests_walk_in_window_order() {
    let tracker = temp_tracker("walk_order");
    let mut factory = RequestFactory::new(acct(0xFA));
    let chain = ChainTime::new(100, 0);
    let mut ids = Vec::new();
    for window_start in [3_000u64, 1_000, 2_000] {
        let builder = RequestBuilder::at_block(window_start).destination(acct(9));
        let mut scheduler = Scheduler::new(&mut factory, &tracker);
        let (request, _) = scheduler
            .schedule(&acct(1), Balance::MAX, builder, &chain)
            .expect("schedule");
        ids.push((window_start, request.id));
    }
    ids.sort_by_key(|(ws, _)| *ws);

    let first = tracker
        .query(factory.id(), QueryOp::Gte, 0)
        .unwrap()
        .expect("first");
    assert_eq!(first, ids[0].1);
    let second = tracker.next_request(&first).unwrap().expect("second");
    assert_eq!(second, ids[1].1);
    let third = tracker.next_request(&second).unwrap().expect("third");
    assert_eq!(third, ids[2].1);
    assert_eq!(tracker.next_request(&third).unwrap(), None);
}

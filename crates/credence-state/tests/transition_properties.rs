//! Property tests for the verification request state machine.
//!
//! Drives requests through arbitrary operation sequences and checks that
//! only the defined edges are ever taken and that the timing fields obey
//! their invariants regardless of order.

use proptest::prelude::*;

use credence_core::{Determination, DocumentId, UserId};
use credence_state::{RequestKind, VerificationOutcome, VerificationRequest, VerificationStatus};

/// An operation a caller might attempt against a request.
#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Complete,
    Fail,
    Cancel,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Complete),
        Just(Op::Fail),
        Just(Op::Cancel),
    ]
}

fn apply(req: &mut VerificationRequest, op: Op) -> bool {
    let outcome = VerificationOutcome {
        determination: Determination::Positive,
        confidence: 0.9,
        tamper_suspected: false,
    };
    match op {
        Op::Start => req.start("claim").is_ok(),
        Op::Complete => req.complete(outcome, "verdict").is_ok(),
        Op::Fail => req.fail("fault").is_ok(),
        Op::Cancel => req.cancel("cancelled").is_ok(),
    }
}

/// The legal edge set of the machine.
fn is_legal_edge(from: VerificationStatus, to: VerificationStatus) -> bool {
    use VerificationStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (InProgress, Completed)
            | (InProgress, Failed)
            | (Pending, Cancelled)
            | (InProgress, Cancelled)
    )
}

proptest! {
    #[test]
    fn transitions_only_follow_defined_edges(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let mut req =
            VerificationRequest::new(DocumentId::new(), UserId::new(), RequestKind::AiAnalysis, 0);

        for op in ops {
            let _ = apply(&mut req, op);
        }

        for record in &req.transitions {
            prop_assert!(
                is_legal_edge(record.from_status, record.to_status),
                "illegal edge {} -> {}",
                record.from_status,
                record.to_status
            );
        }
    }

    #[test]
    fn terminal_states_reject_everything(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let mut req =
            VerificationRequest::new(DocumentId::new(), UserId::new(), RequestKind::AiAnalysis, 0);

        let mut reached_terminal_at: Option<usize> = None;
        for (i, op) in ops.iter().enumerate() {
            let accepted = apply(&mut req, *op);
            if let Some(t) = reached_terminal_at {
                prop_assert!(
                    !accepted,
                    "operation {:?} at index {} accepted after terminal at {}",
                    op, i, t
                );
            }
            if reached_terminal_at.is_none() && req.is_terminal() {
                reached_terminal_at = Some(i);
            }
        }
    }

    #[test]
    fn timing_fields_obey_invariants(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let mut req =
            VerificationRequest::new(DocumentId::new(), UserId::new(), RequestKind::AiAnalysis, 0);

        for op in ops {
            let _ = apply(&mut req, op);

            // started_at is present iff the request ever left Pending
            // through InProgress, and never precedes requested_at.
            if let Some(started) = req.started_at {
                prop_assert!(started >= req.requested_at);
            }
            // completed_at is present iff the request is terminal.
            prop_assert_eq!(req.completed_at.is_some(), req.is_terminal());
            // outcome only ever accompanies Completed.
            if req.outcome.is_some() {
                prop_assert_eq!(req.status, VerificationStatus::Completed);
            }
        }
    }
}

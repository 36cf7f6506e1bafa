//! # Verification Dispatcher
//!
//! The write path of the verification engine. `submit_verification`
//! composes the full admission pipeline — ownership check, entitlement
//! consumption, in-flight claim, request creation, dispatcher claim,
//! analyzer invocation — and the resolution path reconciles the
//! analyzer's (possibly late) answer back into the stores.
//!
//! ## Serialization points
//!
//! - The document's `active_request_id` slot is the at-most-one-in-flight
//!   claim: taken with an atomic conditional update, it serializes
//!   concurrent submits against the same document.
//! - `pending → in_progress` is likewise a conditional update, so no two
//!   workers can both claim a request.
//! - The per-user subscription counter increments inside a single
//!   write-locked closure: increment-and-check, not read-then-write.
//!
//! ## Ordering
//!
//! Quota is consumed before the request is created. If the in-flight
//! claim then fails, the consumed unit is NOT rolled back; it is logged
//! as a reconciliation discrepancy. A crash between the two steps loses
//! at most one unit — it can never grant unmetered work.
//!
//! ## Consistency
//!
//! Request terminal transitions are applied inside the parent document's
//! write entry, so a document read never interleaves between "request
//! went terminal" and "document status settled". Lock order is
//! documents → requests everywhere.

use chrono::Utc;
use uuid::Uuid;

use credence_analyzer::{AnalysisReport, AnalyzerError};
use credence_core::{DocumentId, FileReference, RequestId, Timestamp, UserId};
use credence_entitlement::Subscription;
use credence_state::{
    status_from_outcome, DocumentStatus, LifecycleEvent, RequestKind, VerificationOutcome,
    VerificationRequest, VerificationStatus,
};

use crate::auth::{can_write_document, Capability, CallerIdentity};
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Submit a document for verification.
///
/// Returns the created request: already terminal under blocking
/// dispatch, `in_progress` when resolution runs in the background.
pub async fn submit_verification(
    state: &AppState,
    caller: &CallerIdentity,
    document_id: Uuid,
    kind: RequestKind,
    priority: i32,
) -> Result<VerificationRequest, AppError> {
    let doc = state
        .documents
        .get(&document_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;

    let caps = caller.capabilities(state);
    if !can_write_document(caller, caps, &doc) {
        return Err(AppError::Forbidden(
            "only the document owner may request verification".into(),
        ));
    }

    // Cheap duplicate check before consuming quota. Not the
    // serialization point — the atomic claim below is — but it spares
    // the common duplicate submit its quota unit.
    if let Some(existing) = doc.active_request_id {
        return Err(AppError::RequestInFlight(format!(
            "document {document_id} already has verification request {existing} outstanding"
        )));
    }

    consume_quota(state, caller.user_id)?;

    let request = VerificationRequest::new(
        DocumentId::from_uuid(document_id),
        UserId::from_uuid(caller.user_id),
        kind,
        priority,
    );
    let request_id = *request.id.as_uuid();

    // Claim the at-most-one-in-flight slot.
    let claim = state.documents.try_update(&document_id, |doc| {
        if let Some(existing) = doc.active_request_id {
            return Err(existing);
        }
        doc.active_request_id = Some(request_id);
        doc.status = DocumentStatus::Pending;
        doc.updated_at = Utc::now();
        Ok(())
    });
    match claim {
        None => {
            tracing::error!(
                user_id = %caller.user_id,
                document_id = %document_id,
                "reconciliation discrepancy: quota unit consumed but document vanished before claim"
            );
            return Err(AppError::NotFound(format!("document {document_id} not found")));
        }
        Some(Err(existing)) => {
            tracing::error!(
                user_id = %caller.user_id,
                document_id = %document_id,
                in_flight = %existing,
                "reconciliation discrepancy: quota unit consumed but a verification is already in flight"
            );
            return Err(AppError::RequestInFlight(format!(
                "document {document_id} already has verification request {existing} outstanding"
            )));
        }
        Some(Ok(())) => {}
    }

    state.requests.insert(request_id, request);
    state.events.emit(LifecycleEvent::request(
        RequestId::from_uuid(request_id),
        VerificationStatus::Pending,
    ));
    state.events.emit(LifecycleEvent::document(
        DocumentId::from_uuid(document_id),
        DocumentStatus::Pending,
    ));

    // Claim pending → in_progress and hand off to the analyzer.
    let started = state
        .requests
        .try_update(&request_id, |r| r.start("dispatcher claim"));
    match started {
        Some(Ok(())) => {
            state.events.emit(LifecycleEvent::request(
                RequestId::from_uuid(request_id),
                VerificationStatus::InProgress,
            ));
            let file = doc.file_reference.clone();
            if state.config.blocking_dispatch {
                run_analysis(state.clone(), request_id, document_id, file).await;
            } else {
                let task_state = state.clone();
                tokio::spawn(async move {
                    run_analysis(task_state, request_id, document_id, file).await;
                });
            }
        }
        Some(Err(err)) => {
            // The request left pending before we claimed it (raced with
            // a cancellation). Nothing to dispatch.
            tracing::warn!(request_id = %request_id, error = %err, "dispatch claim lost");
        }
        None => {
            tracing::warn!(request_id = %request_id, "request removed before dispatch claim");
        }
    }

    state
        .requests
        .get(&request_id)
        .ok_or_else(|| AppError::Internal("request record missing after creation".into()))
}

/// Atomic increment-and-check against the caller's subscription.
///
/// Users without a subscription, or with a lapsed one, are admitted
/// under the implicit free tier for a fresh cycle.
fn consume_quota(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let now = Timestamp::now();
    state
        .subscriptions
        .get_or_insert_with(user_id, || Subscription::free_tier(UserId::from_uuid(user_id), now));

    let result = state.subscriptions.try_update(&user_id, |sub| {
        if !sub.is_current(now) {
            *sub = Subscription::free_tier(UserId::from_uuid(user_id), now);
        }
        sub.try_consume()
    });
    match result {
        Some(Ok(_used)) => Ok(()),
        Some(Err(err)) => Err(AppError::from(err)),
        None => Err(AppError::Internal("subscription record missing during admission".into())),
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Call the analyzer and reconcile its answer into the stores.
pub(crate) async fn run_analysis(
    state: AppState,
    request_id: Uuid,
    document_id: Uuid,
    file: FileReference,
) {
    let result = call_analyzer_with_retry(&state, &file).await;
    resolve_request(&state, request_id, document_id, result);
}

/// Invoke the analyzer under the configured timeout, retrying exactly
/// once (with backoff) after a transient error.
async fn call_analyzer_with_retry(
    state: &AppState,
    file: &FileReference,
) -> Result<AnalysisReport, AnalyzerError> {
    let timeout = state.config.analyzer_timeout;
    let mut attempt: u32 = 0;
    loop {
        let outcome = tokio::time::timeout(timeout, state.analyzer.analyze(file)).await;
        let err = match outcome {
            Ok(Ok(report)) => {
                report.validate()?;
                return Ok(report);
            }
            Ok(Err(err)) => err,
            Err(_elapsed) => AnalyzerError::Transient(format!(
                "analyzer call exceeded {}ms timeout",
                timeout.as_millis()
            )),
        };

        if attempt == 0 && err.is_transient() {
            attempt += 1;
            let delay = state.config.retry_base_delay * 2u32.pow(attempt);
            tracing::warn!(error = %err, delay_ms = delay.as_millis() as u64, "transient analyzer error, retrying once");
            tokio::time::sleep(delay).await;
            continue;
        }
        return Err(err);
    }
}

/// Why a resolution could not be applied.
enum ResolveSkip {
    /// The request had already left `in_progress` (e.g. cancelled);
    /// the analyzer's answer is discarded.
    NotInProgress,
    /// The request record is gone.
    RequestGone,
}

/// Apply the analyzer's answer: drive the request terminal and settle
/// the parent document's status in the same document-store write entry.
fn resolve_request(
    state: &AppState,
    request_id: Uuid,
    document_id: Uuid,
    result: Result<AnalysisReport, AnalyzerError>,
) {
    let threshold = state.config.verified_confidence_threshold;

    let applied = state.documents.try_update(&document_id, |doc| {
        let transition = state.requests.try_update(&request_id, |req| match &result {
            Ok(report) => {
                let outcome = VerificationOutcome {
                    determination: report.determination,
                    confidence: report.confidence,
                    tamper_suspected: report.tamper_suspected,
                };
                let reason = format!("analyzer determination: {}", report.determination);
                req.complete(outcome, &reason).map(|()| {
                    req.metadata = completion_metadata(report);
                    (VerificationStatus::Completed, Some(outcome))
                })
            }
            Err(err) => req.fail(&err.to_string()).map(|()| {
                req.metadata = failure_metadata(err);
                (VerificationStatus::Failed, None)
            }),
        });

        match transition {
            Some(Ok((new_status, outcome))) => {
                if doc.active_request_id == Some(request_id) {
                    doc.active_request_id = None;
                }
                // The just-completed request held the in-flight slot, so
                // it IS the most recent: its outcome decides directly.
                // Failures fall back to the corpus-derived status.
                let derived = match outcome {
                    Some(outcome) => status_from_outcome(&outcome, threshold),
                    None => derived_document_status(state, document_id, threshold),
                };
                let changed = doc.status != derived;
                doc.status = derived;
                doc.updated_at = Utc::now();
                Ok((new_status, changed, derived))
            }
            Some(Err(_)) => Err(ResolveSkip::NotInProgress),
            None => Err(ResolveSkip::RequestGone),
        }
    });

    match applied {
        Some(Ok((request_status, doc_changed, doc_status))) => {
            state.events.emit(LifecycleEvent::request(
                RequestId::from_uuid(request_id),
                request_status,
            ));
            if doc_changed {
                state.events.emit(LifecycleEvent::document(
                    DocumentId::from_uuid(document_id),
                    doc_status,
                ));
            }
        }
        Some(Err(ResolveSkip::NotInProgress)) => {
            tracing::warn!(
                request_id = %request_id,
                "discarding analyzer result for request no longer in progress"
            );
        }
        Some(Err(ResolveSkip::RequestGone)) => {
            tracing::warn!(request_id = %request_id, "analyzer result for removed request");
        }
        None => {
            // The document vanished mid-analysis. Fail-safe: the request
            // must still reach a terminal state.
            let _ = state.requests.try_update(&request_id, |req| {
                req.fail("parent document deleted during analysis")
            });
            tracing::warn!(
                request_id = %request_id,
                document_id = %document_id,
                "document deleted during analysis; request terminalized"
            );
        }
    }
}

/// Recompute a document's stored status from its request corpus.
///
/// An active request dominates; otherwise the most recently completed
/// request's outcome decides; with no completed request the document is
/// back to plain `uploaded`.
fn derived_document_status(state: &AppState, document_id: Uuid, threshold: f64) -> DocumentStatus {
    let requests: Vec<VerificationRequest> = state
        .requests
        .list()
        .into_iter()
        .filter(|r| *r.document_id.as_uuid() == document_id)
        .collect();

    if requests.iter().any(|r| r.status.is_active()) {
        return DocumentStatus::Pending;
    }

    let latest_completed = requests
        .iter()
        .filter(|r| r.status == VerificationStatus::Completed)
        .max_by_key(|r| r.completed_at);

    match latest_completed.and_then(|r| r.outcome) {
        Some(outcome) => status_from_outcome(&outcome, threshold),
        None => DocumentStatus::Uploaded,
    }
}

fn completion_metadata(report: &AnalysisReport) -> serde_json::Value {
    serde_json::json!({
        "determination": report.determination,
        "confidence": report.confidence,
        "extracted_fields": report.extracted_fields,
        "explanation": report.explanation,
        "tamper_suspected": report.tamper_suspected,
    })
}

fn failure_metadata(err: &AnalyzerError) -> serde_json::Value {
    serde_json::json!({
        "error": err.to_string(),
        "transient": err.is_transient(),
    })
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cancel a verification request.
///
/// Idempotent: cancelling a request already in a terminal state returns
/// the existing record unchanged. Cancellation of an in-flight request
/// is best-effort — the analyzer call is not interrupted, but its late
/// result is discarded by [`resolve_request`].
pub fn cancel_verification(
    state: &AppState,
    caller: &CallerIdentity,
    request_id: Uuid,
) -> Result<VerificationRequest, AppError> {
    let request = state
        .requests
        .get(&request_id)
        .ok_or_else(|| AppError::NotFound(format!("verification request {request_id} not found")))?;

    let caps = caller.capabilities(state);
    let is_requester = *request.requested_by.as_uuid() == caller.user_id;
    if !(caps.has(Capability::WriteAll) || (is_requester && caps.has(Capability::WriteOwn))) {
        return Err(AppError::Forbidden(
            "only the requester or an operator may cancel a verification".into(),
        ));
    }

    if request.is_terminal() {
        return Ok(request);
    }

    let reason = if is_requester {
        "cancelled by requester"
    } else {
        "cancelled by operator"
    };
    let threshold = state.config.verified_confidence_threshold;
    let document_id = *request.document_id.as_uuid();

    let applied = state.documents.try_update(&document_id, |doc| {
        let transition = state.requests.try_update(&request_id, |r| r.cancel(reason));
        match transition {
            Some(Ok(())) => {
                if doc.active_request_id == Some(request_id) {
                    doc.active_request_id = None;
                }
                let derived = derived_document_status(state, document_id, threshold);
                let changed = doc.status != derived;
                doc.status = derived;
                doc.updated_at = Utc::now();
                Ok((changed, derived))
            }
            // Raced to a terminal state between our read and the lock;
            // idempotence says return the terminal record, not an error.
            Some(Err(_)) => Err(()),
            None => Err(()),
        }
    });

    if let Some(Ok((doc_changed, doc_status))) = applied {
        state.events.emit(LifecycleEvent::request(
            RequestId::from_uuid(request_id),
            VerificationStatus::Cancelled,
        ));
        if doc_changed {
            state.events.emit(LifecycleEvent::document(
                DocumentId::from_uuid(document_id),
                doc_status,
            ));
        }
    } else if applied.is_none() {
        // Parent document already gone; still make sure the request
        // cannot stay non-terminal.
        let _ = state.requests.try_update(&request_id, |r| r.cancel(reason));
    }

    state
        .requests
        .get(&request_id)
        .ok_or_else(|| AppError::NotFound(format!("verification request {request_id} not found")))
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Delete a document, cascading to its verification requests.
///
/// Non-completed requests are removed with the document. Completed
/// requests are retained for audit unless `purge` is set, which requires
/// the operator capability.
pub fn delete_document(
    state: &AppState,
    caller: &CallerIdentity,
    document_id: Uuid,
    purge: bool,
) -> Result<(), AppError> {
    let doc = state
        .documents
        .get(&document_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;

    let caps = caller.capabilities(state);
    if !can_write_document(caller, caps, &doc) {
        return Err(AppError::Forbidden("only the document owner may delete it".into()));
    }
    if purge && !caps.has(Capability::WriteAll) {
        return Err(AppError::Forbidden(
            "purging completed verifications requires operator access".into(),
        ));
    }

    // Cancel anything outstanding so a late analyzer result is discarded.
    for request in requests_for_document(state, document_id) {
        if request.status.is_active() {
            let id = *request.id.as_uuid();
            let cancelled = state
                .requests
                .try_update(&id, |r| r.cancel("document deleted"));
            if let Some(Ok(())) = cancelled {
                state.events.emit(LifecycleEvent::request(
                    request.id,
                    VerificationStatus::Cancelled,
                ));
            }
        }
    }

    for request in requests_for_document(state, document_id) {
        if purge || request.status != VerificationStatus::Completed {
            state.requests.remove(request.id.as_uuid());
        }
    }

    state.documents.remove(&document_id);
    Ok(())
}

/// All requests referencing a document, oldest first.
pub(crate) fn requests_for_document(
    state: &AppState,
    document_id: Uuid,
) -> Vec<VerificationRequest> {
    let mut requests: Vec<VerificationRequest> = state
        .requests
        .list()
        .into_iter()
        .filter(|r| *r.document_id.as_uuid() == document_id)
        .collect();
    requests.sort_by_key(|r| r.requested_at);
    requests
}

//! Request lifecycle: send, accept and reject for both request kinds.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fyp_db::{Connection, Database, groups, requests, students};
use fyp_types::events::MatchEvent;
use fyp_types::models::{Request, RequestFilter, RequestKind, RequestStatus};

use crate::eligibility::{self, Participant, SendContext};
use crate::error::{MatchError, Result, constraint_as};
use crate::events::EventSink;
use crate::formation::{self, MergeOutcome};

/// Result of a successful accept.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub request: Request,
    /// Set for partner requests: the group the two students now share.
    pub group: Option<MergeOutcome>,
}

/// Send, accept and reject for both request kinds.
pub struct RequestService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl RequestService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        Self { db, events }
    }

    pub fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        kind: RequestKind,
        reason: Option<String>,
    ) -> Result<Request> {
        let request: Result<Request> = self.db.transaction(|tx| {
            let ctx = SendContext {
                sender_id,
                receiver_id,
                sender: load_participant(tx, sender_id)?,
                receiver: load_participant(tx, receiver_id)?,
                duplicate_pending: requests::has_pending(tx, sender_id, receiver_id, kind)?,
            };
            let request = eligibility::validate_send(kind, &ctx, reason)?;

            requests::insert_request(tx, &request)
                .map_err(|e| constraint_as(e, MatchError::DuplicateRequest(kind)))?;
            Ok(request)
        });

        let request = request.inspect_err(|e| {
            debug!(%sender_id, %receiver_id, %kind, error = %e, "Send refused");
        })?;

        info!(request_id = %request.id, %sender_id, %receiver_id, %kind, "Request sent");
        self.publish_request(&request);
        Ok(request)
    }

    /// Accept a pending request addressed to `acting_student_id`.
    ///
    /// For partner requests the group merge and the status change commit
    /// together; if the merge fails the request stays pending.
    pub fn accept(&self, request_id: Uuid, acting_student_id: Uuid, kind: RequestKind) -> Result<Accepted> {
        let accepted: Result<Accepted> = self.db.transaction(|tx| {
            let mut request = load_actionable(tx, request_id, acting_student_id, kind)?;

            let group = apply_acceptance(tx, &request)?;

            let now = Utc::now();
            if !requests::resolve(tx, request.id, RequestStatus::Accepted, now)? {
                return Err(MatchError::AlreadyProcessed(request.id));
            }
            request.status = RequestStatus::Accepted;
            request.responded_at = Some(now);

            Ok(Accepted { request, group })
        });

        let accepted = accepted.inspect_err(|e| {
            if e.is_retryable() {
                warn!(%request_id, "Accept lost a serialization race");
            } else {
                debug!(%request_id, error = %e, "Accept refused");
            }
        })?;

        info!(%request_id, %kind, "Request accepted");
        self.publish_request(&accepted.request);
        if let Some(group) = accepted.group {
            self.events.publish(MatchEvent::GroupChanged {
                group_id: group.group_id,
                member_count: group.member_count,
                is_locked: group.is_locked,
            });
        }
        Ok(accepted)
    }

    pub fn reject(&self, request_id: Uuid, acting_student_id: Uuid, kind: RequestKind) -> Result<Request> {
        let request: Result<Request> = self.db.transaction(|tx| {
            let mut request = load_actionable(tx, request_id, acting_student_id, kind)?;

            let now = Utc::now();
            if !requests::resolve(tx, request.id, RequestStatus::Rejected, now)? {
                return Err(MatchError::AlreadyProcessed(request.id));
            }
            request.status = RequestStatus::Rejected;
            request.responded_at = Some(now);
            Ok(request)
        });
        let request = request?;

        info!(%request_id, %kind, "Request rejected");
        self.publish_request(&request);
        Ok(request)
    }

    /// Read one request. Only its two participants may see it.
    pub fn get(&self, request_id: Uuid, viewer_id: Uuid) -> Result<Request> {
        let request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| MatchError::not_found("Request", request_id))?;
        if !request.involves(viewer_id) {
            return Err(MatchError::Unauthorized(request_id));
        }
        Ok(request)
    }

    pub fn list(&self, student_id: Uuid, filter: RequestFilter) -> Result<Vec<Request>> {
        Ok(self.db.list_requests(student_id, filter)?)
    }

    fn publish_request(&self, request: &Request) {
        self.events.publish(MatchEvent::RequestChanged {
            request_id: request.id,
            kind: request.kind,
            from_id: request.from_student_id,
            to_id: request.to_student_id,
            status: request.status,
        });
    }
}

fn load_participant(conn: &Connection, student_id: Uuid) -> Result<Option<Participant>> {
    let Some(student) = students::get_student(conn, student_id)? else {
        return Ok(None);
    };
    let membership = groups::membership_of(conn, student_id)?;
    Ok(Some(Participant { student, membership }))
}

/// Checks shared by accept and reject, in order: existence, kind, status, recipient.
fn load_actionable(conn: &Connection, request_id: Uuid, acting_student_id: Uuid, kind: RequestKind) -> Result<Request> {
    let request = requests::get_request(conn, request_id)?
        .ok_or_else(|| MatchError::not_found("Request", request_id))?;

    if request.kind != kind {
        return Err(MatchError::TypeMismatch(request_id, kind));
    }
    if request.status.is_terminal() {
        return Err(MatchError::AlreadyProcessed(request_id));
    }
    if request.to_student_id != acting_student_id {
        return Err(MatchError::Unauthorized(request_id));
    }
    Ok(request)
}

/// Per-kind side effects of accepting. Message requests have none.
fn apply_acceptance(conn: &Connection, request: &Request) -> Result<Option<MergeOutcome>> {
    match request.kind {
        RequestKind::Message => Ok(None),
        RequestKind::Partner => {
            formation::merge(conn, request.from_student_id, request.to_student_id).map(Some)
        }
    }
}

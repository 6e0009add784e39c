//! Send-time eligibility rules.
//!
//! Everything here is pure: callers load the snapshot (inside the same
//! transaction that will insert the request) and these functions decide.
//! Partner requests carry the full rule set; message requests only reject
//! self-addressed, dangling and duplicate sends.

use uuid::Uuid;

use fyp_types::models::{Membership, Request, RequestKind, Student};

use crate::error::{MatchError, Result};

/// A student as loaded for an eligibility decision.
#[derive(Debug, Clone)]
pub struct Participant {
    pub student: Student,
    pub membership: Option<Membership>,
}

/// Everything the checker needs to decide on one send.
#[derive(Debug, Clone)]
pub struct SendContext {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub sender: Option<Participant>,
    pub receiver: Option<Participant>,
    /// An open request of the same kind already exists sender → receiver.
    pub duplicate_pending: bool,
}

pub fn validate_send(kind: RequestKind, ctx: &SendContext, reason: Option<String>) -> Result<Request> {
    match kind {
        RequestKind::Partner => validate_send_partner(ctx, reason),
        RequestKind::Message => validate_send_message(ctx, reason),
    }
}

pub fn validate_send_partner(ctx: &SendContext, reason: Option<String>) -> Result<Request> {
    let (sender, receiver) = resolve_parties(ctx)?;

    check_partner_pair(&sender.student, &receiver.student)?;

    for membership in [sender.membership, receiver.membership].into_iter().flatten() {
        if membership.is_locked {
            return Err(MatchError::GroupLocked(membership.group_id));
        }
    }
    if let Some(membership) = sender.membership {
        if membership.is_full() {
            return Err(MatchError::GroupFull(membership.group_id));
        }
    }

    if ctx.duplicate_pending {
        return Err(MatchError::DuplicateRequest(RequestKind::Partner));
    }

    Ok(Request::pending(
        RequestKind::Partner,
        ctx.sender_id,
        ctx.receiver_id,
        normalize_reason(reason),
    ))
}

pub fn validate_send_message(ctx: &SendContext, reason: Option<String>) -> Result<Request> {
    resolve_parties(ctx)?;

    if ctx.duplicate_pending {
        return Err(MatchError::DuplicateRequest(RequestKind::Message));
    }

    Ok(Request::pending(
        RequestKind::Message,
        ctx.sender_id,
        ctx.receiver_id,
        normalize_reason(reason),
    ))
}

/// Rules a partner pairing must satisfy both when sent and when accepted.
pub fn check_partner_pair(sender: &Student, receiver: &Student) -> Result<()> {
    for student in [sender, receiver] {
        if !student.is_active() {
            return Err(MatchError::AccountInactive(student.id));
        }
    }
    if sender.current_semester != receiver.current_semester {
        return Err(MatchError::SemesterMismatch(
            sender.current_semester,
            receiver.current_semester,
        ));
    }
    Ok(())
}

fn resolve_parties(ctx: &SendContext) -> Result<(&Participant, &Participant)> {
    if ctx.sender_id == ctx.receiver_id {
        return Err(MatchError::SelfRequest);
    }
    let sender = ctx
        .sender
        .as_ref()
        .ok_or_else(|| MatchError::not_found("Student", ctx.sender_id))?;
    let receiver = ctx
        .receiver
        .as_ref()
        .ok_or_else(|| MatchError::not_found("Student", ctx.receiver_id))?;
    Ok((sender, receiver))
}

fn normalize_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fyp_types::models::{AccountStatus, RequestStatus};

    fn participant(semester: u32, membership: Option<Membership>) -> Participant {
        Participant {
            student: Student {
                id: Uuid::new_v4(),
                display_name: "student".into(),
                current_semester: semester,
                account_status: AccountStatus::Active,
            },
            membership,
        }
    }

    fn ctx(sender: Participant, receiver: Participant) -> SendContext {
        SendContext {
            sender_id: sender.student.id,
            receiver_id: receiver.student.id,
            sender: Some(sender),
            receiver: Some(receiver),
            duplicate_pending: false,
        }
    }

    fn membership(count: u32, locked: bool) -> Option<Membership> {
        Some(Membership {
            group_id: Uuid::new_v4(),
            is_locked: locked,
            member_count: count,
        })
    }

    #[test]
    fn partner_request_between_ungrouped_peers() {
        let c = ctx(participant(5, None), participant(5, None));
        let request = validate_send_partner(&c, Some("  build a compiler  ".into())).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.kind, RequestKind::Partner);
        assert_eq!(request.from_student_id, c.sender_id);
        assert_eq!(request.reason.as_deref(), Some("build a compiler"));
    }

    #[test]
    fn self_request_is_checked_before_existence() {
        let id = Uuid::new_v4();
        let c = SendContext {
            sender_id: id,
            receiver_id: id,
            sender: None,
            receiver: None,
            duplicate_pending: false,
        };
        assert!(matches!(validate_send_partner(&c, None), Err(MatchError::SelfRequest)));
        assert!(matches!(validate_send_message(&c, None), Err(MatchError::SelfRequest)));
    }

    #[test]
    fn missing_receiver_is_not_found() {
        let mut c = ctx(participant(5, None), participant(5, None));
        c.receiver = None;
        let err = validate_send_partner(&c, None).unwrap_err();
        assert!(matches!(err, MatchError::NotFound { id, .. } if id == c.receiver_id));
    }

    #[test]
    fn semester_must_match_for_partners_only() {
        let c = ctx(participant(5, None), participant(6, None));
        assert!(matches!(
            validate_send_partner(&c, None),
            Err(MatchError::SemesterMismatch(5, 6))
        ));
        assert!(validate_send_message(&c, None).is_ok());
    }

    #[test]
    fn locked_group_on_either_side_blocks() {
        let c = ctx(participant(5, None), participant(5, membership(3, true)));
        assert!(matches!(validate_send_partner(&c, None), Err(MatchError::GroupLocked(_))));

        let c = ctx(participant(5, membership(2, true)), participant(5, None));
        assert!(matches!(validate_send_partner(&c, None), Err(MatchError::GroupLocked(_))));
    }

    #[test]
    fn full_sender_group_blocks() {
        // A full but unlocked group should not exist; the checker still refuses it.
        let c = ctx(participant(5, membership(3, false)), participant(5, None));
        assert!(matches!(validate_send_partner(&c, None), Err(MatchError::GroupFull(_))));
    }

    #[test]
    fn duplicate_pending_is_rejected_for_both_kinds() {
        let mut c = ctx(participant(5, None), participant(5, None));
        c.duplicate_pending = true;
        assert!(matches!(
            validate_send(RequestKind::Partner, &c, None),
            Err(MatchError::DuplicateRequest(RequestKind::Partner))
        ));
        assert!(matches!(
            validate_send(RequestKind::Message, &c, None),
            Err(MatchError::DuplicateRequest(RequestKind::Message))
        ));
    }

    #[test]
    fn suspended_account_cannot_partner() {
        let mut receiver = participant(5, None);
        receiver.student.account_status = AccountStatus::Suspended;
        let c = ctx(participant(5, None), receiver);
        assert!(matches!(
            validate_send_partner(&c, None),
            Err(MatchError::AccountInactive(_))
        ));
        assert!(validate_send_message(&c, None).is_ok());
    }

    #[test]
    fn blank_reason_is_dropped() {
        let c = ctx(participant(5, None), participant(5, None));
        let request = validate_send_message(&c, Some("   ".into())).unwrap();
        assert_eq!(request.reason, None);
    }
}

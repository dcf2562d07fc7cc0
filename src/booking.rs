//! Booking lifecycle: which status each action leads to, who may trigger it
//! and which notification it produces.
//!
//! ```text
//! create   -> PENDING    notify tutor
//! confirm  -> CONFIRMED  notify student
//! complete -> COMPLETED  (silent)
//! cancel   -> CANCELLED  notify the party that did not cancel
//! reject   -> REJECTED   notify student
//! ```
//!
//! The prior status is not checked: any action applies to any booking.
//! [`BookingAction::leaves_terminal`] lets callers flag moves out of a
//! finished booking.

use uuid::Uuid;

use crate::entity::enums::{BookingStatus, NotificationType, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Confirm,
    Complete,
    Cancel,
    Reject,
}

/// One side of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Student,
    Tutor,
}

/// Whose name goes into the notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Student,
    Tutor,
    Actor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticePlan {
    pub recipient: Party,
    pub title: &'static str,
    pub notification_type: NotificationType,
    pub named: NameSource,
    template: &'static str,
}

impl NoticePlan {
    pub fn body(&self, name: &str) -> String {
        self.template.replace("{name}", name)
    }

    pub fn link(&self, booking_id: Uuid) -> String {
        booking_link(self.recipient, booking_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: BookingStatus,
    pub notice: Option<NoticePlan>,
}

/// The participants of a booking as seen by the authorization check.
#[derive(Debug, Clone, Copy)]
pub struct Participants {
    pub student_id: Uuid,
    pub tutor_id: Uuid,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Complete => "complete",
            BookingAction::Cancel => "cancel",
            BookingAction::Reject => "reject",
        }
    }

    pub fn target_status(&self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Complete => BookingStatus::Completed,
            BookingAction::Cancel => BookingStatus::Cancelled,
            BookingAction::Reject => BookingStatus::Rejected,
        }
    }

    /// True when the booking is already finished and the action would reopen
    /// or rewrite it.
    pub fn leaves_terminal(&self, current: BookingStatus) -> bool {
        current.is_terminal() && current != self.target_status()
    }

    /// Admins may do anything. Tutors drive confirm/complete/reject; either
    /// participant may cancel.
    pub fn is_allowed(&self, participants: Participants, actor_id: Uuid, actor_role: Role) -> bool {
        if actor_role == Role::Admin {
            return true;
        }
        match self {
            BookingAction::Cancel => {
                actor_id == participants.student_id || actor_id == participants.tutor_id
            }
            _ => actor_id == participants.tutor_id,
        }
    }

    pub fn plan(&self, canceller_is_student: bool) -> TransitionPlan {
        let notice = match self {
            BookingAction::Confirm => Some(NoticePlan {
                recipient: Party::Student,
                title: "Booking Confirmed",
                notification_type: NotificationType::BookingConfirmation,
                named: NameSource::Tutor,
                template: "Your booking with {name} has been confirmed.",
            }),
            BookingAction::Complete => None,
            BookingAction::Cancel => Some(NoticePlan {
                recipient: if canceller_is_student {
                    Party::Tutor
                } else {
                    Party::Student
                },
                title: "Booking Cancelled",
                notification_type: NotificationType::BookingCancellation,
                named: NameSource::Actor,
                template: "Your booking with {name} has been cancelled.",
            }),
            BookingAction::Reject => Some(NoticePlan {
                recipient: Party::Student,
                title: "Booking Rejected",
                notification_type: NotificationType::BookingCancellation,
                named: NameSource::Tutor,
                template: "Your booking with {name} has been rejected.",
            }),
        };

        TransitionPlan {
            status: self.target_status(),
            notice,
        }
    }
}

/// Notice sent to the tutor when a student requests a booking.
pub fn request_notice() -> NoticePlan {
    NoticePlan {
        recipient: Party::Tutor,
        title: "New Booking Request",
        notification_type: NotificationType::BookingRequest,
        named: NameSource::Student,
        template: "You have a new booking request from {name}",
    }
}

pub fn booking_link(recipient: Party, booking_id: Uuid) -> String {
    match recipient {
        Party::Student => format!("/student/bookings/{booking_id}"),
        Party::Tutor => format!("/tutor/bookings/{booking_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participants() -> (Participants, Uuid, Uuid) {
        let student = Uuid::new_v4();
        let tutor = Uuid::new_v4();
        (
            Participants {
                student_id: student,
                tutor_id: tutor,
            },
            student,
            tutor,
        )
    }

    #[test]
    fn confirm_notifies_student() {
        let plan = BookingAction::Confirm.plan(false);
        assert_eq!(plan.status, BookingStatus::Confirmed);
        let notice = plan.notice.expect("confirm sends a notice");
        assert_eq!(notice.recipient, Party::Student);
        assert_eq!(notice.title, "Booking Confirmed");
        assert_eq!(notice.notification_type, NotificationType::BookingConfirmation);
        assert_eq!(
            notice.body("Ada Lovelace"),
            "Your booking with Ada Lovelace has been confirmed."
        );
    }

    #[test]
    fn complete_is_silent() {
        let plan = BookingAction::Complete.plan(false);
        assert_eq!(plan.status, BookingStatus::Completed);
        assert!(plan.notice.is_none());
    }

    #[test]
    fn cancel_notifies_the_other_party() {
        let by_student = BookingAction::Cancel.plan(true).notice.unwrap();
        assert_eq!(by_student.recipient, Party::Tutor);
        assert_eq!(by_student.named, NameSource::Actor);

        let by_tutor = BookingAction::Cancel.plan(false).notice.unwrap();
        assert_eq!(by_tutor.recipient, Party::Student);
    }

    #[test]
    fn reject_uses_cancellation_type() {
        let notice = BookingAction::Reject.plan(false).notice.unwrap();
        assert_eq!(notice.recipient, Party::Student);
        assert_eq!(notice.title, "Booking Rejected");
        assert_eq!(notice.notification_type, NotificationType::BookingCancellation);
    }

    #[test]
    fn links_point_at_the_recipient_dashboard() {
        let id = Uuid::nil();
        let student = BookingAction::Confirm.plan(false).notice.unwrap();
        assert_eq!(
            student.link(id),
            "/student/bookings/00000000-0000-0000-0000-000000000000"
        );
        let tutor = BookingAction::Cancel.plan(true).notice.unwrap();
        assert_eq!(
            tutor.link(id),
            "/tutor/bookings/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn request_notice_goes_to_tutor() {
        let notice = request_notice();
        assert_eq!(notice.recipient, Party::Tutor);
        assert_eq!(notice.title, "New Booking Request");
        assert_eq!(
            notice.body("Sam Student"),
            "You have a new booking request from Sam Student"
        );
    }

    #[test]
    fn only_tutor_or_admin_may_confirm() {
        let (p, student, tutor) = participants();
        assert!(BookingAction::Confirm.is_allowed(p, tutor, Role::Tutor));
        assert!(!BookingAction::Confirm.is_allowed(p, student, Role::Student));
        assert!(BookingAction::Confirm.is_allowed(p, Uuid::new_v4(), Role::Admin));
        assert!(!BookingAction::Reject.is_allowed(p, Uuid::new_v4(), Role::Tutor));
    }

    #[test]
    fn either_participant_may_cancel() {
        let (p, student, tutor) = participants();
        assert!(BookingAction::Cancel.is_allowed(p, student, Role::Student));
        assert!(BookingAction::Cancel.is_allowed(p, tutor, Role::Tutor));
        assert!(!BookingAction::Cancel.is_allowed(p, Uuid::new_v4(), Role::Student));
    }

    #[test]
    fn leaving_a_terminal_state_is_flagged() {
        assert!(BookingAction::Complete.leaves_terminal(BookingStatus::Rejected));
        assert!(BookingAction::Confirm.leaves_terminal(BookingStatus::Cancelled));
        assert!(!BookingAction::Cancel.leaves_terminal(BookingStatus::Cancelled));
        assert!(!BookingAction::Confirm.leaves_terminal(BookingStatus::Pending));
    }
}

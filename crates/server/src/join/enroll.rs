//! Enrollment commit.
//!
//! One idempotent insert instead of a check-then-insert pair: the composite
//! primary key on `classroom_students` decides, and a conflict is the
//! non-fatal "already enrolled" outcome rather than an error. Two racing
//! join attempts for the same pair cannot both create a row.

use crate::db::{Database, Invitation};
use crate::error::AppError;

#[derive(Debug, PartialEq, Eq)]
pub enum EnrollOutcome {
    Created,
    AlreadyEnrolled,
}

pub async fn commit_enrollment(
    db: &Database,
    classroom_id: &str,
    student_id: &str,
    invitation: Option<&Invitation>,
) -> Result<EnrollOutcome, AppError> {
    let inserted = db.insert_enrollment(classroom_id, student_id).await?;
    if !inserted {
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    // Consume the invitation only on a fresh enrollment; a repeated join
    // leaves it untouched.
    if let Some(invitation) = invitation {
        db.mark_invitation_accepted(&invitation.token).await?;
        tracing::info!(
            "Invitation {} accepted for classroom {}",
            invitation.token,
            classroom_id
        );
    }

    Ok(EnrollOutcome::Created)
}

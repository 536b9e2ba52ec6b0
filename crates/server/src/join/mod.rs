//! The classroom join flow.
//!
//! One attempt runs the stages strictly in order, each awaited before the
//! next: normalize the code, resolve an invitation or classroom, ensure the
//! caller has a student profile, commit the enrollment. Any stage failure
//! ends the attempt; there is no retry and no rollback. A profile created
//! before a later stage fails is deliberately left in place: creation is
//! idempotent and the next attempt reuses it.

mod enroll;
mod profile;
mod resolver;

pub use enroll::EnrollOutcome;
pub use profile::ensure_student_profile;

use crate::db::{Classroom, Database, User};
use resolver::ResolvedTarget;
use crate::error::AppError;
use shared::normalize_join_code;

#[derive(Debug)]
pub enum JoinOutcome {
    Joined { classroom: Classroom },
    AlreadyEnrolled { classroom: Classroom },
}

impl JoinOutcome {
    pub fn classroom(&self) -> &Classroom {
        match self {
            JoinOutcome::Joined { classroom } => classroom,
            JoinOutcome::AlreadyEnrolled { classroom } => classroom,
        }
    }
}

pub async fn join_with_code(
    db: &Database,
    user: &User,
    raw_code: &str,
) -> Result<JoinOutcome, AppError> {
    let code = normalize_join_code(raw_code).ok_or_else(|| {
        AppError::BadRequest("enter the class code from your invitation".to_string())
    })?;
    tracing::debug!("Join code {:?} normalized to {}", raw_code, code);

    // An existing profile (if any) lets the resolver recognize the caller's
    // own consumed token. The profile itself is still ensured only after
    // resolution succeeds.
    let existing_profile = db.get_student_profile_by_user(&user.id).await?;
    let target = resolver::resolve(db, &code, existing_profile.as_ref().map(|p| p.id.as_str())).await?;
    let (classroom, invitation) = match target {
        ResolvedTarget::Invitation {
            invitation,
            classroom,
        } => (classroom, Some(invitation)),
        ResolvedTarget::Classroom(classroom) => (classroom, None),
    };
    tracing::debug!("Code {} resolved to classroom {}", code, classroom.id);

    let student = profile::ensure_student_profile(db, user).await?;

    let outcome =
        enroll::commit_enrollment(db, &classroom.id, &student.id, invitation.as_ref()).await?;

    match outcome {
        EnrollOutcome::Created => {
            tracing::info!("Student {} joined classroom {}", student.id, classroom.id);
            Ok(JoinOutcome::Joined { classroom })
        }
        EnrollOutcome::AlreadyEnrolled => {
            Ok(JoinOutcome::AlreadyEnrolled { classroom })
        }
    }
}

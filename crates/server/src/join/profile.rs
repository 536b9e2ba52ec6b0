//! Lazy student-profile creation.

use crate::db::{Database, StudentProfile, User};
use crate::error::AppError;
use shared::Role;
use uuid::Uuid;

/// Return the caller's student profile, creating it (plus a `student` role
/// assignment) on first contact. Safe to call on every join attempt: an
/// existing profile is returned as-is, and the role upsert never replaces
/// an assignment that is already there.
pub async fn ensure_student_profile(
    db: &Database,
    user: &User,
) -> Result<StudentProfile, AppError> {
    if let Some(profile) = db.get_student_profile_by_user(&user.id).await? {
        return Ok(profile);
    }

    let profile = StudentProfile {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        name: display_name_from_email(&user.email),
        school: None,
        points: 0,
        created_at: None,
    };
    db.create_student_profile(&profile).await?;
    db.upsert_role(&user.id, Role::Student.as_str()).await?;

    tracing::info!("Created student profile {} for user {}", profile.id, user.id);
    Ok(profile)
}

fn display_name_from_email(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "student".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_local_part() {
        assert_eq!(display_name_from_email("ana.perez@school.edu"), "ana.perez");
    }

    #[test]
    fn degenerate_addresses_get_a_placeholder() {
        assert_eq!(display_name_from_email("@school.edu"), "student");
        assert_eq!(display_name_from_email(""), "student");
    }
}

//! Invitation/classroom resolution.
//!
//! Invitation tokens are the primary path. The classroom matchers exist to
//! tolerate users pasting a classroom identifier or name instead of the
//! token. Each strategy is its own function; `resolve` composes them in
//! order and stops at the first hit.

use crate::db::{Classroom, Database, Invitation};
use crate::error::AppError;

/// How many leading id characters count as the "short id" shown in the UI.
const SHORT_ID_LEN: usize = 6;

#[derive(Debug)]
pub enum ResolvedTarget {
    /// A pending invitation, with the classroom it opens.
    Invitation {
        invitation: Invitation,
        classroom: Classroom,
    },
    /// A classroom matched directly by id or name, no invitation involved.
    Classroom(Classroom),
}

/// `student_id` is the caller's existing profile, when they have one. It
/// only gates the spent-token fallback below; every other strategy is
/// caller-independent.
pub async fn resolve(
    db: &Database,
    code: &str,
    student_id: Option<&str>,
) -> Result<ResolvedTarget, AppError> {
    // 1-2. invitation token, exact then case-insensitive
    let invitation = match db.get_pending_invitation(code).await? {
        Some(inv) => Some(inv),
        None => db.get_pending_invitation_ci(code).await?,
    };
    if let Some(invitation) = invitation {
        let classroom = db
            .get_classroom(&invitation.classroom_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "invitation {} points at a missing classroom",
                    invitation.token
                ))
            })?;
        return Ok(ResolvedTarget::Invitation {
            invitation,
            classroom,
        });
    }

    // A token the caller already consumed still identifies its classroom,
    // so their resubmission reports "already enrolled" instead of "not
    // found". For anyone else a consumed token is dead: it must not keep
    // working as an open join code.
    if let Some(student_id) = student_id {
        if let Some(spent) = db.get_invitation(code).await? {
            if db
                .get_enrollment(&spent.classroom_id, student_id)
                .await?
                .is_some()
            {
                if let Some(classroom) = db.get_classroom(&spent.classroom_id).await? {
                    return Ok(ResolvedTarget::Classroom(classroom));
                }
            }
        }
    }

    // 3-4. classroom fallbacks over the enumerated list
    let classrooms = db.list_classrooms().await?;
    if let Some(classroom) = match_classroom_id(code, &classrooms) {
        return Ok(ResolvedTarget::Classroom(classroom.clone()));
    }
    match match_classroom_name(code, &classrooms) {
        NameMatch::One(classroom) => return Ok(ResolvedTarget::Classroom(classroom.clone())),
        NameMatch::Ambiguous(count) => {
            return Err(AppError::BadRequest(format!(
                "this code matches {count} classrooms; ask your teacher for the invitation code"
            )))
        }
        NameMatch::None => {}
    }

    Err(AppError::NotFound(
        "could not find a classroom with this code".to_string(),
    ))
}

/// Exact id, then id prefix, then short-id match. Ids are stored lowercase
/// while normalized codes come in uppercase, so everything compares
/// case-insensitively.
pub fn match_classroom_id<'a>(code: &str, classrooms: &'a [Classroom]) -> Option<&'a Classroom> {
    let lowered = code.to_ascii_lowercase();

    if let Some(c) = classrooms.iter().find(|c| c.id == lowered) {
        return Some(c);
    }

    if let Some(c) = classrooms.iter().find(|c| c.id.starts_with(&lowered)) {
        return Some(c);
    }

    if lowered.len() == SHORT_ID_LEN {
        if let Some(c) = classrooms
            .iter()
            .find(|c| short_id(&c.id) == lowered)
        {
            return Some(c);
        }
    }

    None
}

fn short_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .take(SHORT_ID_LEN)
        .collect()
}

#[derive(Debug)]
pub enum NameMatch<'a> {
    One(&'a Classroom),
    /// More than one display name contains the code. Picking the first
    /// enumerated classroom silently joins the wrong class half the time,
    /// so ambiguity is surfaced instead.
    Ambiguous(usize),
    None,
}

pub fn match_classroom_name<'a>(code: &str, classrooms: &'a [Classroom]) -> NameMatch<'a> {
    let needle = code.to_ascii_lowercase();
    let mut hits = classrooms
        .iter()
        .filter(|c| c.name.to_ascii_lowercase().contains(&needle));

    match (hits.next(), hits.next()) {
        (None, _) => NameMatch::None,
        (Some(only), None) => NameMatch::One(only),
        (Some(_), Some(_)) => NameMatch::Ambiguous(2 + hits.count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classroom(id: &str, name: &str) -> Classroom {
        Classroom {
            id: id.to_string(),
            name: name.to_string(),
            teacher_id: None,
            created_at: None,
        }
    }

    #[test]
    fn id_exact_match_beats_prefix() {
        let rooms = vec![
            classroom("abc123", "Math"),
            classroom("abc123def", "Science"),
        ];
        let hit = match_classroom_id("ABC123", &rooms).unwrap();
        assert_eq!(hit.name, "Math");
    }

    #[test]
    fn id_prefix_match() {
        let rooms = vec![classroom("a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d", "History")];
        assert!(match_classroom_id("A1B2C3D4", &rooms).is_some());
    }

    #[test]
    fn short_id_skips_hyphens() {
        let rooms = vec![classroom("a1b2-c3d4e5", "Art")];
        // First six characters with hyphens removed: a1b2c3
        assert!(match_classroom_id("A1B2C3", &rooms).is_some());
    }

    #[test]
    fn no_id_match_for_unrelated_code() {
        let rooms = vec![classroom("abc123", "Math")];
        assert!(match_classroom_id("ZZZZZZ", &rooms).is_none());
    }

    #[test]
    fn unique_name_substring_matches() {
        let rooms = vec![classroom("a", "Biology 101"), classroom("b", "Chemistry 9")];
        match match_classroom_name("BIOLOGY", &rooms) {
            NameMatch::One(c) => assert_eq!(c.id, "a"),
            other => panic!("expected a single match, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_name_substring_is_reported() {
        let rooms = vec![
            classroom("a", "Math 7"),
            classroom("b", "Math 8"),
            classroom("c", "Advanced Math"),
        ];
        match match_classroom_name("MATH", &rooms) {
            NameMatch::Ambiguous(n) => assert_eq!(n, 3),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn name_miss_is_none() {
        let rooms = vec![classroom("a", "Math 7")];
        assert!(matches!(
            match_classroom_name("LATIN", &rooms),
            NameMatch::None
        ));
    }
}

//! Classroom endpoints: creation, invitation generation, the join flow,
//! and the enrolled-classroom list a client re-fetches after a successful
//! join (instead of reloading everything).

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{Classroom, Invitation, User},
    error::AppError,
    join::{self, JoinOutcome},
    routes::auth::verify_token,
    state::{AppState, PendingJoinState},
};
use shared::{normalize_join_code, InvitationStatus, Role};

const WEB_UI_URL: &str = "https://app.classhub.example.com";

/// How long a parked join code survives while the user logs in.
const PENDING_JOIN_TTL_MINUTES: i64 = 10;

fn bearer_user_id(state: &AppState, bearer: &Authorization<Bearer>) -> Result<String, AppError> {
    let claims = verify_token(bearer.token(), &state.config.auth.jwt_secret)?;
    Ok(claims.sub)
}

async fn current_user(
    state: &AppState,
    bearer: &Authorization<Bearer>,
) -> Result<User, AppError> {
    let user_id = bearer_user_id(state, bearer)?;
    state
        .db
        .get_user_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))
}

#[derive(Debug, Serialize)]
pub struct ClassroomResponse {
    pub id: String,
    pub name: String,
}

impl From<Classroom> for ClassroomResponse {
    fn from(c: Classroom) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

// ============================================================================
// Classroom creation (teachers)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateClassroomRequest {
    pub name: String,
}

/// Create a classroom owned by the caller.
/// POST /classrooms
pub async fn create_classroom(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateClassroomRequest>,
) -> Result<Json<ClassroomResponse>, AppError> {
    let user = current_user(&state, &bearer).await?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Classroom name is required".to_string()));
    }

    // A first-time creator becomes a teacher; an enrolled student stays a
    // student and cannot create classrooms.
    match state.db.get_role(&user.id).await?.as_deref() {
        Some("student") => {
            return Err(AppError::AuthError(
                "Students cannot create classrooms".to_string(),
            ))
        }
        Some(_) => {}
        None => state.db.upsert_role(&user.id, Role::Teacher.as_str()).await?,
    }

    let classroom = Classroom {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        teacher_id: Some(user.id.clone()),
        created_at: None,
    };
    state.db.create_classroom(&classroom).await?;

    tracing::info!("User {} created classroom {}", user.id, classroom.id);

    Ok(Json(classroom.into()))
}

// ============================================================================
// Invitation generation (owning teacher)
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CreateInvitationRequest {
    /// Optional invitee address, recorded on the invitation.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub token: String,
    pub classroom_id: String,
    pub join_url: String,
}

/// Generate an invitation token for a classroom the caller owns.
/// POST /classrooms/{id}/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Path(classroom_id): Path<String>,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<Json<InvitationResponse>, AppError> {
    let user = current_user(&state, &bearer).await?;

    let classroom = state
        .db
        .get_classroom(&classroom_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Classroom not found".to_string()))?;

    if classroom.teacher_id.as_deref() != Some(user.id.as_str()) {
        return Err(AppError::AuthError(
            "You can only invite students to classrooms you own".to_string(),
        ));
    }

    let token = generate_invitation_token();
    state
        .db
        .create_invitation(&Invitation {
            token: token.clone(),
            classroom_id: classroom.id.clone(),
            status: InvitationStatus::Pending.as_str().to_string(),
            email: req.email,
            created_at: None,
        })
        .await?;

    tracing::info!("Generated invitation {} for classroom {}", token, classroom.id);

    Ok(Json(InvitationResponse {
        join_url: format!("{}/join?code={}", WEB_UI_URL, token),
        token,
        classroom_id: classroom.id,
    }))
}

/// Two uppercase letters followed by six alphanumerics, the shape the
/// normalizer recognizes as an invitation token.
fn generate_invitation_token() -> String {
    let prefix: String = (0..2)
        .map(|_| rand::thread_rng().gen_range(b'A'..=b'Z') as char)
        .collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("{}{}", prefix, suffix)
}

// ============================================================================
// Join flow
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinResponse {
    Joined {
        classroom_id: String,
        classroom_name: String,
    },
    /// Informational, not an error: the student was enrolled all along.
    AlreadyEnrolled {
        classroom_id: String,
        classroom_name: String,
    },
    /// No valid session. The code is parked server-side; logging in with
    /// the resume token finishes the join.
    AuthRequired {
        resume: String,
        login_url: String,
    },
    /// A resumed join that failed after login; the login itself stands.
    Failed {
        message: String,
    },
}

impl From<JoinOutcome> for JoinResponse {
    fn from(outcome: JoinOutcome) -> Self {
        match outcome {
            JoinOutcome::Joined { classroom } => JoinResponse::Joined {
                classroom_id: classroom.id,
                classroom_name: classroom.name,
            },
            JoinOutcome::AlreadyEnrolled { classroom } => JoinResponse::AlreadyEnrolled {
                classroom_id: classroom.id,
                classroom_name: classroom.name,
            },
        }
    }
}

/// Join a classroom with a pasted code.
/// POST /classrooms/join
pub async fn join(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    // An expired or garbled token is the same as no token: the user goes
    // through login and the code survives the detour.
    let user = match bearer {
        Some(TypedHeader(bearer)) => current_user(&state, &bearer).await.ok(),
        None => None,
    };

    let user = match user {
        Some(user) => user,
        None => {
            // Reject hopeless input before parking anything.
            if normalize_join_code(&req.code).is_none() {
                return Err(AppError::BadRequest(
                    "enter the class code from your invitation".to_string(),
                ));
            }
            let resume = park_join_code(&state, &req.code);
            return Ok(Json(JoinResponse::AuthRequired {
                login_url: format!("{}/login?resume={}", WEB_UI_URL, resume),
                resume,
            }));
        }
    };

    let outcome = join::join_with_code(&state.db, &user, &req.code).await?;
    Ok(Json(outcome.into()))
}

fn park_join_code(state: &AppState, raw_code: &str) -> String {
    // Drop stale entries while we are here.
    state.pending_joins.retain(|_, v| v.expires_at > Utc::now());

    let resume: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    state.pending_joins.insert(
        resume.clone(),
        PendingJoinState {
            code: raw_code.to_string(),
            expires_at: Utc::now() + Duration::minutes(PENDING_JOIN_TTL_MINUTES),
        },
    );

    tracing::debug!("Parked join code under resume token {}", resume);
    resume
}

/// Finish a join parked before login. Returns `None` when there is nothing
/// to resume; a join failure is reported but never fails the login that
/// carried it.
pub async fn resume_pending_join(
    state: &AppState,
    user: &User,
    resume: Option<&str>,
) -> Option<JoinResponse> {
    let resume = resume?;
    state.pending_joins.retain(|_, v| v.expires_at > Utc::now());
    let (_, pending) = state.pending_joins.remove(resume)?;

    match join::join_with_code(&state.db, user, &pending.code).await {
        Ok(outcome) => Some(outcome.into()),
        Err(err) => {
            tracing::warn!("Resumed join failed for user {}: {}", user.id, err);
            Some(JoinResponse::Failed {
                message: err.to_string(),
            })
        }
    }
}

// ============================================================================
// Enrolled classrooms
// ============================================================================

/// The classrooms the calling student is enrolled in.
/// GET /classrooms
pub async fn list_my_classrooms(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<ClassroomResponse>>, AppError> {
    let user = current_user(&state, &bearer).await?;

    let profile = match state.db.get_student_profile_by_user(&user.id).await? {
        Some(profile) => profile,
        // No profile yet means no joins yet.
        None => return Ok(Json(Vec::new())),
    };

    let classrooms = state.db.list_classrooms_for_student(&profile.id).await?;
    Ok(Json(classrooms.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::codes::is_invitation_token;

    #[test]
    fn generated_tokens_have_the_recognized_shape() {
        for _ in 0..50 {
            let token = generate_invitation_token();
            assert!(
                is_invitation_token(&token),
                "generated token {token:?} does not match the invitation pattern"
            );
        }
    }
}

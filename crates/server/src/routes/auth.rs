use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::User,
    error::AppError,
    routes::classrooms::{self, JoinResponse},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Resume token from a join attempt made before logging in.
    #[serde(default)]
    pub resume: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub resume: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    /// Outcome of a resumed join, when the request carried a resume token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Check if user already exists
    if state.db.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    if req.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    // Create user
    let user_id = Uuid::new_v4().to_string();
    let user = User {
        id: user_id.clone(),
        email: req.email,
        password_hash,
        created_at: None,
    };
    state.db.create_user(&user).await?;

    // Generate token
    let token = generate_token(&user_id, &state.config.auth)?;

    let join = classrooms::resume_pending_join(&state, &user, req.resume.as_deref()).await;

    Ok(Json(AuthResponse {
        token,
        user_id,
        join,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Find user
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("Invalid email or password".to_string()))?;

    // Generate token
    let token = generate_token(&user.id, &state.config.auth)?;

    let join = classrooms::resume_pending_join(&state, &user, req.resume.as_deref()).await;

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        join,
    }))
}

fn generate_token(user_id: &str, auth_config: &crate::config::AuthConfig) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth_config.token_expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        db::{Classroom, Database, Invitation},
        routes::classrooms::{join, JoinRequest},
    };
    use shared::InvitationStatus;

    async fn test_state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        AppState::new(db, Config::default())
    }

    async fn seed_invited_classroom(state: &AppState, name: &str, token: &str) {
        let classroom = Classroom {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            teacher_id: None,
            created_at: None,
        };
        state.db.create_classroom(&classroom).await.unwrap();
        state
            .db
            .create_invitation(&Invitation {
                token: token.to_string(),
                classroom_id: classroom.id.clone(),
                status: InvitationStatus::Pending.as_str().to_string(),
                email: None,
                created_at: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unauthenticated_join_is_resumed_after_registration() {
        let state = test_state().await;
        seed_invited_classroom(&state, "Biology 101", "UKAB12").await;

        // Submit the code with no bearer token: the code is parked and a
        // resume token comes back.
        let Json(parked) = join(
            State(state.clone()),
            None,
            Json(JoinRequest {
                code: "UKAB12".to_string(),
            }),
        )
        .await
        .unwrap();
        let resume = match parked {
            JoinResponse::AuthRequired { resume, .. } => resume,
            other => panic!("expected AuthRequired, got {other:?}"),
        };

        // Registration with the resume token finishes the join.
        let Json(auth) = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "ana@school.edu".to_string(),
                password: "hunter22".to_string(),
                resume: Some(resume.clone()),
            }),
        )
        .await
        .unwrap();
        match auth.join {
            Some(JoinResponse::Joined { classroom_name, .. }) => {
                assert_eq!(classroom_name, "Biology 101")
            }
            other => panic!("expected a resumed join, got {other:?}"),
        }

        // The resume token is single-use.
        let Json(again) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ana@school.edu".to_string(),
                password: "hunter22".to_string(),
                resume: Some(resume),
            }),
        )
        .await
        .unwrap();
        assert!(again.join.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let state = test_state().await;
        let req = || RegisterRequest {
            email: "ana@school.edu".to_string(),
            password: "hunter22".to_string(),
            resume: None,
        };
        register(State(state.clone()), Json(req())).await.unwrap();
        let err = register(State(state.clone()), Json(req())).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_round_trips_a_registered_password() {
        let state = test_state().await;
        register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "sam@school.edu".to_string(),
                password: "hunter22".to_string(),
                resume: None,
            }),
        )
        .await
        .unwrap();

        let Json(auth) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "sam@school.edu".to_string(),
                password: "hunter22".to_string(),
                resume: None,
            }),
        )
        .await
        .unwrap();
        let claims = verify_token(&auth.token, &state.config.auth.jwt_secret).unwrap();
        assert_eq!(claims.sub, auth.user_id);

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "sam@school.edu".to_string(),
                password: "wrong".to_string(),
                resume: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }
}

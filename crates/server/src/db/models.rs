use sqlx::FromRow;

/// Authentication identity. Distinct from the student profile, which is
/// created lazily on first join.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub school: Option<String>,
    pub points: i64,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub teacher_id: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub token: String,
    pub classroom_id: String,
    pub status: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Enrollment {
    pub classroom_id: String,
    pub student_id: String,
    pub joined_at: Option<String>,
}

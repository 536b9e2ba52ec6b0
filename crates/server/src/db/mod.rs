use anyhow::Result;
use shared::InvitationStatus;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

mod models;

pub use models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. Single connection, otherwise every
    /// pooled connection gets its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                role TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT UNIQUE NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                school TEXT,
                points INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS classrooms (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                teacher_id TEXT REFERENCES users(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invitations (
                token TEXT PRIMARY KEY,
                classroom_id TEXT NOT NULL REFERENCES classrooms(id),
                status TEXT NOT NULL DEFAULT 'pending',
                email TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The composite primary key is the uniqueness guarantee the join
        // flow leans on: a duplicate join attempt becomes a no-op insert.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS classroom_students (
                classroom_id TEXT NOT NULL REFERENCES classrooms(id),
                student_id TEXT NOT NULL REFERENCES student_profiles(id),
                joined_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (classroom_id, student_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Role operations
    /// Assign a role if the identity has none. An existing assignment wins,
    /// so a teacher joining a class as a participant is not demoted.
    pub async fn upsert_role(&self, user_id: &str, role: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_role(&self, user_id: &str) -> Result<Option<String>> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    // Student profile operations
    pub async fn create_student_profile(&self, profile: &StudentProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO student_profiles (id, user_id, name, school, points) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(&profile.name)
        .bind(&profile.school)
        .bind(profile.points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_student_profile_by_user(&self, user_id: &str) -> Result<Option<StudentProfile>> {
        let profile = sqlx::query_as::<_, StudentProfile>(
            "SELECT id, user_id, name, school, points, created_at FROM student_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    // Classroom operations
    pub async fn create_classroom(&self, classroom: &Classroom) -> Result<()> {
        sqlx::query("INSERT INTO classrooms (id, name, teacher_id) VALUES (?, ?, ?)")
            .bind(&classroom.id)
            .bind(&classroom.name)
            .bind(&classroom.teacher_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_classroom(&self, id: &str) -> Result<Option<Classroom>> {
        let classroom = sqlx::query_as::<_, Classroom>(
            "SELECT id, name, teacher_id, created_at FROM classrooms WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(classroom)
    }

    pub async fn list_classrooms(&self) -> Result<Vec<Classroom>> {
        let classrooms = sqlx::query_as::<_, Classroom>(
            "SELECT id, name, teacher_id, created_at FROM classrooms ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(classrooms)
    }

    pub async fn list_classrooms_for_student(&self, student_id: &str) -> Result<Vec<Classroom>> {
        let classrooms = sqlx::query_as::<_, Classroom>(
            r#"
            SELECT c.id, c.name, c.teacher_id, c.created_at
            FROM classrooms c
            JOIN classroom_students cs ON cs.classroom_id = c.id
            WHERE cs.student_id = ?
            ORDER BY cs.joined_at ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(classrooms)
    }

    // Invitation operations
    pub async fn create_invitation(&self, invitation: &Invitation) -> Result<()> {
        sqlx::query(
            "INSERT INTO invitations (token, classroom_id, status, email) VALUES (?, ?, ?, ?)",
        )
        .bind(&invitation.token)
        .bind(&invitation.classroom_id)
        .bind(&invitation.status)
        .bind(&invitation.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_pending_invitation(&self, token: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT token, classroom_id, status, email, created_at FROM invitations WHERE token = ? AND status = ?",
        )
        .bind(token)
        .bind(InvitationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    /// Case-insensitive variant, for codes re-typed by hand.
    pub async fn get_pending_invitation_ci(&self, token: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT token, classroom_id, status, email, created_at
            FROM invitations
            WHERE LOWER(token) = LOWER(?) AND status = ?
            LIMIT 1
            "#,
        )
        .bind(token)
        .bind(InvitationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    pub async fn mark_invitation_accepted(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE invitations SET status = ? WHERE token = ?")
            .bind(InvitationStatus::Accepted.as_str())
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_invitation(&self, token: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT token, classroom_id, status, email, created_at FROM invitations WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    // Enrollment operations
    /// Idempotent insert. Returns `false` when the (classroom, student)
    /// pair already exists; the caller reports "already enrolled" instead
    /// of racing a separate existence check against the insert.
    pub async fn insert_enrollment(&self, classroom_id: &str, student_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO classroom_students (classroom_id, student_id)
            VALUES (?, ?)
            ON CONFLICT(classroom_id, student_id) DO NOTHING
            "#,
        )
        .bind(classroom_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_enrollment(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT classroom_id, student_id, joined_at FROM classroom_students WHERE classroom_id = ? AND student_id = ?",
        )
        .bind(classroom_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }
}

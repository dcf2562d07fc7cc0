use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    config::jwt_secret,
    db::DbPool,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::enums::Role,
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    services::user_service::{assemble_user, load_user},
    state::AppState,
};

/// Identity fields shared by every role.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// The role-specific row written next to the user.
#[derive(Debug, Clone)]
pub enum ProfileSeed {
    Student {
        education_level: Option<String>,
        grade: Option<i32>,
        school: Option<String>,
    },
    Tutor {
        bio: Option<String>,
        title: Option<String>,
        hourly_rate: Option<f64>,
        years_of_experience: Option<i32>,
    },
    Admin {
        department: Option<String>,
        job_title: Option<String>,
        admin_level: Option<String>,
    },
}

impl ProfileSeed {
    pub fn role(&self) -> Role {
        match self {
            ProfileSeed::Student { .. } => Role::Student,
            ProfileSeed::Tutor { .. } => Role::Tutor,
            ProfileSeed::Admin { .. } => Role::Admin,
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Insert a user and its profile row in one transaction.
pub async fn create_account(pool: &DbPool, account: NewAccount, seed: ProfileSeed) -> AppResult<Uuid> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(account.email.as_str())
        .fetch_optional(pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&account.password)?;
    let id = Uuid::new_v4();
    let role = seed.role();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, first_name, last_name, email, password_hash, phone, role, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        "#,
    )
    .bind(id)
    .bind(account.first_name.as_str())
    .bind(account.last_name.as_str())
    .bind(account.email.as_str())
    .bind(password_hash)
    .bind(account.phone.as_str())
    .bind(role.as_str())
    .execute(&mut *tx)
    .await
    .map_err(|err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return AppError::Conflict("Email is already taken".to_string());
            }
        }
        AppError::DbError(err)
    })?;

    match seed {
        ProfileSeed::Student {
            education_level,
            grade,
            school,
        } => {
            sqlx::query(
                "INSERT INTO students (user_id, education_level, grade, school) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(education_level)
            .bind(grade)
            .bind(school)
            .execute(&mut *tx)
            .await?;
        }
        ProfileSeed::Tutor {
            bio,
            title,
            hourly_rate,
            years_of_experience,
        } => {
            sqlx::query(
                r#"
                INSERT INTO tutors (user_id, bio, title, hourly_rate, years_of_experience)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(bio)
            .bind(title)
            .bind(hourly_rate)
            .bind(years_of_experience)
            .execute(&mut *tx)
            .await?;
        }
        ProfileSeed::Admin {
            department,
            job_title,
            admin_level,
        } => {
            sqlx::query(
                "INSERT INTO admins (user_id, department, job_title, admin_level) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(department)
            .bind(job_title)
            .bind(admin_level)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    tracing::info!(user_id = %id, role = role.as_str(), "account created");
    Ok(id)
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    if payload.password != payload.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match".into()));
    }

    let seed = match payload.role {
        Role::Student => ProfileSeed::Student {
            education_level: payload.education_level,
            grade: payload.grade,
            school: payload.school,
        },
        Role::Tutor => ProfileSeed::Tutor {
            bio: payload.bio,
            title: payload.title,
            hourly_rate: payload.hourly_rate,
            years_of_experience: payload.years_of_experience,
        },
        Role::Admin => {
            return Err(AppError::BadRequest(
                "Admin accounts cannot be self-registered".into(),
            ));
        }
    };

    let account = NewAccount {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password: payload.password,
        phone: payload.phone,
    };
    let id = create_account(&state.pool, account, seed).await?;

    audit::record(
        &state.pool,
        Some(id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    let model = load_user(&state.orm, id).await?;
    let user = assemble_user(&state.orm, model).await?;
    Ok(ApiResponse::success("User created", user, Some(Meta::empty())))
}

#[derive(sqlx::FromRow)]
struct Credentials {
    id: Uuid,
    password_hash: String,
    role: String,
    active: bool,
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user: Option<Credentials> = sqlx::query_as::<_, Credentials>(
        "SELECT id, password_hash, role, active FROM users WHERE email = $1",
    )
    .bind(email.as_str())
    .fetch_optional(&state.pool)
    .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }
    if !user.active {
        return Err(AppError::Forbidden);
    }

    let role = Role::parse(&user.role)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown role {}", user.role)))?;
    let token = issue_token(user.id, role)?;

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
            role,
        },
        Some(Meta::empty()),
    ))
}

/// Sign a 24h token carrying the user id and role.
pub fn issue_token(user_id: Uuid, role: Role) -> AppResult<String> {
    let secret = jwt_secret()?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn profile_seed_role() {
        let seed = ProfileSeed::Tutor {
            bio: None,
            title: None,
            hourly_rate: Some(25.0),
            years_of_experience: None,
        };
        assert_eq!(seed.role(), Role::Tutor);
    }
}

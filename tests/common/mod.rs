#![allow(dead_code)]

use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use tutorconnect_api::{
    db::{create_pool, run_migrations},
    entity::{enums::Role, subjects},
    middleware::auth::AuthUser,
    services::auth_service::{NewAccount, ProfileSeed, create_account},
    state::AppState,
};
use uuid::Uuid;

/// Connect, migrate and wipe the schema. `None` when no database is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(pool);

    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE messages, chat_rooms, notifications, reviews, bookings, \
             tutor_expertise, tutor_schedules, tutor_subjects, student_subjects, subjects, \
             admins, tutors, students, audit_logs, users CASCADE",
        ))
        .await?;

    Ok(Some(state))
}

pub async fn student(state: &AppState, first_name: &str) -> anyhow::Result<AuthUser> {
    let seed = ProfileSeed::Student {
        education_level: None,
        grade: Some(10),
        school: None,
    };
    account(state, first_name, "Student", seed).await
}

pub async fn tutor(state: &AppState, first_name: &str) -> anyhow::Result<AuthUser> {
    let seed = ProfileSeed::Tutor {
        bio: Some("Patient maths tutor".into()),
        title: None,
        hourly_rate: Some(25.0),
        years_of_experience: Some(3),
    };
    account(state, first_name, "Tutor", seed).await
}

pub async fn admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let seed = ProfileSeed::Admin {
        department: None,
        job_title: None,
        admin_level: None,
    };
    account(state, "Root", "Admin", seed).await
}

async fn account(
    state: &AppState,
    first_name: &str,
    last_name: &str,
    seed: ProfileSeed,
) -> anyhow::Result<AuthUser> {
    let role: Role = seed.role();
    let email = format!("{}-{}@example.com", first_name.to_lowercase(), Uuid::new_v4());
    let id = create_account(
        &state.pool,
        NewAccount {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email,
            password: "password123".into(),
            phone: "0812345678".into(),
        },
        seed,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(AuthUser { user_id: id, role })
}

pub async fn subject(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let subject = subjects::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(None),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(subject.id)
}

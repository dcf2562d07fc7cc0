use tutorconnect_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    error::AppError,
    services::auth_service::{NewAccount, ProfileSeed, create_account},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    seed_subjects(&pool).await?;

    let admin_id = ensure_account(
        &pool,
        account("Ada", "Admin", "admin@tutorconnect.local", "admin12345"),
        ProfileSeed::Admin {
            department: Some("Operations".into()),
            job_title: Some("Platform admin".into()),
            admin_level: Some("SUPER".into()),
        },
    )
    .await?;
    let tutor_id = ensure_account(
        &pool,
        account("Turing", "Tutor", "tutor@tutorconnect.local", "tutor12345"),
        ProfileSeed::Tutor {
            bio: Some("Mathematics and computer science tutor".into()),
            title: Some("MSc".into()),
            hourly_rate: Some(30.0),
            years_of_experience: Some(6),
        },
    )
    .await?;
    let student_id = ensure_account(
        &pool,
        account("Sam", "Student", "student@tutorconnect.local", "student12345"),
        ProfileSeed::Student {
            education_level: Some("High school".into()),
            grade: Some(11),
            school: Some("Central High".into()),
        },
    )
    .await?;

    link_tutor_subject(&pool, tutor_id, "Mathematics").await?;

    tracing::info!(%admin_id, %tutor_id, %student_id, "seed completed");
    Ok(())
}

fn account(first: &str, last: &str, email: &str, password: &str) -> NewAccount {
    NewAccount {
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
        password: password.into(),
        phone: "0800000000".into(),
    }
}

/// Create the account unless the email is already registered.
async fn ensure_account(pool: &DbPool, account: NewAccount, seed: ProfileSeed) -> anyhow::Result<Uuid> {
    let email = account.email.clone();
    match create_account(pool, account, seed).await {
        Ok(id) => Ok(id),
        Err(AppError::Conflict(_)) => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email.as_str())
                .fetch_one(pool)
                .await?;
            tracing::info!(%email, "account already present");
            Ok(existing.0)
        }
        Err(err) => Err(anyhow::anyhow!(err.to_string())),
    }
}

async fn seed_subjects(pool: &DbPool) -> anyhow::Result<()> {
    let subjects = [
        ("Mathematics", "Algebra, geometry and calculus"),
        ("Physics", "Mechanics, electricity and waves"),
        ("Chemistry", "General and organic chemistry"),
        ("English", "Reading, writing and grammar"),
        ("Computer Science", "Programming and algorithms"),
    ];

    for (name, description) in subjects {
        sqlx::query(
            r#"
            INSERT INTO subjects (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    tracing::info!(count = subjects.len(), "subjects seeded");
    Ok(())
}

async fn link_tutor_subject(pool: &DbPool, tutor_id: Uuid, subject: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tutor_subjects (tutor_id, subject_id)
        SELECT $1, id FROM subjects WHERE name = $2
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(tutor_id)
    .bind(subject)
    .execute(pool)
    .await?;
    Ok(())
}

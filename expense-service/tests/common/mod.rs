//! Common test utilities for expense-service integration tests.
#![allow(dead_code)]

use expense_service::config::{
    AuthConfig, DatabaseConfig, EmailConfig, Environment, ExpenseConfig, SecurityConfig,
    SmtpConfig,
};
use expense_service::middleware::auth::IdentityVerifier;
use expense_service::models::{Group, Role, UserBranchRole};
use expense_service::services::{Database, MockEmailService};
use expense_service::{build_router, AppState};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use service_core::config::Config as CommonConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::{Arc, Once};
use uuid::Uuid;

const IDP_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/idp_private.pem");
const IDP_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/idp_public.pem");

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,expense_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub pool: PgPool,
    pub email: Arc<MockEmailService>,
}

/// Spawn a test application over a real PostgreSQL database and a mock
/// email provider.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run integration tests");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    expense_service::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let config = ExpenseConfig {
        common: CommonConfig { port: 0 },
        environment: Environment::Dev,
        service_name: "expense-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        database: DatabaseConfig {
            url: database_url,
            max_connections: 2,
            min_connections: 1,
        },
        smtp: SmtpConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_name: "Expense Service Test".to_string(),
            from_email: "noreply@test.example.org".to_string(),
        },
        email: EmailConfig {
            treasury_email: "treasurer@test.example.org".to_string(),
        },
        auth: AuthConfig {
            public_key_path: String::new(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["*".to_string()],
        },
    };

    let email = Arc::new(MockEmailService::new());
    let verifier =
        IdentityVerifier::from_pem(IDP_PUBLIC_KEY).expect("Failed to load test public key");

    let state = AppState {
        config,
        db: Database::new(pool.clone()),
        email: email.clone(),
        verifier,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        pool,
        email,
    }
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    email: String,
    exp: i64,
}

/// Sign an identity token for a test user, the way the external
/// identity provider would.
pub fn token_for(user_id: &str, email: &str) -> String {
    let claims = TestClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    let key = EncodingKey::from_rsa_pem(IDP_PRIVATE_KEY).expect("Failed to load test private key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("Failed to sign test token")
}

/// A fresh user id that cannot collide across parallel tests.
pub fn unique_user_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Seed a group with a unique slug; `admin_user_id` becomes its owning
/// administrator.
pub async fn seed_group(pool: &PgPool, name: &str, admin_user_id: &str) -> Group {
    let slug = format!("{}-{}", name.to_lowercase(), &Uuid::new_v4().to_string()[..8]);
    let group = Group::new(name.to_string(), slug, admin_user_id.to_string());

    Database::new(pool.clone())
        .insert_group(&group)
        .await
        .expect("Failed to seed group");

    group
}

/// Seed a branch in a group.
pub async fn seed_branch(pool: &PgPool, group_id: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO branches (id, name, group_id, is_active, created_at)
        VALUES ($1, $2, $3, TRUE, NOW())
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(group_id)
    .execute(pool)
    .await
    .expect("Failed to seed branch");
    id
}

/// Seed an active membership.
pub async fn seed_membership(pool: &PgPool, user_id: &str, branch_id: Uuid, role: Role) {
    let membership = UserBranchRole::new(user_id.to_string(), branch_id, role, None);
    sqlx::query(
        r#"
        INSERT INTO user_branch_roles
            (id, user_id, branch_id, role, is_active, granted_by, granted_at, last_access_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(membership.id)
    .bind(&membership.user_id)
    .bind(membership.branch_id)
    .bind(&membership.role)
    .bind(membership.is_active)
    .bind(&membership.granted_by)
    .bind(membership.granted_at)
    .bind(membership.last_access_at)
    .execute(pool)
    .await
    .expect("Failed to seed membership");
}

impl TestApp {
    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_json<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_empty(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn put_json<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn patch_json<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }
}

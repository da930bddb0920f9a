use givehub::configuration::{get_configuration, DatabaseSettings};
use givehub::startup::run;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let jwt_config = configuration.jwt.clone();
    let server = run(listener, connection_pool.clone(), jwt_config).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn signup(app: &TestApp, client: &reqwest::Client, email: &str, password: &str) -> Value {
    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Signup ---

#[tokio::test]
async fn signup_returns_201_with_a_token_pair() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = signup(&app, &client, "a@b.com", "pw123456").await;

    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
    assert_ne!(body["access_token"], body["refresh_token"]);

    // The account row holds only hashes, and the session is active
    let row = sqlx::query("SELECT password_hash, refresh_token_hash FROM users WHERE email = 'a@b.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");

    assert_ne!(row.get::<String, _>("password_hash"), "pw123456");
    assert!(row.get::<Option<String>, _>("refresh_token_hash").is_some());
}

#[tokio::test]
async fn duplicate_signup_returns_403_and_creates_no_second_account() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&app, &client, "a@b.com", "pw123456").await;

    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&json!({"email": "a@b.com", "password": "pw123456"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());

    let count = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE email = 'a@b.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count users");
    assert_eq!(count.get::<i64, _>("n"), 1);
}

#[tokio::test]
async fn signup_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for invalid_email in ["notanemail", "user@", "@example.com", "user@@example.com"] {
        let response = client
            .post(&format!("{}/auth/signup", &app.address))
            .json(&json!({"email": invalid_email, "password": "pw123456"}))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn signup_returns_400_for_out_of_bounds_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let too_long = "a".repeat(73);
    for password in ["short", too_long.as_str()] {
        let response = client
            .post(&format!("{}/auth/signup", &app.address))
            .json(&json!({"email": "a@b.com", "password": password}))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16());
    }
}

// --- Signin ---

#[tokio::test]
async fn signin_returns_200_for_valid_credentials() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&app, &client, "a@b.com", "pw123456").await;

    let response = client
        .post(&format!("{}/auth/signin", &app.address))
        .json(&json!({"email": "a@b.com", "password": "pw123456"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn signin_returns_403_for_wrong_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&app, &client, "a@b.com", "pw123456").await;

    let response = client
        .post(&format!("{}/auth/signin", &app.address))
        .json(&json!({"email": "a@b.com", "password": "wrongpw123"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn signin_returns_403_for_unknown_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/signin", &app.address))
        .json(&json!({"email": "nobody@example.com", "password": "pw123456"}))
        .send()
        .await
        .expect("Failed to execute request.");

    // Same rejection as a wrong password
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn access_token_resolves_the_created_account() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let tokens = signup(&app, &client, "a@b.com", "pw123456").await;
    let access_token = tokens["access_token"].as_str().unwrap();

    let response = client
        .get(&format!("{}/users/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "a@b.com");

    let row = sqlx::query("SELECT id FROM users WHERE email = 'a@b.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch user");
    assert_eq!(
        body["id"].as_str().unwrap(),
        row.get::<uuid::Uuid, _>("id").to_string()
    );
}

// --- Logout ---

#[tokio::test]
async fn logout_clears_the_session_and_blocks_refresh() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let tokens = signup(&app, &client, "a@b.com", "pw123456").await;
    let access_token = tokens["access_token"].as_str().unwrap();
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!(true));

    let row = sqlx::query("SELECT refresh_token_hash FROM users WHERE email = 'a@b.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch user");
    assert!(row.get::<Option<String>, _>("refresh_token_hash").is_none());

    // The previously valid refresh token is now rejected, even though its
    // signature and expiry are still fine
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let tokens = signup(&app, &client, "a@b.com", "pw123456").await;
    let access_token = tokens["access_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/logout", &app.address))
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16());
    }
}

// --- Refresh and rotation ---

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let first = signup(&app, &client, "a@b.com", "pw123456").await;
    let first_rt = first["refresh_token"].as_str().unwrap();

    // First refresh succeeds and yields a new pair
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", first_rt))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let second: Value = response.json().await.expect("Failed to parse response");
    let second_rt = second["refresh_token"].as_str().unwrap();
    assert_ne!(first_rt, second_rt, "Refresh token must rotate on each use");

    // The superseded token no longer matches the stored hash
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", first_rt))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    // The current token still works and yields a third distinct pair
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", second_rt))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let third: Value = response.json().await.expect("Failed to parse response");
    assert_ne!(third["refresh_token"], second["refresh_token"]);
    assert_ne!(third["refresh_token"], first["refresh_token"]);
    assert_ne!(third["access_token"], second["access_token"]);
}

#[tokio::test]
async fn refresh_rejects_an_access_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let tokens = signup(&app, &client, "a@b.com", "pw123456").await;
    let access_token = tokens["access_token"].as_str().unwrap();

    // Signed with the access secret, so the refresh guard rejects it
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn refresh_returns_401_without_a_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "UNAUTHORIZED");
}

// --- Guarded endpoints ---

#[tokio::test]
async fn protected_routes_return_401_without_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/users", "/users/me", "/donations"] {
        let response = client
            .get(&format!("{}{}", &app.address, path))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            401,
            response.status().as_u16(),
            "Endpoint {} should require authentication",
            path
        );
    }

    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn protected_routes_reject_malformed_authorization_headers() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for header in ["Bearer", "Basic dXNlcjpwYXNz", "BearerToken", ""] {
        let response = client
            .get(&format!("{}/users/me", &app.address))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            401,
            response.status().as_u16(),
            "Should reject malformed header: {}",
            header
        );
    }
}

#[tokio::test]
async fn protected_routes_reject_a_tampered_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let tokens = signup(&app, &client, "a@b.com", "pw123456").await;
    let tampered = format!("{}X", tokens["access_token"].as_str().unwrap());

    let response = client
        .get(&format!("{}/users/me", &app.address))
        .header("Authorization", format!("Bearer {}", tampered))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

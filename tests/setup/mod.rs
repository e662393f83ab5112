use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use url::Url;

use std::time::Duration;

pub async fn setup_test() -> (Client, Url, sqlx::PgPool) {
    dotenv::dotenv().ok();
    (create_client(), service_url(), setup_database().await)
}

fn var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn service_url() -> Url {
    let port: u16 = var("API_PORT", "8080").parse().expect("Invalid API_PORT");
    let prefix = var("PREFIX", "/app");
    Url::parse(format!("http://localhost:{port}{}/", prefix.trim_end_matches('/')).as_str())
        .unwrap()
}

async fn setup_database() -> sqlx::PgPool {
    let database_host = var("DB_HOST", "localhost");
    let database_name = var("DB_NAME", "users");
    let database_user = var("DB_USER", "postgres");
    let database_password = var("DB_PASSWORD", "postgres");
    let database_port: u16 = var("DB_PORT", "5432").parse().expect("Invalid DB_PORT");

    let database_url = format!("postgres://{database_user}:{database_password}@{database_host}:{database_port}/{database_name}");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(1))
        .connect(&database_url)
        .await
        .expect("Expect to create a database pool with a open connection");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Expect to migrate the test database");
    sqlx::query("TRUNCATE users")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn create_client() -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.append("accept", HeaderValue::from_static("application/json"));
    headers.append("X-Application-ID", HeaderValue::from_static("users-api-e2e"));

    // longer than the service request deadline
    let request_timeout = Duration::from_secs(30);

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(request_timeout)
        .default_headers(headers)
        .gzip(true)
        .build()
        .expect("Expect to create a http client")
}

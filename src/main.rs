use std::{process::ExitCode, sync::Arc};

use salvo::{listener::TcpListener, Server};

use config::{env_var, logging};
use infra::{
    database::{connection, migration, repository::PgUserRepository},
    router,
};

mod app;
mod base;
mod config;
mod domain;
mod error;
mod infra;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let env = match env_var::load() {
        Ok(env) => env,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let pool = match connection::create_sqlx_pool(&env.database).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "could not connect to postgres");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = migration::run(&pool).await {
        tracing::error!(error = %err, "could not migrate the database");
        pool.close().await;
        return ExitCode::FAILURE;
    }

    let repo = Arc::new(PgUserRepository::new(pool.clone()));
    let address = format!("0.0.0.0:{}", env.server.port);
    tracing::info!(%address, prefix = %env.server.prefix, "listening");

    let listener = TcpListener::bind(&address);
    let server = Server::new(listener).serve(router::app(&env.server, repo));

    tokio::select! {
        _ = server => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    pool.close().await;
    ExitCode::SUCCESS
}

pub mod controller;
pub mod database;

pub mod router {
    use std::sync::Arc;

    use salvo::{logging::Logger, Router};

    use super::controller::*;
    use crate::{config::env_var::ServerConfig, domain::repository::UserRepository};

    pub fn app(config: &ServerConfig, repo: Arc<dyn UserRepository>) -> Router {
        let users = Router::with_path("users")
            .get(ListUsersController::new(repo.clone()))
            .post(CreateUserController::new(repo.clone()))
            .push(
                Router::with_path("search")
                    .post(SearchUsersController::new(repo.clone()))
                    .push(Router::with_path("<id>").get(SearchUserController::new(repo.clone()))),
            )
            .push(
                Router::with_path("<id>")
                    .put(UpdateUserController::new(repo.clone()))
                    .delete(RemoveUserController::new(repo)),
            );

        Router::with_path(config.prefix.trim_matches('/'))
            .hoop(Logger)
            .hoop(RequestDeadline::new(config.request_timeout()))
            .push(users)
            .push(Router::with_path("health").get(HealthController))
    }
}

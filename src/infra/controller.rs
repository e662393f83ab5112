use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use salvo::{http::StatusCode, writer::Json, Depot, FlowCtrl, Handler, Request, Response};
use tracing::{field::Empty, instrument, Instrument, Span};
use uuid::Uuid;

use crate::{
    app::{
        resource::{
            envelope::{DataResource, HealthResponse},
            user::{CreateUser, SearchUsers, UpdateUser, UserResponse},
        },
        transform::user::{search_ids, update_changes, user_list_response},
        use_case,
    },
    domain::{entity::user::User, repository::UserRepository},
    error::{
        app::ApplicationError, http::BadRequest, resource::NotFoundError, service::DispatchError,
    },
};

macro_rules! map_res_err {
    ($result:ident, $response:ident) => {
        match $result {
            Err(err) => {
                $response.render(err);
                return;
            }
            Ok(ok) => ok,
        }
    };
}

/// Runs a mutation on its own task. It completes even if the request is dropped.
async fn isolate<F, T>(operation: F) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, ApplicationError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation.in_current_span())
        .await
        .map_err(DispatchError::from)?
}

fn record_app_id(req: &Request) {
    let app_id: Option<&str> = req.header("X-Application-ID");
    if let Some(app_id) = app_id {
        Span::current().record("app_id", app_id);
    }
}

/// Extract a uuid from the request id param, recording it in the current span.
fn extract_id(req: &Request) -> Result<Uuid, NotFoundError> {
    let raw = req.params().get("id").map(String::as_str).unwrap_or_default();
    Span::current().record("user.id", raw);
    raw.parse()
        .map_err(|_| NotFoundError::from_resource::<User>(raw))
}

pub struct ListUsersController {
    repo: Arc<dyn UserRepository>,
}

impl ListUsersController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for ListUsersController {
    #[instrument(name = "handler.get_users", skip_all, fields(app_id = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let result = use_case::user::get_users(self.repo.as_ref()).await;
        let users = map_res_err!(result, res);

        res.render(Json(DataResource::from(user_list_response(users))));
        res.set_status_code(StatusCode::OK);
    }
}

pub struct CreateUserController {
    repo: Arc<dyn UserRepository>,
}

impl CreateUserController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for CreateUserController {
    #[instrument(name = "handler.save_user", skip_all, fields(app_id = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let result: Result<CreateUser, ApplicationError> = req
            .parse_body()
            .await
            .map_err(|err| BadRequest::from(err).into());
        let dto = map_res_err!(result, res);

        let result = User::try_from(dto).map_err(ApplicationError::from);
        let user = map_res_err!(result, res);

        let repo = self.repo.clone();
        let result = isolate(async move { use_case::user::save_user(repo.as_ref(), user).await }).await;
        let user = map_res_err!(result, res);

        res.render(Json(DataResource::from(UserResponse::from(user))));
        res.set_status_code(StatusCode::CREATED);
    }
}

pub struct UpdateUserController {
    repo: Arc<dyn UserRepository>,
}

impl UpdateUserController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for UpdateUserController {
    #[instrument(name = "handler.update_user", skip_all, fields(app_id = Empty, user.id = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let result = extract_id(req).map_err(ApplicationError::from);
        let id = map_res_err!(result, res);

        let result: Result<UpdateUser, ApplicationError> = req
            .parse_body()
            .await
            .map_err(|err| BadRequest::from(err).into());
        let dto = map_res_err!(result, res);

        let result = update_changes(id, dto).map_err(ApplicationError::from);
        let changes = map_res_err!(result, res);

        let repo = self.repo.clone();
        let result =
            isolate(async move { use_case::user::update_user(repo.as_ref(), changes).await }).await;
        let user = map_res_err!(result, res);

        res.render(Json(DataResource::from(UserResponse::from(user))));
        res.set_status_code(StatusCode::OK);
    }
}

pub struct RemoveUserController {
    repo: Arc<dyn UserRepository>,
}

impl RemoveUserController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for RemoveUserController {
    #[instrument(name = "handler.remove_user", skip_all, fields(app_id = Empty, user.id = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let result = extract_id(req).map_err(ApplicationError::from);
        let id = map_res_err!(result, res);

        let repo = self.repo.clone();
        let result = isolate(async move { use_case::user::remove_user(repo.as_ref(), id).await }).await;
        map_res_err!(result, res);

        res.set_status_code(StatusCode::NO_CONTENT);
    }
}

pub struct SearchUsersController {
    repo: Arc<dyn UserRepository>,
}

impl SearchUsersController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for SearchUsersController {
    #[instrument(name = "handler.get_users_by_id", skip_all, fields(app_id = Empty, users = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let result: Result<SearchUsers, ApplicationError> = req
            .parse_body()
            .await
            .map_err(|err| BadRequest::from(err).into());
        let dto = map_res_err!(result, res);

        let result = search_ids(dto).map_err(ApplicationError::from);
        let ids = map_res_err!(result, res);
        Span::current().record("users", tracing::field::debug(&ids));

        let result = use_case::user::get_users_by_id(self.repo.as_ref(), &ids).await;
        let users = map_res_err!(result, res);

        res.render(Json(DataResource::from(user_list_response(users))));
        res.set_status_code(StatusCode::OK);
    }
}

/// Search of a single user by path id. An id that is not a uuid matches no user.
pub struct SearchUserController {
    repo: Arc<dyn UserRepository>,
}

impl SearchUserController {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler for SearchUserController {
    #[instrument(name = "handler.get_user_by_id", skip_all, fields(app_id = Empty, user.id = Empty))]
    async fn handle(&self, req: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        record_app_id(req);

        let ids: Vec<Uuid> = extract_id(req).into_iter().collect();

        let result = use_case::user::get_users_by_id(self.repo.as_ref(), &ids).await;
        let users = map_res_err!(result, res);

        res.render(Json(DataResource::from(user_list_response(users))));
        res.set_status_code(StatusCode::OK);
    }
}

pub struct HealthController;

#[async_trait]
impl Handler for HealthController {
    async fn handle(&self, _: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
        res.render(Json(HealthResponse {
            status: "OK".into(),
        }));
        res.set_status_code(StatusCode::OK);
    }
}

/// Hoop answering 503 when the rest of the chain takes longer than `timeout`.
pub struct RequestDeadline {
    timeout: Duration,
}

impl RequestDeadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Handler for RequestDeadline {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let elapsed = tokio::time::timeout(self.timeout, ctrl.call_next(req, depot, res))
            .await
            .is_err();

        if elapsed {
            ctrl.skip_rest();
            res.render(ApplicationError::from(DispatchError::Timeout(Some(
                self.timeout,
            ))));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use pretty_assertions::assert_eq;
    use salvo::{
        http::StatusCode,
        test::{ResponseExt, TestClient},
        Router, Service,
    };
    use serde_json::{json, Value};
    use tracing_subscriber::fmt::format::FmtSpan;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::env_var::ServerConfig,
        domain::{entity::Entity, repository::memory::InMemoryUserRepository},
        infra::router,
    };

    const BASE: &str = "http://127.0.0.1:8080/app";

    fn server_config() -> ServerConfig {
        ServerConfig {
            port: 8080,
            prefix: "/app".into(),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }

    fn service(users: Vec<User>) -> (Service, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::with_users(users));
        let service = Service::new(router::app(&server_config(), repo.clone()));
        (service, repo)
    }

    fn paris_user() -> User {
        User::new("Ana".into(), None, None, Some("Paris".into()))
    }

    async fn body(res: &mut salvo::Response) -> Value {
        let text = res.take_string().await.unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn creates_user_with_defaults() {
        let (service, repo) = service(vec![]);

        let mut res = TestClient::post(format!("{BASE}/users"))
            .json(&json!({ "name": "test" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::CREATED));
        let body = body(&mut res).await;
        assert_eq!(body["data"]["name"], "test");
        assert_eq!(body["data"]["active"], true);
        assert_eq!(body["data"]["birth"], "");
        assert_eq!(body["data"]["location"], Value::Null);
        assert!(body["data"]["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_birth_without_creating() {
        let (service, repo) = service(vec![]);

        let mut res = TestClient::post(format!("{BASE}/users"))
            .json(&json!({ "name": "test", "birth": "23/09/92" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::BAD_REQUEST));
        let errors = body(&mut res).await["errors"].as_str().unwrap().to_string();
        assert!(errors.contains("/birth"), "{errors}");
        assert!(errors.contains("23/09/92"), "{errors}");
        assert_eq!(repo.writes(), 0);
    }

    #[tokio::test]
    async fn rejects_body_without_name() {
        let (service, _) = service(vec![]);

        let res = TestClient::post(format!("{BASE}/users"))
            .json(&json!({ "email": "ana@mail.com" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn json_body_requires_content_type() {
        let (service, repo) = service(vec![]);

        let res = TestClient::post(format!("{BASE}/users"))
            .body(r#"{"name":"test"}"#)
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(repo.writes(), 0);

        let res = TestClient::post(format!("{BASE}/users"))
            .raw_json(r#"{"name":"test"}"#)
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn lists_active_users() {
        let (service, _) = service(vec![paris_user()]);

        let mut res = TestClient::get(format!("{BASE}/users")).send(&service).await;

        assert_eq!(res.status_code(), Some(StatusCode::OK));
        let body = body(&mut res).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["location"], "Paris");
    }

    #[tokio::test]
    async fn update_clears_field_with_empty_string() {
        let user = paris_user();
        let (service, _) = service(vec![user.clone()]);

        let mut res = TestClient::put(format!("{BASE}/users/{}", user.ident()))
            .json(&json!({ "email": "ana@mail.com" }))
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::OK));
        let body_kept = body(&mut res).await;
        assert_eq!(body_kept["data"]["location"], "Paris");
        assert_eq!(body_kept["data"]["email"], "ana@mail.com");

        let mut res = TestClient::put(format!("{BASE}/users/{}", user.ident()))
            .json(&json!({ "location": "" }))
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::OK));
        assert_eq!(body(&mut res).await["data"]["location"], Value::Null);
    }

    #[tokio::test]
    async fn update_without_fields_is_rejected() {
        let user = paris_user();
        let (service, repo) = service(vec![user.clone()]);

        let res = TestClient::put(format!("{BASE}/users/{}", user.ident()))
            .json(&json!({}))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(repo.writes(), 0);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let (service, _) = service(vec![]);

        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let res = TestClient::put(format!("{BASE}/users/{id}"))
                .json(&json!({ "name": "Bob" }))
                .send(&service)
                .await;

            assert_eq!(res.status_code(), Some(StatusCode::NOT_FOUND), "{id}");
        }
    }

    #[tokio::test]
    async fn removes_user_once() {
        let user = paris_user();
        let (service, repo) = service(vec![user.clone()]);
        let url = format!("{BASE}/users/{}", user.ident());

        let res = TestClient::delete(&url).send(&service).await;
        assert_eq!(res.status_code(), Some(StatusCode::NO_CONTENT));
        assert!(repo.snapshot().is_empty());

        let res = TestClient::delete(&url).send(&service).await;
        assert_eq!(res.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn searches_users_by_ids() {
        let user = paris_user();
        let (service, _) = service(vec![user.clone(), paris_user()]);

        let mut res = TestClient::post(format!("{BASE}/users/search"))
            .json(&json!({ "users": [user.ident(), user.ident()] }))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::OK));
        let body = body(&mut res).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], user.ident().to_string());
    }

    #[derive(Clone)]
    struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn search_records_requested_ids_in_span() {
        let user = paris_user();
        let (service, _) = service(vec![user.clone()]);

        let captured = Arc::new(Mutex::new(Vec::new()));
        let writer = CapturedWriter(captured.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_span_events(FmtSpan::CLOSE)
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let res = TestClient::post(format!("{BASE}/users/search"))
            .json(&json!({ "users": [user.ident()] }))
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::OK));

        let logs = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("handler.get_users_by_id"), "{logs}");
        assert!(logs.contains(&format!("users=[{}]", user.ident())), "{logs}");
    }

    #[tokio::test]
    async fn search_rejects_malformed_id() {
        let (service, _) = service(vec![]);

        let mut res = TestClient::post(format!("{BASE}/users/search"))
            .json(&json!({ "users": ["nope"] }))
            .send(&service)
            .await;

        assert_eq!(res.status_code(), Some(StatusCode::BAD_REQUEST));
        let errors = body(&mut res).await["errors"].as_str().unwrap().to_string();
        assert!(errors.contains("/users/0"), "{errors}");
    }

    #[tokio::test]
    async fn searches_user_by_path_id() {
        let user = paris_user();
        let (service, _) = service(vec![user.clone()]);

        let mut res = TestClient::get(format!("{BASE}/users/search/{}", user.ident()))
            .send(&service)
            .await;
        assert_eq!(body(&mut res).await["data"].as_array().unwrap().len(), 1);

        let mut res = TestClient::get(format!("{BASE}/users/search/nope"))
            .send(&service)
            .await;
        assert_eq!(res.status_code(), Some(StatusCode::OK));
        assert_eq!(body(&mut res).await["data"], json!([]));
    }

    #[tokio::test]
    async fn reports_health() {
        let (service, _) = service(vec![]);

        let mut res = TestClient::get(format!("{BASE}/health")).send(&service).await;

        assert_eq!(res.status_code(), Some(StatusCode::OK));
        assert_eq!(body(&mut res).await, json!({ "status": "OK" }));
    }

    struct Slow;

    #[async_trait]
    impl Handler for Slow {
        async fn handle(&self, _: &mut Request, _: &mut Depot, res: &mut Response, _: &mut FlowCtrl) {
            tokio::time::sleep(Duration::from_secs(5)).await;
            res.set_status_code(StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn deadline_answers_service_unavailable() {
        let router = Router::new()
            .hoop(RequestDeadline::new(Duration::from_millis(10)))
            .push(Router::with_path("slow").get(Slow));
        let service = Service::new(router);

        let mut res = TestClient::get("http://127.0.0.1:8080/slow").send(&service).await;

        assert_eq!(res.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(body(&mut res).await["errors"].is_string());
    }
}

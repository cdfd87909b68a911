#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use course_review_backend::auth::sign_user_token;
use course_review_backend::config::{AdminConfig, Config, StorageBackend};
use course_review_backend::models::{Course, Faculty};
use course_review_backend::state::AppState;
use course_review_backend::storage::MemoryObjectStorage;
use course_review_backend::store::MemoryStore;

pub const USER_SECRET: &str = "test-user-secret";
pub const ADMIN_PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub config: Config,
}

pub fn create_test_app() -> TestApp {
    let mut config = Config::default();
    config.auth_jwt_secret = Some(USER_SECRET.to_string());
    config.admin = AdminConfig {
        password_hash: Some(bcrypt::hash(ADMIN_PASSWORD, 4).unwrap()),
        jwt_secret: Some("test-admin-secret".to_string()),
    };
    config.storage.backend = StorageBackend::Memory;

    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryObjectStorage::new());
    let state = AppState::new(config.clone(), store.clone(), storage.clone(), "memory");

    TestApp {
        router: course_review_backend::build_app(state),
        store,
        storage,
        config,
    }
}

impl TestApp {
    pub fn seed_course(&self, code: &str) -> (Faculty, Course) {
        let faculty = self.store.add_faculty("Engineering", None);
        let course = self.store.add_course(Course::new(faculty.id, code, "Intro to Engineering"));
        (faculty, course)
    }

    pub fn user_token(&self, user_id: Uuid) -> String {
        sign_user_token(user_id, USER_SECRET, chrono::Duration::hours(1)).unwrap()
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/auth/login",
                None,
                Some(serde_json::json!({ "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and decodes the JSON body (`Value::Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, token, body).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }
}

pub fn review_body() -> Value {
    serde_json::json!({
        "difficulty": 3,
        "usefulness": 4,
        "workload": 2,
        "attendance": 5,
        "material_relevance": 4,
        "exam_predictability": 3,
        "grading_fairness": 4,
        "difficulty_value_alignment": "well_balanced",
        "midterm_format": "classical",
        "final_format": "test",
        "comment": "Solid course"
    })
}

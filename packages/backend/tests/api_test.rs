use axum::http::{Method, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use uuid::Uuid;

mod common;

use common::{create_test_app, review_body, TestApp};

async fn post_review(app: &TestApp, course_id: Uuid, user_id: Uuid) -> (StatusCode, serde_json::Value) {
    let token = app.user_token(user_id);
    app.send(
        Method::POST,
        &format!("/api/courses/{course_id}/reviews"),
        Some(&token),
        Some(review_body()),
    )
    .await
}

#[tokio::test]
async fn test_faculty_listing_and_course_search() {
    let app = create_test_app();
    let (faculty, course) = app.seed_course("CENG101");
    app.store.add_faculty("Empty Faculty", None);

    let (status, body) = app.get("/api/faculties?hideEmpty=true").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Engineering"]);

    let (status, body) = app.get(&format!("/api/faculties/{}/courses", faculty.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["code"], "CENG101");
    assert!(body["data"][0]["quality_score"].is_null());

    let (_, body) = app.get("/api/courses/search?q=ceng").await;
    assert_eq!(body["data"][0]["id"], course.id.to_string());

    let (_, body) = app.get("/api/courses/search?q=c").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_course_returns_404() {
    let app = create_test_app();

    let (status, body) = app.get(&format!("/api/courses/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_stats_hidden_until_enough_reviews() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let required = app.config.min_reviews_for_display;

    for _ in 0..required - 1 {
        let (status, _) = post_review(&app, course.id, Uuid::new_v4()).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app.get(&format!("/api/courses/{}/stats", course.id)).await;
    assert_eq!(body["data"]["status"], "insufficient_data");
    assert_eq!(body["data"]["total_reviews"], required - 1);
    assert_eq!(body["data"]["required"], required);

    post_review(&app, course.id, Uuid::new_v4()).await;

    let (_, body) = app.get(&format!("/api/courses/{}/stats", course.id)).await;
    assert_eq!(body["data"]["status"], "available");
}

#[tokio::test]
async fn test_second_review_by_same_user_conflicts() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let user = Uuid::new_v4();

    let (first, _) = post_review(&app, course.id, user).await;
    let (second, body) = post_review(&app, course.id, user).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_review_lists_field_errors() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let token = app.user_token(Uuid::new_v4());

    let mut body = review_body();
    body["difficulty"] = json!(7);
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/courses/{}/reviews", course.id),
            Some(&token),
            Some(body),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["field"] == "difficulty"));
}

#[tokio::test]
async fn test_vote_toggle_over_http() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let (_, created) = post_review(&app, course.id, Uuid::new_v4()).await;
    let review_id = created["data"]["review"]["id"].as_str().unwrap().to_string();

    let voter = app.user_token(Uuid::new_v4());
    let uri = format!("/api/reviews/{review_id}/votes");

    let (status, body) = app
        .send(Method::POST, &uri, Some(&voter), Some(json!({ "voteType": "helpful" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "added");
    assert_eq!(body["data"]["votes"]["helpful"], 1);

    let (_, body) = app
        .send(Method::POST, &uri, Some(&voter), Some(json!({ "voteType": "rage_bait" })))
        .await;
    assert_eq!(body["data"]["action"], "changed");
    assert_eq!(body["data"]["votes"]["helpful"], 0);
    assert_eq!(body["data"]["votes"]["rage_bait"], 1);

    let (_, body) = app
        .send(Method::POST, &uri, Some(&voter), Some(json!({ "voteType": "rage_bait" })))
        .await;
    assert_eq!(body["data"]["action"], "removed");
    assert!(body["data"]["voteType"].is_null());
}

#[tokio::test]
async fn test_only_author_can_delete_review() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let author = Uuid::new_v4();
    let (_, created) = post_review(&app, course.id, author).await;
    let uri = format!("/api/reviews/{}", created["data"]["review"]["id"].as_str().unwrap());

    let stranger = app.user_token(Uuid::new_v4());
    let (status, _) = app.send(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = app.user_token(author);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_tag_approval_reuses_existing_tag() {
    let app = create_test_app();
    let admin = app.admin_token().await;
    let user = app.user_token(Uuid::new_v4());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/tags",
            Some(&admin),
            Some(json!({ "name": "Fair Grading", "type": "positive" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, suggested) = app
        .send(
            Method::POST,
            "/api/tags/suggestions",
            Some(&user),
            Some(json!({ "name": "fair grading", "type": "positive" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let pending_id = suggested["data"]["id"].as_str().unwrap().to_string();

    let approve_uri = format!("/api/admin/pending-tags/{pending_id}/approve");
    let (status, body) = app.send(Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], false);
    assert_eq!(body["data"]["pending_tag"]["status"], "approved");

    let (_, tags) = app.get("/api/tags").await;
    assert_eq!(tags["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.send(Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_file_upload_moderation_flow() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let admin = app.admin_token().await;
    let user = app.user_token(Uuid::new_v4());

    let (status, uploaded) = app
        .send(
            Method::POST,
            &format!("/api/courses/{}/files", course.id),
            Some(&user),
            Some(json!({
                "file_name": "midterm.pdf",
                "content_type": "application/pdf",
                "type": "exam",
                "content": STANDARD.encode(b"%PDF-1.4 sample"),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["data"]["is_verified"], false);
    let file_id = uploaded["data"]["id"].as_str().unwrap().to_string();
    let file_path = uploaded["data"]["file_path"].as_str().unwrap().to_string();
    assert!(app.storage.contains(&file_path));

    let (_, listed) = app.get(&format!("/api/courses/{}/files", course.id)).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);

    app.storage.fail_removes(true);
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/admin/files/{file_id}/reject"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, pending) = app
        .send(Method::GET, "/api/admin/files/pending", Some(&admin), None)
        .await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 0);
    assert!(app.storage.contains(&file_path));
}

#[tokio::test]
async fn test_approved_file_cannot_be_rejected() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let admin = app.admin_token().await;
    let user = app.user_token(Uuid::new_v4());

    let (_, uploaded) = app
        .send(
            Method::POST,
            &format!("/api/courses/{}/files", course.id),
            Some(&user),
            Some(json!({
                "file_name": "notes.pdf",
                "content_type": "application/pdf",
                "type": "notes",
                "content": STANDARD.encode(b"%PDF-1.4 notes"),
            })),
        )
        .await;
    let file_id = uploaded["data"]["id"].as_str().unwrap().to_string();
    let file_path = uploaded["data"]["file_path"].as_str().unwrap().to_string();

    let approve_uri = format!("/api/admin/files/{file_id}/approve");
    let (status, _) = app.send(Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/admin/files/{file_id}/reject"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = app.get(&format!("/api/courses/{}/files", course.id)).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert!(app.storage.contains(&file_path));
}

#[tokio::test]
async fn test_duplicate_grade_distribution_conflicts() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let user = app.user_token(Uuid::new_v4());
    let uri = format!("/api/courses/{}/grade-distributions", course.id);
    let body = json!({
        "academic_year": 2024,
        "semester": "fall",
        "exam_type": "final",
        "bands": review_core::GradeBands::defaults(),
    });

    let (first, _) = app.send(Method::POST, &uri, Some(&user), Some(body.clone())).await;
    let (second, _) = app.send(Method::POST, &uri, Some(&user), Some(body)).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    let (_, listed) = app.get(&uri).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unsupported_upload_rejected() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let user = app.user_token(Uuid::new_v4());

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/courses/{}/files", course.id),
            Some(&user),
            Some(json!({
                "file_name": "virus.exe",
                "content_type": "application/x-msdownload",
                "content": STANDARD.encode(b"MZ"),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn test_guide_approval_without_review() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");
    let admin = app.admin_token().await;
    let user = app.user_token(Uuid::new_v4());

    let (status, submitted) = app
        .send(
            Method::POST,
            &format!("/api/courses/{}/survival-guides", course.id),
            Some(&user),
            Some(json!({ "content": "Do every past exam" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let guide_id = submitted["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/admin/survival-guides/{guide_id}/approve"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["guide"]["status"], "approved");
    assert_eq!(body["data"]["applied_to_review"], false);
}

#[tokio::test]
async fn test_grade_boundaries_default_without_data() {
    let app = create_test_app();
    let (_, course) = app.seed_course("CENG101");

    let (status, body) = app
        .get(&format!("/api/courses/{}/grade-boundaries", course.id))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"]["mode"], "default");
    assert_eq!(body["data"]["bands"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_admin_overview_counts_pending_items() {
    let app = create_test_app();
    let admin = app.admin_token().await;
    let user = app.user_token(Uuid::new_v4());

    app.send(
        Method::POST,
        "/api/tags/suggestions",
        Some(&user),
        Some(json!({ "name": "Tough exams", "type": "negative" })),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, "/api/admin/overview", Some(&admin), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pending_tags"], 1);
    assert_eq!(body["data"]["pending_files"], 0);
}

#[tokio::test]
async fn test_faculty_request_validation() {
    let app = create_test_app();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/faculty-requests",
            None,
            Some(json!({ "faculty_name": "Law", "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/faculty-requests",
            None,
            Some(json!({ "faculty_name": "Law", "email": "a@b.edu" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["faculty_name"], "Law");
}

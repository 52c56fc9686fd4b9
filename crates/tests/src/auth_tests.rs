use crate::fixtures::{seed::PASSWORD, test_app::TestApp};
use serde_json::Value;

#[tokio::test]
async fn register_creates_user_and_returns_tokens() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "Alice@Test.com",
            "username": "alice",
            "full_name": "Alice Doe",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    assert!(resp.headers().get("set-cookie").is_some());

    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["email"], "alice@test.com");
    assert_eq!(json["user"]["username"], "alice");
    assert!(json["user"]["company_id"].is_null());
    assert!(json["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_duplicates_and_weak_input() {
    let app = TestApp::spawn().await;
    app.register_user("bob").await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "bob@test.com",
            "username": "bob_two",
            "full_name": "Bob Again",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    for (username, password) in [
        ("b", PASSWORD),
        ("bob-dash", PASSWORD),
        ("bob_three", "password"),
    ] {
        let resp = app
            .client
            .post(app.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": format!("{username}x@test.com"),
                "username": username,
                "full_name": "Bob",
                "password": password,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422, "{username}/{password} accepted");
    }
}

#[tokio::test]
async fn login_by_username_or_email() {
    let app = TestApp::spawn().await;
    let user = app.register_user("carol").await;

    for credentials in [
        serde_json::json!({ "username": "carol", "password": PASSWORD }),
        serde_json::json!({ "email": user.email, "password": PASSWORD }),
    ] {
        let resp = app
            .client
            .post(app.url("/api/auth/login"))
            .json(&credentials)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["user"]["id"], user.id.as_str());
    }

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": "carol", "password": "Wrong123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn me_requires_a_session() {
    let app = TestApp::spawn().await;
    let user = app.register_user("dave").await;

    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.auth_get("/api/auth/me", "not-a-jwt").send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["username"], "dave");
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let app = TestApp::spawn().await;
    app.register_user("erin").await;

    let browser = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();
    let resp = browser
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": "erin", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = browser.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    browser
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    let resp = browser.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn refresh_issues_new_tokens_but_not_from_access_tokens() {
    let app = TestApp::spawn().await;
    let user = app.register_user("frank").await;

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.access_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn update_password_checks_the_old_one() {
    let app = TestApp::spawn().await;
    let user = app.register_user("gina").await;

    let resp = app
        .auth_post("/api/auth/update-password", &user.access_token)
        .json(&serde_json::json!({ "old_password": "Nope1234!", "new_password": "Fresh123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .auth_post("/api/auth/update-password", &user.access_token)
        .json(&serde_json::json!({ "old_password": PASSWORD, "new_password": "Fresh123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": "gina", "password": "Fresh123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn profile_updates_show_up_in_employee_listings() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("prof").await;

    let resp = app
        .auth_put("/api/auth/profile", &seeded.employee.access_token)
        .json(&serde_json::json!({
            "full_name": "Erin Park",
            "bio": "Writes the docs",
            "skills": ["rust", " ", "mongodb"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["full_name"], "Erin Park");
    assert_eq!(json["skills"], serde_json::json!(["rust", "mongodb"]));
    assert!(json["phone"].is_null());

    let employees: Vec<Value> = app
        .auth_post("/api/project/employees", &seeded.manager.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(employees[0]["bio"], "Writes the docs");

    let resp = app
        .auth_put("/api/auth/profile", &seeded.employee.access_token)
        .json(&serde_json::json!({ "profile_picture_url": "not a url" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

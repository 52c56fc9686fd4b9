use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn creating_a_company_affiliates_the_owner() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("acme_own").await;

    let company_id = app.create_company(&owner, "Acme").await;

    let me: Value = app
        .auth_get("/api/auth/me", &owner.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["company_id"], company_id.as_str());

    let company: Value = app
        .auth_get("/api/company", &owner.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(company["name"], "Acme");
    assert_eq!(company["owner_id"], owner.id.as_str());

    // One company per user.
    let resp = app
        .auth_post("/api/company/create", &owner.access_token)
        .json(&serde_json::json!({ "name": "Acme Two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn company_names_are_unique_and_required() {
    let app = TestApp::spawn().await;
    let first = app.register_user("first").await;
    let second = app.register_user("second").await;
    app.create_company(&first, "Globex").await;

    let resp = app
        .auth_post("/api/company/create", &second.access_token)
        .json(&serde_json::json!({ "name": "Globex" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app
        .auth_post("/api/company/create", &second.access_token)
        .json(&serde_json::json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // The failed attempts left the user unaffiliated.
    let me: Value = app
        .auth_get("/api/auth/me", &second.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(me["company_id"].is_null());
}

#[tokio::test]
async fn invite_link_admits_users_once() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("link_own").await;
    let company_id = app.create_company(&owner, "Initech").await;
    let user = app.register_user("link_usr").await;

    let token = app.company_invite_token(&owner).await;
    let resp = app.join_company(&user, &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["company"]["id"], company_id.as_str());
    assert_eq!(json["already_member"], false);

    // Joining again is a no-op.
    let json: Value = app.join_company(&user, &token).await.json().await.unwrap();
    assert_eq!(json["already_member"], true);

    let resp = app.join_company(&user, "garbage").await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn only_the_owner_issues_invite_links() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("lnk").await;

    let resp = app
        .auth_get("/api/company/company-invite", &seeded.manager.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let loner = app.register_user("loner").await;
    let resp = app
        .auth_get("/api/company/company-invite", &loner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn members_of_another_company_cannot_join() {
    let app = TestApp::spawn().await;
    let a = app.seed_company("ca").await;
    let b = app.seed_company("cb").await;

    let token = app.company_invite_token(&a.owner).await;
    let resp = app.join_company(&b.employee, &token).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn removing_a_member_cascades_memberships_and_invites() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("rm").await;

    // A second project the employee was invited to but never answered.
    let other = app
        .create_project(&seeded.owner, "Side Quest", &seeded.manager.id)
        .await;
    let resp = app
        .auth_post("/api/project/invite", &seeded.manager.access_token)
        .json(&serde_json::json!({ "project_id": other, "user_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({ "user_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["memberships_removed"], 1);
    assert_eq!(report["invites_removed"], 1);

    let me: Value = app
        .auth_get("/api/auth/me", &seeded.employee.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(me["company_id"].is_null());

    // The old token now carries no authority in the project.
    let resp = app
        .auth_get(
            &format!("/api/tasks/project/{}/my-tasks", seeded.project_id),
            &seeded.employee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let employees: Vec<Value> = app
        .auth_post("/api/project/employees", &seeded.manager.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(employees.is_empty());
}

/// Swaps the memberships collection for a read-only view over a copy of it,
/// so reads keep working and every delete fails.
async fn make_memberships_read_only(app: &TestApp) {
    let memberships = app.db.collection::<bson::Document>("project_members");
    memberships
        .aggregate(vec![bson::doc! { "$out": "project_members_rows" }])
        .await
        .unwrap();
    memberships.drop().await.unwrap();
    app.db
        .run_command(bson::doc! {
            "create": "project_members",
            "viewOn": "project_members_rows",
            "pipeline": [],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_cascade_leaves_the_member_attached() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("cas").await;
    make_memberships_read_only(&app).await;

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({ "user_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);

    let me: Value = app
        .auth_get("/api/auth/me", &seeded.employee.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["company_id"], seeded.company_id.as_str());

    let resp = app
        .auth_get(
            &format!("/api/tasks/project/{}/my-tasks", seeded.project_id),
            &seeded.employee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn project_leads_cannot_be_removed_until_archived() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("blk").await;

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({ "user_id": seeded.manager.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["blocking_project_ids"][0], seeded.project_id.as_str());

    let resp = app
        .auth_post("/api/project/archive", &seeded.owner.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id, "archived": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({ "user_id": seeded.manager.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn owner_cannot_be_removed_and_only_owner_removes() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("own").await;

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({ "user_id": seeded.owner.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/company/member/remove", &seeded.manager.access_token)
        .json(&serde_json::json!({ "user_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

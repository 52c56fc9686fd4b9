use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn creating_a_project_seeds_admin_and_manager() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("prj").await;

    let managed: Vec<Value> = app
        .auth_get("/api/project/my/manager", &seeded.manager.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(managed.len(), 1);
    assert_eq!(managed[0]["id"], seeded.project_id.as_str());
    assert_eq!(managed[0]["manager_id"], seeded.manager.id.as_str());

    let working: Vec<Value> = app
        .auth_get("/api/project/my/employee", &seeded.employee.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(working.len(), 1);

    let all: Vec<Value> = app
        .auth_get("/api/project/all", &seeded.owner.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["archived"], false);
}

#[tokio::test]
async fn project_creation_is_owner_only_with_an_in_company_manager() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("pco").await;
    let outsider = app.register_user("pco_out").await;

    let resp = app
        .auth_post("/api/project/create", &seeded.manager.access_token)
        .json(&serde_json::json!({ "name": "Rogue", "manager_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/project/create", &seeded.owner.access_token)
        .json(&serde_json::json!({ "name": "Hire", "manager_id": outsider.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_post("/api/project/create", &seeded.owner.access_token)
        .json(&serde_json::json!({ "name": "pco Launch", "manager_id": seeded.employee.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn archive_moves_projects_between_lists_and_freezes_mutations() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("arc").await;
    let extra = app.company_member(&seeded.owner, "arc_new").await;

    let resp = app
        .auth_post("/api/project/archive", &seeded.owner.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let archived: Vec<Value> = app
        .auth_get("/api/project/archived", &seeded.owner.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    let active: Vec<Value> = app
        .auth_get("/api/project/all", &seeded.owner.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(active.is_empty());

    let resp = app
        .add_employee(&seeded.manager, &seeded.project_id, &extra.id)
        .await;
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");

    // Reads still work on an archived project.
    let resp = app
        .auth_post("/api/project/employees", &seeded.manager.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn employees_cannot_manage_membership() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("emp").await;
    let extra = app.company_member(&seeded.owner, "emp_new").await;

    let resp = app
        .add_employee(&seeded.employee, &seeded.project_id, &extra.id)
        .await;
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    let allowed: Vec<&str> = json["allowed_roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert_eq!(allowed, vec!["admin", "manager"]);

    // Non-members get a plain 403 without the roles list.
    let resp = app
        .auth_post("/api/project/employees", &extra.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert!(json.get("allowed_roles").is_none());
}

#[tokio::test]
async fn adding_twice_conflicts_and_removal_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("dup").await;

    let resp = app
        .add_employee(&seeded.manager, &seeded.project_id, &seeded.employee.id)
        .await;
    assert_eq!(resp.status().as_u16(), 409);

    for expected in [1, 0] {
        let resp = app
            .auth_delete("/api/project/member/remove", &seeded.manager.access_token)
            .json(&serde_json::json!({
                "project_id": seeded.project_id,
                "user_id": seeded.employee.id,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["removed"], expected);
    }

    // The manager is not removable through the employee route.
    let resp = app
        .auth_delete("/api/project/member/remove", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "project_id": seeded.project_id,
            "user_id": seeded.manager.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn reassigning_the_manager_demotes_the_previous_one() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("rea").await;

    let resp = app
        .auth_post("/api/project/manager/reassign", &seeded.manager.access_token)
        .json(&serde_json::json!({
            "project_id": seeded.project_id,
            "manager_id": seeded.employee.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/project/manager/reassign", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "project_id": seeded.project_id,
            "manager_id": seeded.employee.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["manager_id"], seeded.employee.id.as_str());

    let managed: Vec<Value> = app
        .auth_get("/api/project/my/manager", &seeded.manager.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(managed.is_empty());
    let working: Vec<Value> = app
        .auth_get("/api/project/my/employee", &seeded.manager.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(working.len(), 1);

    let resp = app
        .auth_post("/api/project/manager/reassign", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "project_id": seeded.project_id,
            "manager_id": seeded.owner.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

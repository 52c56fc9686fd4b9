use crate::fixtures::{seed::SeededCompany, test_app::TestApp};
use serde_json::Value;

async fn assign(app: &TestApp, seeded: &SeededCompany, body: Value) -> reqwest::Response {
    let mut body = body;
    body["project_id"] = Value::from(seeded.project_id.clone());
    body["assigned_to"] = body
        .get("assigned_to")
        .cloned()
        .unwrap_or_else(|| Value::from(seeded.employee.id.clone()));
    app.auth_post("/api/tasks/assign", &seeded.manager.access_token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn status_update(
    app: &TestApp,
    token: &str,
    task_id: &str,
    status: &str,
) -> reqwest::Response {
    app.auth_post(&format!("/api/tasks/respond/{task_id}"), token)
        .json(&serde_json::json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn task_moves_from_pending_to_completed() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("tsk").await;

    let resp = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Write report", "due_date": "2099-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["status"], "pending");
    assert_eq!(task["assigned_by"], seeded.manager.id.as_str());
    let task_id = task["id"].as_str().unwrap().to_string();

    let resp = status_update(&app, &seeded.employee.access_token, &task_id, "in-progress").await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&format!("/api/tasks/respond/{task_id}"), &seeded.employee.access_token)
        .json(&serde_json::json!({
            "status": "completed",
            "submission_url": "https://files.example.com/report.pdf",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let done: Value = resp.json().await.unwrap();
    assert_eq!(done["status"], "completed");
    assert!(done["completed_at"].is_string());
    assert_eq!(done["submission_url"], "https://files.example.com/report.pdf");

    let resp = status_update(&app, &seeded.employee.access_token, &task_id, "in-progress").await;
    assert_eq!(resp.status().as_u16(), 409);

    // Completed tasks keep their schedule.
    let resp = app
        .auth_put(&format!("/api/tasks/edit/{task_id}"), &seeded.manager.access_token)
        .json(&serde_json::json!({ "due_date": "2099-06-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // Cosmetic edits are still fine.
    let resp = app
        .auth_put(&format!("/api/tasks/edit/{task_id}"), &seeded.manager.access_token)
        .json(&serde_json::json!({ "description": "Filed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn only_the_assignee_responds_with_allowed_statuses() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("rsp").await;
    let colleague = app.company_member(&seeded.owner, "rsp_col").await;
    app.add_employee(&seeded.manager, &seeded.project_id, &colleague.id)
        .await;

    let task: Value = assign(&app, &seeded, serde_json::json!({ "task_name": "Deploy" }))
        .await
        .json()
        .await
        .unwrap();
    let task_id = task["id"].as_str().unwrap();

    let resp = status_update(&app, &colleague.access_token, task_id, "completed").await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = status_update(&app, &seeded.manager.access_token, task_id, "completed").await;
    assert_eq!(resp.status().as_u16(), 403);

    for status in ["pending", "overdue", "done"] {
        let resp = status_update(&app, &seeded.employee.access_token, task_id, status).await;
        assert_eq!(resp.status().as_u16(), 400, "{status} accepted");
    }
}

#[tokio::test]
async fn assignment_requires_an_employee_of_an_active_project() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("asg").await;

    let resp = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Self", "assigned_to": seeded.manager.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);

    let resp = assign(&app, &seeded, serde_json::json!({ "task_name": "  " })).await;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Bad date", "due_date": "tomorrow" }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post("/api/tasks/assign", &seeded.employee.access_token)
        .json(&serde_json::json!({
            "project_id": seeded.project_id,
            "task_name": "Sneaky",
            "assigned_to": seeded.employee.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    app.auth_post("/api/project/archive", &seeded.owner.access_token)
        .json(&serde_json::json!({ "project_id": seeded.project_id }))
        .send()
        .await
        .unwrap();
    let resp = assign(&app, &seeded, serde_json::json!({ "task_name": "Late" })).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn task_listings_are_scoped_by_role() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("lst").await;
    let colleague = app.company_member(&seeded.owner, "lst_col").await;
    app.add_employee(&seeded.manager, &seeded.project_id, &colleague.id)
        .await;

    assign(&app, &seeded, serde_json::json!({ "task_name": "Mine" })).await;
    assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Theirs", "assigned_to": colleague.id }),
    )
    .await;

    let all: Vec<Value> = app
        .auth_get(
            &format!("/api/tasks/project/{}/manager-tasks", seeded.project_id),
            &seeded.manager.access_token,
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let mine: Vec<Value> = app
        .auth_get(
            &format!("/api/tasks/project/{}/my-tasks", seeded.project_id),
            &seeded.employee.access_token,
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["task_name"], "Mine");

    let resp = app
        .auth_get(
            &format!("/api/tasks/project/{}/manager-tasks", seeded.project_id),
            &seeded.employee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Any member can read a single task.
    let task_id = mine[0]["id"].as_str().unwrap();
    let resp = app
        .auth_get(&format!("/api/tasks/{task_id}"), &colleague.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn sweep_marks_past_due_tasks_overdue_once() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("swp").await;

    let late: Value = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Late", "due_date": "2020-01-01" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let late_id = late["id"].as_str().unwrap().to_string();

    let finished: Value = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Done early", "due_date": "2020-01-01" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let finished_id = finished["id"].as_str().unwrap().to_string();
    status_update(&app, &seeded.employee.access_token, &finished_id, "completed").await;

    assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Future", "due_date": "2099-01-01" }),
    )
    .await;

    assert_eq!(app.state.sweep.run_once().await.unwrap(), 1);
    assert_eq!(app.state.sweep.run_once().await.unwrap(), 0);

    let task: Value = app
        .auth_get(&format!("/api/tasks/{late_id}"), &seeded.employee.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["status"], "overdue");

    // Overdue work can still be completed.
    let resp = status_update(&app, &seeded.employee.access_token, &late_id, "completed").await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn moving_an_overdue_due_date_forward_reopens_the_task() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("rop").await;

    let task: Value = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Slipped", "due_date": "2020-01-01" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let task_id = task["id"].as_str().unwrap();
    app.state.sweep.run_once().await.unwrap();

    let resp = app
        .auth_put(&format!("/api/tasks/edit/{task_id}"), &seeded.manager.access_token)
        .json(&serde_json::json!({ "due_date": "2099-01-01T12:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn reopening_write_only_lands_on_overdue_tasks() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("rop2").await;

    let task: Value = assign(
        &app,
        &seeded,
        serde_json::json!({ "task_name": "Slipped", "due_date": "2020-01-01" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let task_id = task["id"].as_str().unwrap();
    app.state.sweep.run_once().await.unwrap();

    // The assignee picks the task up after the manager read it as overdue.
    let resp = status_update(&app, &seeded.employee.access_token, task_id, "in-progress").await;
    assert_eq!(resp.status().as_u16(), 200);

    let id = bson::oid::ObjectId::parse_str(task_id).unwrap();
    let stale = bson::doc! {
        "status": "pending",
        "due_date": bson::DateTime::parse_rfc3339_str("2099-01-01T00:00:00Z").unwrap(),
    };
    let tasks = &app.state.stores.tasks;
    assert!(!tasks.update_where_status(id, "overdue".into(), stale).await.unwrap());
    let stored = tasks.find(id).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "in-progress");

    // Through the API the new due date still applies and progress is kept.
    let resp = app
        .auth_put(&format!("/api/tasks/edit/{task_id}"), &seeded.manager.access_token)
        .json(&serde_json::json!({ "due_date": "2099-01-01T12:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "in-progress");
}

#[tokio::test]
async fn deleting_a_task_is_lead_only() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_company("del").await;

    let task: Value = assign(&app, &seeded, serde_json::json!({ "task_name": "Scratch" }))
        .await
        .json()
        .await
        .unwrap();
    let task_id = task["id"].as_str().unwrap();

    let resp = app
        .auth_delete(&format!("/api/tasks/delete/{task_id}"), &seeded.employee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&format!("/api/tasks/delete/{task_id}"), &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(&format!("/api/tasks/{task_id}"), &seeded.manager.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

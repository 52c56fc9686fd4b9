use serde_json::Value;

use super::test_app::TestApp;

pub const PASSWORD: &str = "Password123!";

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// A company with an owner, one project managed by `manager`, and `employee`
/// on that project.
pub struct SeededCompany {
    pub company_id: String,
    pub owner: SeededUser,
    pub manager: SeededUser,
    pub employee: SeededUser,
    pub project_id: String,
}

impl TestApp {
    /// Register a user and return their auth info.
    pub async fn register_user(&self, username: &str) -> SeededUser {
        let email = format!("{username}@test.com");
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "username": username,
                "full_name": format!("{username} Tester"),
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("Register request failed");

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.expect("Failed to parse register response");
        assert_eq!(status, 201, "Register failed: {json}");

        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email,
            username: username.to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub async fn create_company(&self, owner: &SeededUser, name: &str) -> String {
        let resp = self
            .auth_post("/api/company/create", &owner.access_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(status, 200, "Company create failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    pub async fn company_invite_token(&self, owner: &SeededUser) -> String {
        let json: Value = self
            .auth_get("/api/company/company-invite", &owner.access_token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        json["token"].as_str().unwrap().to_string()
    }

    pub async fn join_company(&self, user: &SeededUser, token: &str) -> reqwest::Response {
        self.auth_post("/api/company/join", &user.access_token)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .unwrap()
    }

    /// Registers `username` and brings them into the owner's company.
    pub async fn company_member(&self, owner: &SeededUser, username: &str) -> SeededUser {
        let user = self.register_user(username).await;
        let token = self.company_invite_token(owner).await;
        let resp = self.join_company(&user, &token).await;
        assert_eq!(resp.status().as_u16(), 200);
        user
    }

    pub async fn create_project(&self, owner: &SeededUser, name: &str, manager_id: &str) -> String {
        let resp = self
            .auth_post("/api/project/create", &owner.access_token)
            .json(&serde_json::json!({ "name": name, "manager_id": manager_id }))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(status, 200, "Project create failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    pub async fn add_employee(
        &self,
        lead: &SeededUser,
        project_id: &str,
        user_id: &str,
    ) -> reqwest::Response {
        self.auth_post("/api/project/member/add", &lead.access_token)
            .json(&serde_json::json!({ "project_id": project_id, "user_id": user_id }))
            .send()
            .await
            .unwrap()
    }

    /// Owner, manager and employee around one project. `prefix` keeps
    /// usernames unique and must be at most 8 characters.
    pub async fn seed_company(&self, prefix: &str) -> SeededCompany {
        let owner = self.register_user(&format!("{prefix}_own")).await;
        let company_id = self.create_company(&owner, &format!("{prefix} Inc")).await;
        let manager = self.company_member(&owner, &format!("{prefix}_mgr")).await;
        let employee = self.company_member(&owner, &format!("{prefix}_emp")).await;

        let project_id = self
            .create_project(&owner, &format!("{prefix} Launch"), &manager.id)
            .await;
        let resp = self.add_employee(&manager, &project_id, &employee.id).await;
        assert_eq!(resp.status().as_u16(), 200);

        SeededCompany {
            company_id,
            owner,
            manager,
            employee,
            project_id,
        }
    }
}

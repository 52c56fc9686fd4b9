use std::sync::Arc;

use mongodb::Database;
use worknest_config::Settings;
use worknest_services::{
    AuthService, Authorizer, ChatService, CompanyService, InviteWorkflow, OverdueSweep,
    ProjectService, Stores, TaskLifecycle,
};

use crate::ws::gateway::RoomGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub stores: Stores,
    pub authz: Authorizer,
    pub companies: Arc<CompanyService>,
    pub projects: Arc<ProjectService>,
    pub invites: Arc<InviteWorkflow>,
    pub tasks: Arc<TaskLifecycle>,
    pub chat: Arc<ChatService>,
    pub sweep: Arc<OverdueSweep>,
    pub gateway: Arc<RoomGateway>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(
            settings.jwt.clone(),
            settings.links.clone(),
        ));
        let stores = Stores::new(&db);
        let authz = Authorizer::new(Arc::new(stores.clone()));

        let companies = Arc::new(CompanyService::new(
            stores.clone(),
            authz.clone(),
            auth.clone(),
        ));
        let projects = Arc::new(ProjectService::new(stores.clone(), authz.clone()));
        let invites = Arc::new(InviteWorkflow::new(
            stores.clone(),
            authz.clone(),
            auth.clone(),
        ));
        let tasks = Arc::new(TaskLifecycle::new(stores.clone(), authz.clone()));
        let chat = Arc::new(ChatService::new(stores.clone(), authz.clone()));
        let sweep = Arc::new(OverdueSweep::new(tasks.clone()));
        let gateway = Arc::new(RoomGateway::new());

        Self {
            db,
            settings,
            auth,
            stores,
            authz,
            companies,
            projects,
            invites,
            tasks,
            chat,
            sweep,
            gateway,
        }
    }
}

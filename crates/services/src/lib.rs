pub mod auth;
pub mod authz;
pub mod background;
pub mod chat;
pub mod company;
pub mod dao;
pub mod error;
pub mod invite;
pub mod project;
pub mod stores;
pub mod task;

pub use auth::AuthService;
pub use authz::{Actor, Authorizer};
pub use background::OverdueSweep;
pub use chat::ChatService;
pub use company::CompanyService;
pub use error::{ServiceError, ServiceResult};
pub use invite::InviteWorkflow;
pub use project::ProjectService;
pub use stores::Stores;
pub use task::TaskLifecycle;

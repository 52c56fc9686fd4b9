pub mod chat_message;
pub mod company;
pub mod invite;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;

pub use chat_message::ChatMessage;
pub use company::Company;
pub use invite::{InviteStatus, ProjectInvite};
pub use membership::{Membership, ProjectRole};
pub use project::Project;
pub use task::{Task, TaskStatus};
pub use user::User;

pub mod base;
pub mod chat;
pub mod company;
pub mod invite;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;

pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams, persisted};

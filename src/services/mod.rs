//! Business logic between handlers and the database layer. Services validate input,
//! enforce the workflow rules and translate repository outcomes into `AppError`s.

mod admin;
mod company;
mod reference;
mod review;
mod suggestion;
mod user;

pub use admin::AdminService;
pub use company::CompanyService;
pub use reference::ReferenceService;
pub use review::ReviewService;
pub use suggestion::SuggestionService;
pub use user::UserService;

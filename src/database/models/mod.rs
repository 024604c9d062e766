pub mod file;
pub mod member;
pub mod message;
pub mod project;
pub mod user;

pub use file::{FileSummary, FileWindow, FileWithCreator, ProjectFile};
pub use member::{Member, MemberSummary};
pub use message::{Message, MessageSummary, MessageWindow, MessageWithCreator};
pub use project::{DeletedProject, Project, ProjectDetails, ProjectPage};
pub use user::{SanitizedUser, User, UserPage, UserSummary};

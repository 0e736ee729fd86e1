pub mod user;
pub mod project;
pub mod article;
pub mod post;
pub mod comment;
pub mod engagement;
pub mod search;

// Re-export models for convenience
pub use user::{User, UserType};
pub use project::Project;
pub use article::Article;
pub use post::Post;
pub use comment::Comment;
pub use engagement::{EngagementState, Follow, Like, TargetKind, Watch};
pub use search::{ContentType, Page, PaginationParams, SearchQuery, SearchResults, SortKey};

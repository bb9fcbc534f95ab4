pub mod category;
pub mod member;

pub use category::{step_delta, Category, CategoryPatch, Step};
pub use member::{Member, MemberFields};

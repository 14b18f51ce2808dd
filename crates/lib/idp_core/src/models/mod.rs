//! Domain models shared by the store, the token domains and the HTTP layer.

pub mod claims;
pub mod identity;
pub mod page;

pub use claims::{AdminClaims, ApplicationClaims, UserClaims};
pub use identity::{
    Admin, AdminPatch, AdminWithPassword, Application, ApplicationPatch, NewAdmin,
    NewApplication, NewUser, User, UserPatch, UserWithPassword,
};
pub use page::{Page, PageRequest};

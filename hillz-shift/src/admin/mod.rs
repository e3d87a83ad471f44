//! Web administration UI.
//!
//! Provides:
//! - The login page, which hands an identity token to `POST /api/auth`
//! - The admin shell for dashboard, registrations, invitations and analytics
//! - Logout
//!
//! Every shell page goes through the session gate and sends the browser
//! back to the login page when it fails.

pub mod routes;
pub mod templates;

pub use routes::admin_router;
pub use templates::{AdminSection, LoginMethod};

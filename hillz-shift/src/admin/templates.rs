//! Askama templates for the admin UI.

use anyhow::Result;
use askama::Template;
use std::str::FromStr;

use crate::analytics::{AnalyticsReport, DashboardStats};
use crate::identity::password_sign_in_url;

/// Pages of the admin shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSection {
    Dashboard,
    Registrations,
    Invitations,
    Analytics,
}

impl AdminSection {
    pub const ALL: [AdminSection; 4] = [
        AdminSection::Dashboard,
        AdminSection::Registrations,
        AdminSection::Invitations,
        AdminSection::Analytics,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            AdminSection::Dashboard => "dashboard",
            AdminSection::Registrations => "registrations",
            AdminSection::Invitations => "invitations",
            AdminSection::Analytics => "analytics",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AdminSection::Dashboard => "Dashboard",
            AdminSection::Registrations => "Registrations",
            AdminSection::Invitations => "Invitations",
            AdminSection::Analytics => "Analytics",
        }
    }

    pub fn href(&self) -> String {
        format!("/admin/{}", self.slug())
    }
}

impl FromStr for AdminSection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminSection::ALL
            .into_iter()
            .find(|section| section.slug() == s)
            .ok_or(())
    }
}

/// Sidebar entry
pub struct NavItem {
    pub href: String,
    pub title: &'static str,
    pub active: bool,
}

impl NavItem {
    pub fn for_sections(current: AdminSection) -> Vec<NavItem> {
        AdminSection::ALL
            .into_iter()
            .map(|section| NavItem {
                href: section.href(),
                title: section.title(),
                active: section == current,
            })
            .collect()
    }
}

/// How the login page obtains an identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    /// Email and password, exchanged for an ID token at `sign_in_url`
    Password { sign_in_url: String },
    /// A pasted mock token. Dry-run only.
    Token,
}

impl LoginMethod {
    pub fn password(api_key: &str) -> Result<Self> {
        Ok(LoginMethod::Password {
            sign_in_url: password_sign_in_url(api_key)?,
        })
    }
}

/// Login page template
#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    /// Set for email/password sign-in; `None` shows the token field
    pub sign_in_url: Option<String>,
}

impl LoginTemplate {
    pub fn new(method: &LoginMethod, error: Option<String>) -> Self {
        let sign_in_url = match method {
            LoginMethod::Password { sign_in_url } => Some(sign_in_url.clone()),
            LoginMethod::Token => None,
        };
        Self { error, sign_in_url }
    }
}

/// Admin shell template
#[derive(Template)]
#[template(path = "admin/shell.html")]
pub struct ShellTemplate {
    /// Signed-in admin, shown in the header
    pub email: String,
    pub title: &'static str,
    pub slug: &'static str,
    pub nav: Vec<NavItem>,
    pub stats: DashboardStats,
    /// Only filled for the analytics page
    pub report: Option<AnalyticsReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_slugs() {
        for section in AdminSection::ALL {
            assert_eq!(section.slug().parse::<AdminSection>(), Ok(section));
        }
        assert!("settings".parse::<AdminSection>().is_err());
        assert!("Dashboard".parse::<AdminSection>().is_err());
    }

    #[test]
    fn test_nav_marks_current_section() {
        let nav = NavItem::for_sections(AdminSection::Invitations);
        let active: Vec<&str> = nav.iter().filter(|n| n.active).map(|n| n.title).collect();
        assert_eq!(active, vec!["Invitations"]);
        assert_eq!(nav[0].href, "/admin/dashboard");
    }

    #[test]
    fn test_login_template_renders() {
        let html = LoginTemplate::new(&LoginMethod::Token, Some("<bad>".to_string()))
            .render()
            .unwrap();
        assert!(html.contains("/api/auth"));
        assert!(!html.contains("<bad>"));
    }

    #[test]
    fn test_login_template_password_mode() {
        let method = LoginMethod::password("AIzaTestKey").unwrap();
        let html = LoginTemplate::new(&method, None).render().unwrap();
        assert!(html.contains("signInWithPassword"));
        assert!(html.contains("AIzaTestKey"));
        assert!(html.contains(r#"type="password""#));
        assert!(html.contains("returnSecureToken"));
        assert!(!html.contains("<textarea"));
    }

    #[test]
    fn test_login_template_token_mode() {
        let html = LoginTemplate::new(&LoginMethod::Token, None)
            .render()
            .unwrap();
        assert!(html.contains("<textarea"));
        assert!(!html.contains(r#"type="password""#));
        assert!(!html.contains("data-sign-in-url"));
    }

    #[test]
    fn test_shell_template_renders() {
        let html = ShellTemplate {
            email: "a@x.com".to_string(),
            title: AdminSection::Dashboard.title(),
            slug: AdminSection::Dashboard.slug(),
            nav: NavItem::for_sections(AdminSection::Dashboard),
            stats: DashboardStats::build(vec![], vec![]),
            report: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("a@x.com"));
        assert!(html.contains("/admin/logout"));
        assert!(html.contains("/admin/analytics"));
    }
}

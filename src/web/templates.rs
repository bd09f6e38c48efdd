use super::view::{HeaderView, RoleInfo, SectionView};
use askama::Template;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub header: HeaderView,
    pub sections: Vec<SectionView>,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub header: HeaderView,
    pub roles: &'static [RoleInfo],
    pub console_url: String,
}

#[derive(Template)]
#[template(path = "access_denied.html")]
pub struct AccessDeniedTemplate {
    pub header: HeaderView,
}

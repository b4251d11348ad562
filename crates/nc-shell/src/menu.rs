//! Role-conditioned navigation menu

use crate::routes::Route;
use nc_core::Role;

/// Sidebar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    /// Label
    pub title: &'static str,
    /// Target screen
    pub route: Route,
}

const fn item(title: &'static str, route: Route) -> MenuItem {
    MenuItem { title, route }
}

/// Dashboard, tests and reports
pub const PATIENT_MENU: [MenuItem; 3] = [
    item("Dashboard", Route::Dashboard),
    item("Tests", Route::Tests),
    item("Reports", Route::Reports),
];

/// Dashboard, patients and tests
pub const CLINICIAN_MENU: [MenuItem; 3] = [
    item("Dashboard", Route::Dashboard),
    item("Patients", Route::Patients),
    item("Tests", Route::Tests),
];

/// Dashboard, patients and settings
pub const ADMIN_MENU: [MenuItem; 3] = [
    item("Dashboard", Route::Dashboard),
    item("Patients", Route::Patients),
    item("Settings", Route::AdminSettings),
];

/// Menu for a role; anything but an exact admin or clinician match gets the
/// patient menu
#[must_use]
pub fn menu_for(role: Option<Role>) -> &'static [MenuItem] {
    match role {
        Some(Role::Admin) => &ADMIN_MENU,
        Some(Role::Clinician) => &CLINICIAN_MENU,
        Some(Role::Patient) | None => &PATIENT_MENU,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menus_by_role() {
        assert_eq!(menu_for(Some(Role::Admin))[2].route, Route::AdminSettings);
        assert_eq!(menu_for(Some(Role::Clinician))[1].title, "Patients");
        assert_eq!(menu_for(None), &PATIENT_MENU[..]);
    }
}

//! Navigation menus, filtered by role

use serde::Serialize;

use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub href: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSection {
    pub title: &'static str,
    pub items: &'static [MenuItem],
}

pub const USER_MENU: &[MenuItem] = &[
    MenuItem {
        href: "/user/dashboard",
        label: "Dashboard",
    },
    MenuItem {
        href: "/user/desafios",
        label: "Meus Desafios",
    },
    MenuItem {
        href: "/user/riscos-criticos",
        label: "Riscos Críticos",
    },
    MenuItem {
        href: "/user/abrangencia-acidentes",
        label: "Abrangência de Acidentes",
    },
];

pub const ADMIN_MENU: &[MenuItem] = &[
    MenuItem {
        href: "/admin/usuarios",
        label: "Gerenciar Usuários",
    },
    MenuItem {
        href: "/admin/grupos",
        label: "Gerenciar Grupos",
    },
    MenuItem {
        href: "/admin/contratos",
        label: "Gerenciar Contratos",
    },
];

/// Everyone gets the user menu; admins also get the admin menu
pub fn sidebar_for(role: Option<Role>) -> Vec<MenuSection> {
    let mut sections = vec![MenuSection {
        title: "Menu",
        items: USER_MENU,
    }];
    if role == Some(Role::Admin) {
        sections.push(MenuSection {
            title: "Administração",
            items: ADMIN_MENU,
        });
    }
    sections
}

//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::auth::{Role, Status};
use crate::models::PublicUser;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

fn role_color(role: Role) -> Color {
    match role {
        Role::Admin => Color::Magenta,
        Role::Manager => Color::Blue,
        Role::User => Color::Reset,
    }
}

/// Print a table of users
pub fn print_user_table(users: &[PublicUser]) {
    if users.is_empty() {
        info("No users found. Create one with 'academia create-admin'");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Matrícula").fg(Color::Cyan),
            Cell::new("Nome").fg(Color::Cyan),
            Cell::new("Email").fg(Color::Cyan),
            Cell::new("Telefone").fg(Color::Cyan),
            Cell::new("Role").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
            Cell::new("Grupo").fg(Color::Cyan),
        ]);

    for user in users {
        let status_color = match user.status {
            Status::Active => Color::Green,
            Status::Inactive => Color::Red,
        };

        table.add_row(vec![
            Cell::new(user.matricula),
            Cell::new(&user.name),
            Cell::new(&user.email),
            Cell::new(&user.phone),
            Cell::new(user.role).fg(role_color(user.role)),
            Cell::new(user.status).fg(status_color),
            Cell::new(
                user.group_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("{table}");
}

/// Confirm an action with the user
pub fn confirm(message: &str) -> bool {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}

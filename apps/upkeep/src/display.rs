//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use serde::Serialize;
use std::io;
use upkeep_types::{ColorChoice, Package, Repository};

/// What a command hands back for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CommandResult {
    Packages(Vec<Package>),
    Repositories(Vec<Repository>),
    Success(String),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Packages(packages) => {
                self.render_package_list(packages);
            }
            CommandResult::Repositories(repositories) => {
                self.render_repository_list(repositories);
            }
            CommandResult::Success(message) => {
                println!("{}", self.style(Style::new().green()).apply_to(message));
            }
        }
        Ok(())
    }

    fn render_package_list(&self, packages: &[Package]) {
        if packages.is_empty() {
            println!("No packages.");
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Installed").add_attribute(Attribute::Bold),
            Cell::new("Candidate").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Summary").add_attribute(Attribute::Bold),
        ]);

        for package in packages {
            table.add_row(vec![
                Cell::new(&package.display_name),
                Cell::new(dash_if_empty(&package.installed_version)),
                Cell::new(dash_if_empty(&package.candidate_version)),
                self.package_status(package),
                Cell::new(dash_if_empty(&package.summary)),
            ]);
        }

        println!("{table}");
    }

    fn render_repository_list(&self, repositories: &[Repository]) {
        if repositories.is_empty() {
            println!("No repositories.");
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Repository").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("State").add_attribute(Attribute::Bold),
        ]);

        for repository in repositories {
            let state = match (repository.is_virtual, repository.enabled) {
                (true, _) => self.colored("not configured", Color::DarkGrey),
                (false, true) => self.colored("enabled", Color::Green),
                (false, false) => self.colored("disabled", Color::Yellow),
            };
            table.add_row(vec![
                Cell::new(&repository.id),
                Cell::new(&repository.description),
                state,
            ]);
        }

        println!("{table}");
    }

    fn package_status(&self, package: &Package) -> Cell {
        if package.update_available && package.is_installed() {
            self.colored("update available", Color::Cyan)
        } else if package.is_installed() {
            self.colored("installed", Color::Green)
        } else {
            self.colored("available", Color::Blue)
        }
    }

    fn colored(&self, text: &str, color: Color) -> Cell {
        if self.colors_enabled() {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.colors_enabled() {
            style
        } else {
            Style::new()
        }
    }

    fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => Term::stdout().features().colors_supported(),
        }
    }
}

fn dash_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut package = Package::new("acme-daemon");
        package.set_installed("1.0");
        let result = CommandResult::Packages(vec![package]);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "packages");
        assert_eq!(value["data"][0]["name"], "acme-daemon");
        assert_eq!(value["data"][0]["installed_version"], "1.0");
    }

    #[test]
    fn test_dash_if_empty() {
        assert_eq!(dash_if_empty(""), "-");
        assert_eq!(dash_if_empty("1.0"), "1.0");
    }
}

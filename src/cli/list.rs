//! List available fragments.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::common::Session;
use crate::catalog::{self, HelpTextOptions, ListFilters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    /// Slugs only.
    Simple,
    /// Slugs with descriptions and categories.
    Detailed,
}

/// List available prompts, optionally filtered.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Filter to another project's fragments.
    #[arg(long, value_name = "NAME")]
    project: Option<String>,

    /// Filter to another language's fragments.
    #[arg(long, value_name = "NAME")]
    language: Option<String>,

    /// Show only fragments carrying this category.
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "detailed")]
    format: ListFormat,
}

impl ListCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let filters = ListFilters {
            project: self.project.clone(),
            language: self.language.clone(),
            category: self.category.clone(),
        };
        let catalog = catalog::list_fragments(&session.context, &filters)?;

        let mut applied: Vec<String> = Vec::new();
        if let Some(project) = self.project.as_deref().or(session.project.as_deref()) {
            applied.push(format!("project: {project}"));
        }
        if let Some(language) = self.language.as_deref().or(session.language.as_deref()) {
            applied.push(format!("language: {language}"));
        }
        if let Some(category) = &self.category {
            applied.push(format!("category: {category}"));
        }
        let suffix = if applied.is_empty() {
            String::new()
        } else {
            format!(" ({})", applied.join(", "))
        };
        println!("Available prompt fragments{suffix}:");

        if catalog.entries.is_empty() {
            println!("No prompts found matching the specified criteria.");
            return Ok(());
        }

        match self.format {
            ListFormat::Simple => {
                for entry in &catalog.entries {
                    println!("  {}", entry.slug);
                }
            }
            ListFormat::Detailed => {
                let text = catalog::help_text(
                    &session.context,
                    &catalog,
                    &HelpTextOptions {
                        slug_prefix: "",
                        include_syntax: false,
                        include_header: false,
                    },
                );
                print!("{text}");
            }
        }

        for shadowed in &catalog.shadowed {
            println!(
                "{}",
                format!(
                    "note: {} is shadowed by a higher-precedence root ({})",
                    shadowed.slug,
                    shadowed.path.display()
                )
                .dimmed()
            );
        }
        Ok(())
    }
}

//! Command-line interface for treetrace.
//!
//! This module provides the CLI structure and command handlers for the
//! `treetrace` binary.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ServeCommand, SessionsCommand, StatusCommand, TreeCommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::tree::AncestorNode;

/// treetrace - Family trees with hereditary health history
///
/// Serves the TreeTrace REST API and offers maintenance commands for its
/// database.
#[derive(Debug, Parser)]
#[command(name = "treetrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Show database location and record counts
    Status(StatusCommand),

    /// Print a member's ancestors
    Tree(TreeCommand),

    /// Maintain login sessions
    #[command(subcommand)]
    Sessions(SessionsCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

/// Print database location and record counts.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or queried.
pub fn status(config: &Config, json: bool) -> Result<String> {
    let path = config.database_path();
    let stats = Storage::open(&path)?.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": path,
            "stats": stats,
        });
        return Ok(serde_json::to_string_pretty(&status)?);
    }

    Ok(format!(
        "treetrace status\n\
         ----------------\n\
         Database:          {}\n\
         Schema version:    {}\n\
         Size:              {} bytes\n\
         Users:             {}\n\
         Sessions:          {}\n\
         Family members:    {} ({} public)\n\
         Health conditions: {}",
        path.display(),
        stats.schema_version,
        stats.db_size_bytes,
        stats.users,
        stats.sessions,
        stats.family_members,
        stats.public_family_members,
        stats.health_conditions,
    ))
}

/// Render a member's ancestors.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the member does not exist.
pub fn tree(storage: &Storage, config: &Config, cmd: &TreeCommand) -> Result<String> {
    let member = storage
        .get_member(&cmd.member_id)?
        .ok_or_else(|| Error::not_found("family member", &cmd.member_id))?;
    let depth = config.resolve_depth(cmd.depth);
    let pedigree = storage
        .family_index(&member.user_id)?
        .ancestors(&member.id, depth)
        .ok_or_else(|| Error::not_found("family member", &cmd.member_id))?;

    if cmd.json {
        return Ok(serde_json::to_string_pretty(&pedigree)?);
    }

    let mut out = String::new();
    render_pedigree(&pedigree, "", "", &mut out);
    Ok(out.trim_end().to_string())
}

fn render_pedigree(node: &AncestorNode, label: &str, indent: &str, out: &mut String) {
    let member = &node.member;
    let years = match (member.birth_date, member.death_date) {
        (Some(b), Some(d)) => format!(" ({} - {})", b.format("%Y"), d.format("%Y")),
        (Some(b), None) => format!(" (b. {})", b.format("%Y")),
        (None, Some(d)) => format!(" (d. {})", d.format("%Y")),
        (None, None) => String::new(),
    };
    out.push_str(&format!("{indent}{label}{}{years} [{}]\n", member.full_name(), member.id));

    let child_indent = format!("{indent}  ");
    if let Some(father) = &node.father {
        render_pedigree(father, "father: ", &child_indent, out);
    }
    if let Some(mother) = &node.mother {
        render_pedigree(mother, "mother: ", &child_indent, out);
    }
}

/// Render the configuration for `config show`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn show_config(config: &Config, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(config)?);
    }

    Ok(format!(
        "Current Configuration\n\
         =====================\n\
         \n\
         [Server]\n\
         \x20 Bind address:        {}\n\
         \n\
         [Storage]\n\
         \x20 Database path:       {}\n\
         \n\
         [Auth]\n\
         \x20 Session TTL (hours): {}\n\
         \x20 Min password length: {}\n\
         \n\
         [Tree]\n\
         \x20 Default depth:       {}\n\
         \x20 Max depth:           {}\n\
         \n\
         [Suggestions]\n\
         \x20 Min score:           {}\n\
         \x20 Max results:         {}\n\
         \n\
         [Search]\n\
         \x20 Max results:         {}",
        config.server.bind_address,
        config.database_path().display(),
        config.auth.session_ttl_hours,
        config.auth.min_password_length,
        config.tree.default_depth,
        config.tree.max_depth,
        config.suggestions.min_score,
        config.suggestions.max_results,
        config.search.max_results,
    ))
}

/// Load the configuration file at `path` through the usual layers and
/// validate the result.
///
/// # Errors
///
/// Returns an error if the file does not exist, cannot be parsed, or holds
/// invalid values.
pub fn validate_config(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::ConfigValidation {
            message: format!("{} does not exist", path.display()),
        });
    }
    Config::load_from(Some(path.to_path_buf()))?;
    Ok(format!("Configuration is valid: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, NewFamilyMember, NewUser};
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "treetrace");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;
        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["treetrace", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve(cmd) => assert_eq!(cmd.bind, Some("0.0.0.0:9000".parse().unwrap())),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["treetrace", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn test_parse_tree() {
        let cli = Cli::try_parse_from(["treetrace", "tree", "abc", "--depth", "2", "--json"]).unwrap();
        match cli.command {
            Command::Tree(cmd) => {
                assert_eq!(cmd.member_id, "abc");
                assert_eq!(cmd.depth, Some(2));
                assert!(cmd.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_sessions_prune() {
        let cli = Cli::try_parse_from(["treetrace", "sessions", "prune"]).unwrap();
        assert!(matches!(cli.command, Command::Sessions(SessionsCommand::Prune)));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli =
            Cli::try_parse_from(["treetrace", "-c", "/custom/config.toml", "-vv", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_status_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: crate::config::StorageConfig {
                database_path: Some(dir.path().join("treetrace.db")),
            },
            ..Config::default()
        };

        let text = status(&config, false).unwrap();
        assert!(text.contains("Users:             0"));

        let json: serde_json::Value = serde_json::from_str(&status(&config, true).unwrap()).unwrap();
        assert_eq!(json["stats"]["family_members"], 0);
    }

    #[test]
    fn test_tree_renders_pedigree() {
        let storage = Storage::open_in_memory().unwrap();
        let user = storage
            .register_user(NewUser {
                email: "ada@example.com".to_string(),
                password: "password123".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Berg".to_string(),
            })
            .unwrap();
        let dad = storage
            .create_member(
                &user.id,
                NewFamilyMember {
                    name: "Karl".to_string(),
                    surname: "Berg".to_string(),
                    gender: Gender::Male,
                    ..NewFamilyMember::default()
                },
            )
            .unwrap();
        let kid = storage
            .create_member(
                &user.id,
                NewFamilyMember {
                    name: "Nils".to_string(),
                    surname: "Berg".to_string(),
                    father_id: Some(dad.id.clone()),
                    ..NewFamilyMember::default()
                },
            )
            .unwrap();

        let cmd = TreeCommand {
            member_id: kid.id.clone(),
            depth: None,
            json: false,
        };
        let text = tree(&storage, &Config::default(), &cmd).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Nils Berg"));
        assert!(lines[1].starts_with("  father: Karl Berg"));

        let missing = TreeCommand {
            member_id: "nope".to_string(),
            depth: None,
            json: true,
        };
        assert!(tree(&storage, &Config::default(), &missing)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_show_config() {
        let config = Config::default();
        let text = show_config(&config, false).unwrap();
        assert!(text.contains("Bind address:        127.0.0.1:8080"));
        let json: serde_json::Value =
            serde_json::from_str(&show_config(&config, true).unwrap()).unwrap();
        assert_eq!(json["tree"]["max_depth"], 12);
    }

    #[test]
    fn test_validate_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("good.toml", "[tree]\nmax_depth = 6\n")?;
            jail.create_file("bad.toml", "[tree]\ndefault_depth = 9\nmax_depth = 3\n")?;
            let dir = jail.directory();

            let ok = validate_config(&dir.join("good.toml")).unwrap();
            assert!(ok.starts_with("Configuration is valid"));

            let err = validate_config(&dir.join("bad.toml")).unwrap_err();
            assert!(err.to_string().contains("default_depth"));

            let missing = validate_config(&dir.join("missing.toml")).unwrap_err();
            assert!(missing.to_string().contains("does not exist"));
            Ok(())
        });
    }
}

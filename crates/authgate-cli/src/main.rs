mod commands;

use std::path::{Path, PathBuf};

use authgate_api::{GuardConfig, TransportFactory};
use authgate_connectors::DefaultTransportFactory;
use authgate_core::config::CONFIG_FILE_NAME;
use authgate_core::{apply_env, load_config_from_dir, validate_config, write_default_config_file};
use authgate_runtime::create_guard_client;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{access, session};

#[derive(Debug, Parser)]
#[command(name = "authgate", about = "authgate CLI: inspect a cookie session against a guarded backend")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Override `api_base_url` from guard.toml and the environment
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Sign in before running the command. The session lives only as long as
/// this process.
#[derive(Debug, Clone, Args)]
pub struct SignIn {
    #[arg(long)]
    pub email: Option<String>,
    /// Read the password from stdin instead of prompting
    #[arg(long, requires = "email")]
    pub password_stdin: bool,
    /// Ask for a long-lived session
    #[arg(long, requires = "email")]
    pub remember: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default guard.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Show the signed-in user
    Whoami {
        #[command(flatten)]
        sign_in: SignIn,
    },
    /// Log in with email/password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password_stdin: bool,
        #[arg(long)]
        remember: bool,
    },
    Logout,
    /// Ask the backend whether the session may reach a route
    CanAccess {
        route: String,
        #[arg(long)]
        middleware: Option<String>,
        #[command(flatten)]
        sign_in: SignIn,
    },
    /// Check the signed-in user for any of the given roles
    HasRole {
        #[arg(required = true)]
        roles: Vec<String>,
        #[command(flatten)]
        sign_in: SignIn,
    },
    /// Run the view gate and print its decision
    Check {
        #[arg(long = "role")]
        roles: Vec<String>,
        #[arg(long)]
        backend_check: bool,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        middleware: Option<String>,
        #[arg(long)]
        redirect_to: Option<String>,
        #[command(flatten)]
        sign_in: SignIn,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(config_dir);

    if let Commands::Init { force } = cli.command {
        return init(&cfg_dir, force, cli.json);
    }

    let config = load_config(&cfg_dir, cli.base_url.as_deref())?;
    let transport = DefaultTransportFactory.build(&config)?;
    let ctx = create_guard_client(config, transport)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        // ─── Session ────────────────────────────────────────────────────
        Commands::Whoami { sign_in } => {
            session::sign_in(&ctx, &sign_in).await?;
            session::cmd_whoami(&ctx, cli.json).await?;
        }
        Commands::Login {
            email,
            password_stdin,
            remember,
        } => {
            let sign_in = SignIn {
                email: Some(email),
                password_stdin,
                remember,
            };
            session::cmd_login(&ctx, &sign_in, cli.json).await?;
        }
        Commands::Logout => {
            session::cmd_logout(&ctx, cli.json).await?;
        }

        // ─── Access ─────────────────────────────────────────────────────
        Commands::CanAccess {
            route,
            middleware,
            sign_in,
        } => {
            session::sign_in(&ctx, &sign_in).await?;
            access::cmd_can_access(&ctx, &route, middleware.as_deref(), cli.json).await?;
        }
        Commands::HasRole { roles, sign_in } => {
            session::sign_in(&ctx, &sign_in).await?;
            access::cmd_has_role(&ctx, roles, cli.json).await?;
        }
        Commands::Check {
            roles,
            backend_check,
            route,
            middleware,
            redirect_to,
            sign_in,
        } => {
            session::sign_in(&ctx, &sign_in).await?;
            let check = access::CheckArgs {
                roles,
                backend_check,
                route,
                middleware,
                redirect_to,
            };
            access::cmd_check(&ctx, check, cli.json).await?;
        }
    }

    Ok(())
}

fn init(cfg_dir: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = cfg_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        if !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        std::fs::remove_file(&path)?;
    }
    let written = write_default_config_file(cfg_dir)?;
    pout(
        json,
        serde_json::json!({"message": "init complete", "config_file": written}),
        &format!("Wrote {}", written.display()),
    )
}

fn config_dir() -> PathBuf {
    dirs::config_dir().map_or_else(authgate_core::default_config_dir, |d| d.join("authgate"))
}

/// guard.toml if present, then `AUTHGATE_*` variables, then `--base-url`.
fn load_config(cfg_dir: &Path, base_url: Option<&str>) -> anyhow::Result<GuardConfig> {
    let config = if cfg_dir.join(CONFIG_FILE_NAME).exists() {
        load_config_from_dir(cfg_dir)?
    } else {
        tracing::debug!(dir = %cfg_dir.display(), "no guard.toml; using defaults");
        GuardConfig::default()
    };
    let mut config = apply_env(config)?;
    if let Some(url) = base_url {
        config.api_base_url = url.to_string();
    }
    validate_config(&config)?;
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_collects_repeated_roles() {
        let cli = Cli::parse_from([
            "authgate", "--json", "check", "--role", "admin", "--role", "editor",
            "--backend-check", "--route", "/admin",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Check {
                roles,
                backend_check,
                route,
                ..
            } => {
                assert_eq!(roles, ["admin", "editor"]);
                assert!(backend_check);
                assert_eq!(route.as_deref(), Some("/admin"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn remember_flag_reaches_sign_in() {
        let cli = Cli::parse_from(["authgate", "whoami", "--email", "a@b.c", "--remember"]);
        match cli.command {
            Commands::Whoami { sign_in } => assert!(sign_in.remember),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["authgate", "whoami", "--remember"]).is_err());
    }

    #[test]
    fn password_stdin_requires_email() {
        assert!(Cli::try_parse_from(["authgate", "whoami", "--password-stdin"]).is_err());
    }

    #[test]
    fn base_url_flag_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "api_base_url = \"http://file.example\"\nmode = \"mpa\"\n",
        )
        .unwrap();

        let config = load_config(dir.path(), Some("http://flag.example")).unwrap();
        assert_eq!(config.api_base_url, "http://flag.example");
        assert_eq!(config.mode, authgate_api::GuardMode::Mpa);
    }
}

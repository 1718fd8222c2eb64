//! Command-line controller for the authentication service.
//!
//! Parses the command line and drives `AuthenticationService` for one
//! command. Everything here is blocking; `main` runs it on a worker thread.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use craftauth_core::{AuthError, AuthenticationService, PersistenceError};
use tracing::{info, warn};

use crate::config::Config;

/// Environment fallbacks for non-interactive use
const USERNAME_ENV: &str = "CRAFTAUTH_USERNAME";
const PASSWORD_ENV: &str = "CRAFTAUTH_PASSWORD";

const USAGE: &str = "\
Usage: craftauth [--minecraft-dir DIR] [--log-dir DIR] <COMMAND>

Commands:
  login [--force-login] [--username NAME]   Restore the saved login or log in
  restore                                   Restore the saved login only
  logout                                    Forget the saved login
  validate                                  Check the saved access token
  status                                    Show the saved login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        force_login: bool,
        username: Option<String>,
    },
    Restore,
    Logout,
    Validate,
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub minecraft_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub command: Command,
}

impl Cli {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut minecraft_dir = None;
        let mut log_dir = None;
        let mut command = None;
        let mut force_login = false;
        let mut username = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--minecraft-dir" => {
                    minecraft_dir = Some(PathBuf::from(Self::value(&mut args, &arg)?));
                }
                "--log-dir" => log_dir = Some(PathBuf::from(Self::value(&mut args, &arg)?)),
                "--force-login" => force_login = true,
                "--username" => username = Some(Self::value(&mut args, &arg)?),
                "-h" | "--help" => command = Some("help".to_string()),
                other if other.starts_with('-') => bail!("Unknown option: {}\n\n{}", other, USAGE),
                other => {
                    if command.is_some() {
                        bail!("Unexpected argument: {}\n\n{}", other, USAGE);
                    }
                    command = Some(other.to_string());
                }
            }
        }

        let command = match command.as_deref() {
            Some("login") => Command::Login {
                force_login,
                username,
            },
            Some("restore") => Command::Restore,
            Some("logout") => Command::Logout,
            Some("validate") => Command::Validate,
            Some("status") => Command::Status,
            Some("help") | None => Command::Help,
            Some(other) => bail!("Unknown command: {}\n\n{}", other, USAGE),
        };

        if !matches!(command, Command::Login { .. }) && force_login {
            bail!("--force-login only applies to login");
        }

        Ok(Self {
            minecraft_dir,
            log_dir,
            command,
        })
    }

    fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
        args.next()
            .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
    }
}

pub struct App {
    config: Config,
    minecraft_dir: PathBuf,
}

impl App {
    pub fn new(config: Config, minecraft_dir: PathBuf) -> Self {
        Self {
            config,
            minecraft_dir,
        }
    }

    pub fn run(mut self, command: Command) -> Result<()> {
        if let Command::Help = command {
            println!("{}", USAGE);
            return Ok(());
        }

        let mut service =
            AuthenticationService::connect(self.config.auth.clone(), self.minecraft_dir.clone())
                .context("Failed to create auth service")?;

        match command {
            Command::Login {
                force_login,
                username,
            } => self.login(&mut service, force_login, username),
            Command::Restore => match service.restore_last_login() {
                Ok(Some(handle)) => {
                    Self::report_session(&service);
                    println!("{}", handle);
                    Ok(())
                }
                Ok(None) => bail!("No saved login in {}", self.minecraft_dir.display()),
                Err(e) => bail!(e.user_message()),
            },
            Command::Logout => {
                service.logout().map_err(|e| anyhow::anyhow!(e.user_message()))?;
                eprintln!("Logged out.");
                Ok(())
            }
            Command::Validate => {
                let record = Self::saved_login(&service)?;
                if service.validate(&record.access_token) {
                    eprintln!("Saved access token is valid.");
                    Ok(())
                } else {
                    bail!("Saved access token is no longer valid")
                }
            }
            Command::Status => {
                let record = Self::saved_login(&service)?;
                println!("Profile:  {} ({})", record.display_name, record.profile_id);
                if let Some(ref username) = record.username {
                    println!("Account:  {}", username);
                }
                println!("Saved at: {}", service.store().path().display());
                Ok(())
            }
            Command::Help => unreachable!("help handled above"),
        }
    }

    fn login(
        &mut self,
        service: &mut AuthenticationService,
        force_login: bool,
        username: Option<String>,
    ) -> Result<()> {
        let username = username
            .or_else(|| std::env::var(USERNAME_ENV).ok())
            .or_else(|| self.config.last_username.clone());
        let env_password = std::env::var(PASSWORD_ENV).ok();

        let result = match service.authenticate(username.as_deref(), env_password.as_deref(), force_login) {
            Err(AuthError::NotAuthenticated) | Err(AuthError::ValidationFailure(_))
                if env_password.is_none() =>
            {
                eprintln!("\n=== Minecraft Login ===\n");
                let username = Self::prompt_username(username.as_deref())?;
                let password = rpassword::prompt_password("Password: ")?;
                eprintln!("\nAuthenticating...");
                service.login_with_credentials(&username, &password)
            }
            other => other,
        };

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => bail!(e.user_message()),
        };

        if let Some(session) = service.session() {
            if let Some(name) = session.username() {
                self.config.last_username = Some(name.to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
            }
        }

        Self::report_session(service);
        println!("{}", handle);
        info!("Login successful");
        Ok(())
    }

    fn prompt_username(last_username: Option<&str>) -> Result<String> {
        match last_username {
            Some(last) => eprint!("Username [{}]: ", last),
            None => eprint!("Username: "),
        }
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match (input.is_empty(), last_username) {
            (true, Some(last)) => last.to_string(),
            _ => input.to_string(),
        })
    }

    fn saved_login(service: &AuthenticationService) -> Result<craftauth_core::PersistedLogin> {
        match service.read_last_login() {
            Ok(record) => Ok(record),
            Err(PersistenceError::NotFound(path)) => {
                bail!("No saved login at {}", path.display())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn report_session(service: &AuthenticationService) {
        if let Some(session) = service.session() {
            let source = if session.is_restored() { "saved login" } else { "credentials" };
            eprintln!("Logged in as {} (from {}).", session.display_name(), source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli> {
        Cli::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_login_with_options() {
        let cli = parse(&[
            "--minecraft-dir",
            "/games/.minecraft",
            "--log-dir",
            "/var/log/craftauth",
            "login",
            "--force-login",
            "--username",
            "a@b.com",
        ])
        .unwrap();
        assert_eq!(cli.minecraft_dir, Some(PathBuf::from("/games/.minecraft")));
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/craftauth")));
        assert_eq!(
            cli.command,
            Command::Login {
                force_login: true,
                username: Some("a@b.com".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse(&["restore"]).unwrap().command, Command::Restore);
        assert_eq!(parse(&["logout"]).unwrap().command, Command::Logout);
        assert_eq!(parse(&["validate"]).unwrap().command, Command::Validate);
        assert_eq!(parse(&["status"]).unwrap().command, Command::Status);
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
        assert_eq!(parse(&["--help"]).unwrap().command, Command::Help);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["dance"]).is_err());
        assert!(parse(&["login", "logout"]).is_err());
        assert!(parse(&["login", "--bogus"]).is_err());
        assert!(parse(&["--minecraft-dir"]).is_err());
        assert!(parse(&["logout", "--force-login"]).is_err());
    }
}

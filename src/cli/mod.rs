//! `ecochain` command-line front end.
//!
//! Hand-parsed flags followed by one command. Every command runs after the
//! store has been restored and `bootstrap_on_start` has settled, and reads the
//! session only through the store.

pub mod outputformatter;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::config::{parse_host, ClientConfig};
use crate::error::{OpResult, ProviderError};
use crate::identity::{visible_routes, LoginOptions, LoginPrompt, Role};
use crate::session::PersistedSession;
use crate::SessionBootstrap;
use outputformatter::{print_json, print_records};

pub fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--state-dir <dir>] [--host <url>] [--canister <id>] <command> [args]\n\nCommands:\n  status                              show the current session\n  login                               sign in through the identity provider\n  logout                              sign out and clear local state\n  register <user|validator|admin>     choose a role for a new account\n  create-admin                        claim the first administrator account\n  submit <text>                       submit an environmental data entry\n  pending                             list entries awaiting validation\n  vote <id> <approve|reject>          vote on a pending entry\n  validated                           list validated entries\n  proposals                           list governance proposals\n  propose <title> <description>       create a governance proposal\n  promote <principal> <role>          assign a role to another user (admin)\n  profile                             show your profile\n  wallet                              show your wallet address\n  reward                              distribute contributor rewards (admin)\n  delete <id>                         delete a data entry (admin)\n  notifications                       list pending notifications\n  dismiss <id>                        dismiss a notification\n  routes                              list the pages visible to this session\n\nFlags:\n  --state-dir <dir>   overrides ECOCHAIN_STATE_DIR\n  --host <url>        overrides ECOCHAIN_HOST\n  --canister <id>     overrides ECOCHAIN_CANISTER_ID\n  -h, --help          show this help\n\nSet ECOCHAIN_OUTPUT=json for raw JSON listings and RUST_LOG to tune logging."
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Login,
    Logout,
    Register(Role),
    CreateAdmin,
    Submit(String),
    Pending,
    Vote { id: u64, approve: bool },
    Validated,
    Proposals,
    Propose { title: String, description: String },
    Promote { principal: String, role: Role },
    Profile,
    Wallet,
    Reward,
    Delete(u64),
    Notifications,
    Dismiss(Uuid),
    Routes,
}

impl Command {
    pub fn parse(words: &[String]) -> Result<Self> {
        let (head, rest) = words.split_first().ok_or_else(|| anyhow!("missing command"))?;
        let arg = |i: usize, what: &'static str| required(rest, i, head, what);
        let cmd = match head.to_ascii_lowercase().as_str() {
            "status" => Command::Status,
            "login" => Command::Login,
            "logout" => Command::Logout,
            "register" => Command::Register(parse_role(arg(0, "role")?)?),
            "create-admin" => Command::CreateAdmin,
            "submit" => {
                if rest.is_empty() { bail!("submit requires <text>"); }
                Command::Submit(rest.join(" "))
            }
            "pending" => Command::Pending,
            "vote" => {
                let id = parse_id(arg(0, "id")?)?;
                let approve = match arg(1, "approve|reject")?.to_ascii_lowercase().as_str() {
                    "approve" | "yes" | "y" => true,
                    "reject" | "no" | "n" => false,
                    other => bail!("vote must be approve or reject, got '{}'", other),
                };
                Command::Vote { id, approve }
            }
            "validated" => Command::Validated,
            "proposals" => Command::Proposals,
            "propose" => {
                let title = arg(0, "title")?.to_string();
                if rest.len() < 2 { bail!("propose requires <description>"); }
                Command::Propose { title, description: rest[1..].join(" ") }
            }
            "promote" => Command::Promote {
                principal: arg(0, "principal")?.to_string(),
                role: parse_role(arg(1, "role")?)?,
            },
            "profile" => Command::Profile,
            "wallet" => Command::Wallet,
            "reward" => Command::Reward,
            "delete" => Command::Delete(parse_id(arg(0, "id")?)?),
            "notifications" => Command::Notifications,
            "dismiss" => Command::Dismiss(
                Uuid::parse_str(arg(0, "id")?).context("notification id must be a UUID")?,
            ),
            "routes" => Command::Routes,
            other => bail!("unknown command '{}'", other),
        };
        Ok(cmd)
    }
}

fn required<'a>(rest: &'a [String], i: usize, cmd: &str, what: &str) -> Result<&'a str> {
    rest.get(i).map(String::as_str).ok_or_else(|| anyhow!("{} requires <{}>", cmd, what))
}

fn parse_role(s: &str) -> Result<Role> {
    s.parse::<Role>().map_err(|_| anyhow!("unknown role '{}' (expected user, validator or admin)", s))
}

fn parse_id(s: &str) -> Result<u64> {
    s.parse::<u64>().with_context(|| format!("invalid id '{}'", s))
}

/// Parsed command line: flag overrides plus the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub state_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub canister: Option<String>,
    pub command: Option<Command>,
}

impl Invocation {
    /// `Ok(None)` means help was requested.
    pub fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut inv = Invocation::default();
        let mut words: Vec<String> = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let a = args[i].as_str();
            match a {
                "-h" | "--help" => return Ok(None),
                "--state-dir" | "--host" | "--canister" => {
                    let v = args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} requires a value", a))?;
                    match a {
                        "--state-dir" => inv.state_dir = Some(PathBuf::from(v)),
                        "--host" => inv.host = Some(v),
                        _ => inv.canister = Some(v),
                    }
                    i += 2;
                    continue;
                }
                _ => words.push(args[i].clone()),
            }
            i += 1;
        }
        inv.command = if words.is_empty() { None } else { Some(Command::parse(&words)?) };
        Ok(Some(inv))
    }

    pub fn apply(&self, config: &mut ClientConfig) -> Result<()> {
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(h) = &self.host {
            config.host = parse_host(h).with_context(|| format!("invalid --host '{}'", h))?;
        }
        if let Some(c) = &self.canister {
            config.canister_id = Some(c.clone());
        }
        Ok(())
    }
}

/// Interactive login on a terminal: point the user at the identity provider
/// and wait for them to confirm.
pub struct StdinPrompt;

#[async_trait]
impl LoginPrompt for StdinPrompt {
    async fn confirm(&self, opts: &LoginOptions) -> Result<bool, ProviderError> {
        print!(
            "Sign in at {} (session valid for {}h), then confirm [y/N]: ",
            opts.identity_provider_url,
            opts.max_time_to_live.as_secs() / 3600
        );
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ProviderError::Failed(format!("reading confirmation: {}", e)))?;
        if n == 0 {
            return Err(ProviderError::Cancelled);
        }
        Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

fn report(op: OpResult) -> Result<()> {
    print_json(&op);
    if op.success { Ok(()) } else { Err(anyhow!(op.error.unwrap_or_else(|| "operation failed".into()))) }
}

fn print_status(boot: &SessionBootstrap) {
    let s = boot.store().snapshot();
    print_json(&json!({
        "principal": s.principal,
        "role": s.role,
        "is_authenticated": s.is_authenticated,
        "is_loading": s.is_loading,
        "needs_role_selection": s.needs_role_selection,
        "is_admin": s.is_admin(),
        "is_validator": s.is_validator(),
        "notifications": s.notifications.len(),
    }));
}

pub async fn run(command: Command, boot: &SessionBootstrap) -> Result<()> {
    let services = boot.services();
    match command {
        Command::Status => print_status(boot),
        Command::Login => {
            let resolution = boot.login().await.context("login failed")?;
            print_json(&resolution);
        }
        Command::Logout => {
            boot.logout().await;
            print_json(&PersistedSession::from_session(&boot.store().snapshot()));
        }
        Command::Register(role) => report(boot.register_user_with_role(role).await)?,
        Command::CreateAdmin => report(boot.create_admin_user().await)?,
        Command::Submit(text) => print_json(&services.submit_data(&text).await?),
        Command::Pending => print_records("pending", &services.get_pending_data().await?),
        Command::Vote { id, approve } => print_json(&services.vote_on_data(id, approve).await?),
        Command::Validated => print_records("validated", &services.get_validated_data().await?),
        Command::Proposals => print_records("proposals", &services.get_proposals().await?),
        Command::Propose { title, description } => {
            print_json(&services.create_proposal(&title, &description).await?)
        }
        Command::Promote { principal, role } => report(services.promote_user_role(&principal, role).await)?,
        Command::Profile => print_json(&services.get_user_profile().await?),
        Command::Wallet => println!("{}", services.get_wallet_address().await?),
        Command::Reward => print_json(&services.reward_contributors().await?),
        Command::Delete(id) => print_json(&services.delete_data(id).await?),
        Command::Notifications => print_records("notifications", &boot.store().snapshot().notifications),
        Command::Dismiss(id) => {
            if !boot.dismiss_notification(id) {
                bail!("no notification with id {}", id);
            }
        }
        Command::Routes => {
            for r in visible_routes(&boot.store().snapshot()) {
                println!("{}", r.path());
            }
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use route_rbac::{
    Rbac, RbacOptions, app::DEMO_ROLES, config::Config, rbac::DEFAULT_TOKEN_HEADER,
    services::codec::JwtCodec,
};
use serde_json::{Map, Value};

/// Issue a session token signed with the server's SESSION_SECRET.
///
/// Reads the same environment (and `.env`) as the server:
/// - SESSION_SECRET is required
/// - SESSION_TTL_SECONDS adds an `exp` claim
/// - RBAC_ROLES (default: admin,user) must contain `--role`
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Args {
    /// Role to carry in the token (e.g. admin, user)
    #[arg(long)]
    role: String,

    /// Extra session data as a JSON object, e.g. '{"username":"alice"}'
    #[arg(long, default_value = "{}")]
    payload: String,

    /// Print only the token (no extra lines)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    let payload: Map<String, Value> =
        serde_json::from_str(&args.payload).context("--payload must be a JSON object")?;

    let token = issue(&config, &args.role, &payload)?;

    if args.quiet {
        println!("{token}");
        return Ok(());
    }

    let header = config.token_header_name.as_deref().unwrap_or(DEFAULT_TOKEN_HEADER);
    println!("{}: {}", header, token);
    println!();
    println!("role: {}", args.role);
    if let Some(ttl) = config.session_ttl_seconds {
        println!("expires in: {ttl}s");
    }

    Ok(())
}

/// Signs `payload` for `role` with the server's secret and role registry.
/// An unregistered role fails through the rbac role-unregistered hook.
fn issue(config: &Config, role: &str, payload: &Map<String, Value>) -> Result<String> {
    let codec = JwtCodec::from_secret(config.session_secret.as_bytes(), config.session_ttl_seconds)?;
    let rbac = Rbac::with_options(
        codec,
        RbacOptions {
            token_header_name: config.token_header_name.clone(),
            roles: Some(if config.roles.is_empty() {
                DEMO_ROLES.iter().map(|r| r.to_string()).collect()
            } else {
                config.roles.clone()
            }),
            ..Default::default()
        },
    )?;

    Ok(rbac.issue_token(role, payload)?)
}

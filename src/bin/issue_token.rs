//! Prints a 24 hour bearer token: `issue-token <subject> [staff|admin]`.

use dadpars::auth::{create_jwt, Role};
use dadpars::config::Config;

fn main() -> anyhow::Result<()> {
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }
    let mut args = std::env::args().skip(1);
    let subject = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: issue-token <subject> [staff|admin]"))?;
    let roles = match args.next().as_deref() {
        None | Some("staff") => vec![Role::Staff],
        Some("admin") => vec![Role::Staff, Role::Admin],
        Some(other) => anyhow::bail!("unknown role: {other}"),
    };
    let cfg = Config::from_env()?;
    let token = create_jwt(&cfg.jwt_secret, &subject, roles)?;
    println!("{token}");
    Ok(())
}

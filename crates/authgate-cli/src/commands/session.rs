use std::io::BufRead;

use anyhow::Context;
use authgate_api::{Credentials, GuardError, User};
use authgate_runtime::GuardContext;

use crate::{SignIn, pout};

/// Log in first when `--email` was given; otherwise a no-op.
pub async fn sign_in(ctx: &GuardContext, sign_in: &SignIn) -> anyhow::Result<()> {
    let Some(email) = sign_in.email.as_deref() else {
        return Ok(());
    };
    let password = read_password(email, sign_in.password_stdin)?;
    ctx.login(&credentials(email, password, sign_in.remember))
        .await
        .with_context(|| format!("login as {email} failed"))?;
    Ok(())
}

pub async fn cmd_login(ctx: &GuardContext, sign_in: &SignIn, json: bool) -> anyhow::Result<()> {
    self::sign_in(ctx, sign_in).await?;

    match ctx.user() {
        Some(user) => pout(
            json,
            serde_json::json!({"ok": true, "user": user}),
            &format!("Logged in as {}", describe(&user)),
        ),
        // The follow-up user fetch failed; the login itself went through.
        None => pout(
            json,
            serde_json::json!({"ok": true, "user": null}),
            "Logged in (user could not be loaded)",
        ),
    }
}

pub async fn cmd_whoami(ctx: &GuardContext, json: bool) -> anyhow::Result<()> {
    let user = ctx.try_fetch_user().await.map_err(|e| match e {
        GuardError::Status {
            status: 401 | 419, ..
        } => anyhow::anyhow!("not authenticated"),
        other => anyhow::Error::new(other).context("failed to load user"),
    })?;

    pout(
        json,
        serde_json::to_value(&user)?,
        &format!("Signed in as {}", describe(&user)),
    )
}

pub async fn cmd_logout(ctx: &GuardContext, json: bool) -> anyhow::Result<()> {
    ctx.logout().await.context("logout failed")?;
    pout(json, serde_json::json!({"ok": true}), "Logged out")
}

/// One-line summary: best display name, id and roles.
pub fn describe(user: &User) -> String {
    let who = user
        .name()
        .or(user.email())
        .map(str::to_string)
        .or_else(|| user.id())
        .unwrap_or_else(|| "?".to_string());
    let mut line = who;
    if let Some(id) = user.id() {
        line.push_str(&format!(" (id {id})"));
    }
    match user.roles() {
        Some(roles) if !roles.is_empty() => line.push_str(&format!(" roles: {}", roles.join(", "))),
        Some(_) => line.push_str(" roles: none"),
        None => {}
    }
    line
}

fn credentials(email: &str, password: String, remember: bool) -> Credentials {
    let credentials = Credentials::new(email, password);
    if remember {
        credentials.remember(true)
    } else {
        credentials
    }
}

fn read_password(email: &str, from_stdin: bool) -> anyhow::Result<String> {
    let password = if from_stdin {
        first_line(std::io::stdin().lock())?
    } else {
        rpassword::prompt_password(format!("Password for {email}: "))?
    };
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}

fn first_line(mut reader: impl BufRead) -> std::io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_strips_line_ending_only() {
        let input = b" s3cret \r\nnext\n";
        assert_eq!(first_line(&input[..]).unwrap(), " s3cret ");
        assert_eq!(first_line(&b""[..]).unwrap(), "");
    }

    #[test]
    fn remember_is_sent_only_when_asked() {
        let body = serde_json::to_value(credentials("a@b.c", "pw".to_string(), true)).unwrap();
        assert_eq!(body["remember"], serde_json::json!(true));

        let body = serde_json::to_value(credentials("a@b.c", "pw".to_string(), false)).unwrap();
        assert!(body.get("remember").is_none());
    }

    #[test]
    fn describe_prefers_name_and_lists_roles() {
        let user = User::from_value(serde_json::json!({
            "id": 7,
            "name": "Ada",
            "email": "ada@example.com",
            "roles": ["admin", "editor"],
        }))
        .unwrap();
        assert_eq!(describe(&user), "Ada (id 7) roles: admin, editor");

        let bare = User::from_value(serde_json::json!({"email": "x@y.z"})).unwrap();
        assert_eq!(describe(&bare), "x@y.z");
    }
}

use anyhow::{bail, Result};

use researchhub_core::auth::{RegistrationForm, LOGIN_FAILED_MESSAGE, REGISTRATION_FAILED_MESSAGE};
use researchhub_core::utils::format_date;

use super::{prompt, App};

/// Non-interactive password source for scripts.
const PASSWORD_ENV: &str = "RESEARCHHUB_PASSWORD";

fn env_password() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}

fn read_password(label: &str) -> Result<String> {
    match env_password() {
        Some(password) => Ok(password),
        None => Ok(rpassword::prompt_password(label)?),
    }
}

pub async fn register(
    app: &mut App,
    email: Option<String>,
    username: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = read_password("Password: ")?;
    let confirm_password = match env_password() {
        Some(password) => password,
        None => rpassword::prompt_password("Confirm password: ")?,
    };

    let form = RegistrationForm {
        email,
        username,
        password,
        confirm_password,
    };
    form.validate()?;

    match app
        .session
        .register(&form.email, &form.username, &form.password)
        .await
    {
        Ok(user) => {
            app.remember_email(&user.email);
            println!("Welcome, {}! You are signed in.", user.username);
            Ok(())
        }
        Err(e) => bail!(e.user_message(REGISTRATION_FAILED_MESSAGE)),
    }
}

pub async fn login(app: &mut App, email: Option<String>) -> Result<()> {
    let email = match (email, app.config.last_email.clone()) {
        (Some(email), _) => email,
        (None, Some(last)) => {
            let entered = prompt(&format!("Email [{}]: ", last))?;
            if entered.is_empty() {
                last
            } else {
                entered
            }
        }
        (None, None) => prompt("Email: ")?,
    };
    let password = read_password("Password: ")?;

    match app.session.login(&email, &password).await {
        Ok(user) => {
            app.remember_email(&user.email);
            println!("Signed in as {} ({}).", user.username, user.email);
            Ok(())
        }
        Err(e) => bail!(e.user_message(LOGIN_FAILED_MESSAGE)),
    }
}

pub fn logout(app: &mut App) -> Result<()> {
    app.session.logout();
    println!("Signed out.");
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    let user = app.require_user()?;
    println!("{} <{}>", user.username, user.email);
    println!("Member since {}", format_date(&user.created_at));
    Ok(())
}

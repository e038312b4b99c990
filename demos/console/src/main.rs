use std::env;

use postzen::prelude::*;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

struct Settings {
    base_url: String,
    session_file: String,
    email: Option<String>,
    password: Option<String>,
    verbose: bool,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            base_url: env::var("POSTZEN_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".into()),
            session_file: env::var("POSTZEN_SESSION_FILE")
                .unwrap_or_else(|_| ".postzen-session.json".into()),
            email: env::var("POSTZEN_EMAIL").ok(),
            password: env::var("POSTZEN_PASSWORD").ok(),
            verbose: env::var("POSTZEN_VERBOSE").is_ok_and(|v| v == "1"),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

/// Opens the profile page the way the web app would: restore the saved
/// session, sign in if the gate sends us to login, then list our posts.
#[tokio::main]
async fn main() -> Result<(), PostzenError> {
    let settings = Settings::from_env();
    postzen::logging::init(settings.verbose);

    let client = Client::builder()
        .base_url(&settings.base_url)
        .storage(JsonFileStorage::new(&settings.session_file))
        .build()?;

    let mut outcome = client.router().navigate("/profile").await?;

    if outcome.location().is_some_and(|at| at.name == "login") {
        let (Some(email), Some(password)) = (&settings.email, &settings.password) else {
            println!("not signed in; set POSTZEN_EMAIL and POSTZEN_PASSWORD");
            return Ok(());
        };
        let user = client.auth().login(email, password).await?;
        println!("signed in as {} ({})", user.username, user.role);
        outcome = client.router().continue_after_login().await?;
    }

    if let Some(at) = outcome.location() {
        println!("at {} ({})", at.full_path, at.name);
    }

    let Some(user) = client.auth().user() else {
        println!("not signed in");
        return Ok(());
    };
    let posts: serde_json::Value = client.get_json(&author_posts_path(&user)).await?;
    println!("{}", serde_json::to_string_pretty(&posts).unwrap_or_default());

    Ok(())
}

/// Listing of everything `user` has written.
fn author_posts_path(user: &User) -> String {
    format!("/posts/author/{}", user.id)
}

//! Headless session demo.
//!
//! Shows the full session lifecycle without a browser or a real auth
//! service: heartbeat pings stand in for user input (the activity
//! source works the same either way), and a scripted auth stub stands
//! in for the identity provider.
//!
//! Timeline (about 17 seconds):
//!   t≈0   login, session established (12s token, 3s warning lead)
//!   t≈2-6 heartbeats keep the session active
//!   t≈9   expiry warning → prompt → we confirm → session extended
//!   t≈14  no heartbeats since t≈6 → inactivity prompt → we let it lapse
//!   t≈17  grace period ends → forced logout → exit

use std::time::{Duration, SystemTime};

use vigil::prelude::*;
use vigil_activity::channel;

// ---------------------------------------------------------------------------
// Scripted auth service
// ---------------------------------------------------------------------------

const TOKEN_LIFETIME: Duration = Duration::from_secs(12);

fn grant(tag: &str) -> Session {
    let now_ms = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_millis() as u64;
    Session {
        access_token: format!("demo-access-{tag}"),
        refresh_token: format!("demo-refresh-{tag}"),
        expires_at_ms: now_ms + TOKEN_LIFETIME.as_millis() as u64,
    }
}

/// Accepts anyone and always grants short-lived tokens. Only for the
/// demo — a real deployment points [`HttpAuthApi`] at its auth service.
#[derive(Clone)]
struct DemoAuth;

impl AuthApi for DemoAuth {
    async fn login(&self, email: &str, _password: &str) -> Result<LoginOutcome, AuthError> {
        Ok(LoginOutcome {
            session: grant("login"),
            user: UserIdentity {
                id: "demo-user".into(),
                email: email.into(),
                name: "Demo User".into(),
                role: vigil_protocol::Role::User,
            },
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        Ok(grant("refreshed"))
    }
}

// ---------------------------------------------------------------------------
// Demo driver
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), VigilError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = SessionConfig {
        warning_lead: Duration::from_secs(3),
        inactivity_timeout: Duration::from_secs(5),
        grace_period: Duration::from_secs(3),
        activity_debounce: Duration::from_millis(100),
    };

    let (probe, source) = channel();
    let auth = DemoAuth;
    let (handle, mut events) = spawn_session(config, auth.clone(), MemoryStore::new(), source);

    let outcome = auth.login("demo@example.com", "demo").await?;
    println!("signed in as {}", outcome.user.name);
    handle.establish(outcome.session, outcome.user).await?;

    // Heartbeats for the first six seconds, then the "user" walks away.
    tokio::spawn(async move {
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(2)).await;
            probe.report(ActivityKind::KeyPress);
        }
    });

    let mut view = handle.subscribe();
    let mut extended_once = false;

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow().clone();
                println!(
                    "state: {:<15} prompt visible: {}",
                    snapshot.state.to_string(),
                    snapshot.dialog_visible
                );

                if snapshot.dialog_visible {
                    if extended_once {
                        println!("prompt is up again — letting it lapse this time");
                    } else {
                        extended_once = true;
                        println!("prompt is up — confirming the extension");
                        handle.confirm().await?;
                    }
                }
            }
            Some(event) = events.recv() => match event {
                SessionEvent::Extended => println!("session extended"),
                SessionEvent::Ended => {
                    println!("session ended — back to the login screen");
                    break;
                }
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Invite Service Main Entry Point
///
/// Starts the HTTP server with:
/// - SuperTokens core client (identity provider + session verification)
/// - Hasura GraphQL client (data backend)
/// - Email service (SMTP or no-op)
/// - Invitation workflow
/// - Placeholder-password guard for the credential routes
use anyhow::{Context, Result};
use invite_service::{
    clients::{HasuraClient, SuperTokensClient},
    config::Settings,
    http::{build_router, cors_layer, start_http_server, HttpServerState},
    services::{CredentialGuard, EmailService, InvitationWorkflow},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "invite_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Invite Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let email_service = EmailService::new(&settings.email, &settings.app.name)
        .context("Failed to initialize email service")?;

    if email_service.is_enabled() {
        info!("Email service initialized with SMTP");
    } else {
        info!("Email service running in no-op mode (SMTP not configured)");
    }

    let supertokens = Arc::new(
        SuperTokensClient::new(&settings.supertokens, email_service)
            .context("Failed to initialize SuperTokens client")?,
    );
    let hasura =
        Arc::new(HasuraClient::new(&settings.hasura).context("Failed to initialize Hasura client")?);

    let workflow = InvitationWorkflow::new(
        supertokens.clone(),
        hasura.clone(),
        settings.invite.placeholder_password.clone(),
        settings.app.reset_password_url(),
    );

    let credentials = CredentialGuard::new(
        supertokens.clone(),
        settings.invite.placeholder_password.clone(),
    );

    let state = HttpServerState {
        workflow: Arc::new(workflow),
        backend: hasura,
        credentials: Arc::new(credentials),
        sessions: supertokens,
        cookie_domain: settings.app.cookie_domain.clone(),
        invite_deadline: settings.invite.deadline,
    };

    let app = build_router(state)
        .layer(cors_layer(&settings.allowed_origins())?)
        .layer(TraceLayer::new_for_http());

    start_http_server(app, &settings.server.host, settings.server.port).await?;

    info!("Invite service shutdown complete");

    Ok(())
}

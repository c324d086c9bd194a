//! Invite mailing
//!
//! Invite creation persists first, then mails. Mail delivery is best
//! effort: a failed send is logged as a warning and the invite stays,
//! since the token can be re-sent out of band.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::entities::{CreateInvite, Invite};
use crate::error::Result;
use crate::repositories::InviteRepository;

/// Sends the acceptance link for a freshly created invite. The production
/// provider lives outside this crate.
#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn send(&self, invite: &Invite, accept_url: &str) -> Result<()>;
}

/// Non-production mailer that logs the would-be send
pub struct LogMailer;

#[async_trait]
impl InviteMailer for LogMailer {
    async fn send(&self, invite: &Invite, accept_url: &str) -> Result<()> {
        info!(
            invite_id = %invite.id,
            email = %invite.email,
            %accept_url,
            "dry-run invite mail"
        );
        Ok(())
    }
}

/// Creates invites and mails their acceptance links
pub struct InviteService {
    repo: InviteRepository,
    mailer: Arc<dyn InviteMailer>,
    base_url: String,
}

impl InviteService {
    pub fn new(repo: InviteRepository, mailer: Arc<dyn InviteMailer>, base_url: String) -> Self {
        Self {
            repo,
            mailer,
            base_url,
        }
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn create_and_send(&self, data: &CreateInvite) -> Result<Invite> {
        let invite = self.repo.create(data).await?;

        let accept_url = format!(
            "{}/invites/accept?token={}",
            self.base_url.trim_end_matches('/'),
            invite.token
        );
        if let Err(err) = self.mailer.send(&invite, &accept_url).await {
            warn!(invite_id = %invite.id, %err, "invite mail failed; invite kept");
        }

        Ok(invite)
    }
}

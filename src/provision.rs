//! Card Provisioning
//!
//! The operations a caller asks for: put a fresh key on a new card, or
//! change one of its PINs. Each operation runs one or more workflows, each
//! in its own peer session, strictly one after another.

use crate::config::Config;
use crate::credentials::{validate_pin, Identity, PinRole, PinSource};
use crate::error::{Error, ErrorKind, Result};
use crate::models::{KeyId, Secret};
use crate::pty::{GpgLauncher, PeerInvocation, PeerLauncher};
use crate::security_audit::{self, SecurityEvent};
use crate::session::{Session, SessionOptions};
use crate::workflow::{self, Workflow, WorkflowOutcome};

/// Runs provisioning workflows against peers started by `L`
pub struct Provisioner<L: PeerLauncher> {
    launcher: L,
    config: Config,
}

impl Provisioner<GpgLauncher> {
    /// Provisioner driving the real peer
    pub fn with_gpg(config: Config) -> Self {
        let launcher = GpgLauncher::new(config.session.exit_report_interval());
        Self::new(launcher, config)
    }
}

impl<L: PeerLauncher> Provisioner<L> {
    pub fn new(launcher: L, config: Config) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Generate a key, add an authentication subkey and move all three keys
    /// to the card, using the configured admin PIN
    pub async fn provision_new_card(&self, identity: &Identity) -> Result<KeyId> {
        let admin_pin = self.config.card.admin_pin();
        validate_pin(&admin_pin, PinRole::Admin)?;

        let key_id = self.generate_key(identity).await?;
        self.add_auth_subkey(&key_id).await?;
        self.transfer_to_card(&key_id, &admin_pin).await?;

        Ok(key_id)
    }

    /// Generate a new primary key with an encryption subkey
    pub async fn generate_key(&self, identity: &Identity) -> Result<KeyId> {
        let identity = if identity.comment.is_empty() && !self.config.keygen.comment.is_empty() {
            identity.clone().with_comment(self.config.keygen.comment.clone())?
        } else {
            identity.clone()
        };

        let workflow = workflow::key_generation(&identity, self.config.keygen.key_size);
        let outcome = self.execute(&workflow).await?;
        let key_id = outcome.key_id.ok_or_else(|| {
            Error::Other(format!("{} finished without a key id", workflow.name()))
        })?;

        security_audit::log_key_event(SecurityEvent::KeyGenerated, &key_id);
        Ok(key_id)
    }

    /// Add an authentication subkey to `key_id`
    pub async fn add_auth_subkey(&self, key_id: &KeyId) -> Result<()> {
        let workflow = workflow::add_auth_subkey(key_id, self.config.keygen.auth_key_size)?;
        self.execute(&workflow).await?;
        security_audit::log_key_event(SecurityEvent::SubkeyAdded, key_id);
        Ok(())
    }

    /// Move the keys of `key_id` onto the card
    pub async fn transfer_to_card(&self, key_id: &KeyId, admin_pin: &Secret) -> Result<()> {
        validate_pin(admin_pin, PinRole::Admin)?;
        let workflow = workflow::transfer_to_card(key_id, admin_pin)?;
        self.execute(&workflow).await?;
        security_audit::log_key_event(SecurityEvent::KeysMovedToCard, key_id);
        Ok(())
    }

    /// Change the user PIN
    pub async fn rotate_user_pin(&self, old_pin: &Secret, new_pin: &Secret) -> Result<()> {
        validate_pin(old_pin, PinRole::User)?;
        validate_pin(new_pin, PinRole::User)?;
        let workflow = workflow::change_user_pin(old_pin, new_pin);
        self.execute(&workflow).await?;
        security_audit::log_pin_changed(false);
        Ok(())
    }

    /// Change the admin PIN
    pub async fn rotate_admin_pin(&self, old_pin: &Secret, new_pin: &Secret) -> Result<()> {
        validate_pin(old_pin, PinRole::Admin)?;
        validate_pin(new_pin, PinRole::Admin)?;
        let workflow = workflow::change_admin_pin(old_pin, new_pin);
        self.execute(&workflow).await?;
        security_audit::log_pin_changed(true);
        Ok(())
    }

    /// Replace the configured user PIN with a random one and return it
    pub async fn rotate_user_pin_randomly(&self, source: &mut dyn PinSource) -> Result<Secret> {
        let new_pin = source.random_digits(self.config.card.user_pin_length)?;
        self.rotate_user_pin(&self.config.card.user_pin(), &new_pin)
            .await?;
        Ok(new_pin)
    }

    /// Replace the configured admin PIN with a random one and return it
    pub async fn rotate_admin_pin_randomly(&self, source: &mut dyn PinSource) -> Result<Secret> {
        let new_pin = source.random_digits(self.config.card.admin_pin_length)?;
        self.rotate_admin_pin(&self.config.card.admin_pin(), &new_pin)
            .await?;
        Ok(new_pin)
    }

    /// Run `workflow` in a fresh peer session
    async fn execute(&self, workflow: &Workflow) -> Result<WorkflowOutcome> {
        let invocation = PeerInvocation::new(&self.config.peer, workflow.args());
        security_audit::log_session_start(workflow.name(), invocation.operation_args());

        let channel = self.launcher.launch(&invocation)?;
        let options = SessionOptions {
            label: workflow.name().to_string(),
            timeout: self.config.session.timeout(),
            status_prefix: self.config.peer.status_prefix.clone(),
            mirror: self.config.transcript.mirror,
        };
        let mut session = Session::new(channel, options);

        match workflow
            .run(&mut session, self.config.session.keygen_timeout())
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                session.drain_after_abort().await;
                self.report_failure(workflow, &session, &e);
                Err(e)
            }
        }
    }

    fn report_failure(&self, workflow: &Workflow, session: &Session, error: &Error) {
        let position = match error {
            Error::Step {
                index, position, ..
            } => format!("{} ({})", index, position),
            _ => "-".to_string(),
        };
        security_audit::log_workflow_failure(
            error.kind() == ErrorKind::AssumptionGuard,
            workflow.name(),
            &position,
        );

        if let Some(directory) = &self.config.transcript.directory {
            match session.save_transcript(directory) {
                Ok(path) => warn!("Transcript of failed session saved to {}", path.display()),
                Err(e) => warn!("Failed to save transcript: {}", e),
            }
        }
    }
}

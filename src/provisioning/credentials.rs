//! Credential Reconciliation
//!
//! Keeps the SVM administrative account on the storage controller and its
//! mirror secret in the control plane in agreement.
//!
//! | Account | Secret                 | Action                                   |
//! |---------|------------------------|------------------------------------------|
//! | any     | present, password set  | return stored password, no controller IO |
//! | absent  | absent or empty        | create account, then create secret       |
//! | exists  | absent or empty        | rotate password, then create secret      |
//!
//! A secret that exists with an empty password is not authoritative and is
//! filled in place; a secret with a password is never rewritten.
//!
//! The controller never reveals an account's password, so an account whose
//! secret was lost can only be recovered by setting a new password. That
//! invalidates whatever credential current consumers still hold.

use crate::config::EngineConfig;
use crate::domain::ports::{
    AccountSpec, Credentials, SecretRecord, SecretStoreRef, StorageControllerRef, Svm,
};
use crate::error::{Error, Result};
use crate::metrics::EngineMetrics;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Password Generation
// =============================================================================

pub const PASSWORD_LENGTH: usize = 8;
pub const PASSWORD_MIN_DIGITS: usize = 2;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Random password: `PASSWORD_MIN_DIGITS` digits, letters elsewhere, shuffled
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut chars: Vec<u8> = Vec::with_capacity(PASSWORD_LENGTH);
    for _ in 0..PASSWORD_MIN_DIGITS {
        chars.push(DIGITS[rng.gen_range(0..DIGITS.len())]);
    }
    for _ in PASSWORD_MIN_DIGITS..PASSWORD_LENGTH {
        chars.push(LETTERS[rng.gen_range(0..LETTERS.len())]);
    }
    chars.shuffle(rng);
    chars.into_iter().map(char::from).collect()
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    /// The stored secret already held a password; nothing was changed
    Reconciled { credentials: Credentials },
    /// A secret was written in this pass. `rotated` is set when an existing
    /// account had its password replaced to recover a lost secret.
    SecretCreated {
        credentials: Credentials,
        rotated: bool,
    },
}

impl CredentialOutcome {
    pub fn credentials(&self) -> &Credentials {
        match self {
            CredentialOutcome::Reconciled { credentials }
            | CredentialOutcome::SecretCreated { credentials, .. } => credentials,
        }
    }
}

/// What account creation found on the controller
#[derive(Debug)]
enum AccountOutcome {
    Created { password: String },
    AlreadyExists,
}

// =============================================================================
// Credential Reconciler
// =============================================================================

/// Reconciles the SVM admin account with its control-plane secret
pub struct CredentialReconciler {
    controller: StorageControllerRef,
    secrets: SecretStoreRef,
    config: Arc<EngineConfig>,
    metrics: Arc<EngineMetrics>,
}

impl CredentialReconciler {
    pub fn new(
        controller: StorageControllerRef,
        secrets: SecretStoreRef,
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            controller,
            secrets,
            config,
            metrics,
        }
    }

    pub fn secret_name(&self, project: &str) -> String {
        self.config.secret_name(project)
    }

    /// Ensure `svm` has an admin account whose password is mirrored in the
    /// project's secret.
    pub async fn reconcile(&self, project: &str, svm: &Svm) -> Result<CredentialOutcome> {
        let namespace = &self.config.secret_namespace;
        let name = self.secret_name(project);

        let existing = self.secrets.get(namespace, &name).await?;
        if let Some(secret) = &existing {
            if secret.credentials.has_password() {
                debug!(project, secret = %name, "Credential secret present, skipping account setup");
                return Ok(CredentialOutcome::Reconciled {
                    credentials: secret.credentials.clone(),
                });
            }
            warn!(project, secret = %name, "Credential secret has no password");
        }
        let stale_secret = existing.is_some();

        let owner_uuid = svm_uuid(svm)?;
        let (password, rotated) = match self.ensure_account(owner_uuid).await? {
            AccountOutcome::Created { password } => (password, false),
            AccountOutcome::AlreadyExists => {
                let password = self.recover_account(&svm.name, owner_uuid).await?;
                (password, true)
            }
        };

        let credentials = Credentials::new(self.config.admin_username.clone(), password);
        self.write_secret(project, &name, &credentials, stale_secret)
            .await?;

        Ok(CredentialOutcome::SecretCreated {
            credentials,
            rotated,
        })
    }

    /// Create the admin account with a fresh password
    async fn ensure_account(&self, owner_uuid: &str) -> Result<AccountOutcome> {
        let password = generate_password(&mut rand::thread_rng());
        let spec = AccountSpec {
            owner_uuid: owner_uuid.to_string(),
            role: self.config.admin_role.clone(),
            credentials: Credentials::new(self.config.admin_username.clone(), password.clone()),
        };

        match self.controller.create_account(&spec).await {
            Ok(()) => {
                info!(
                    svm = owner_uuid,
                    username = %self.config.admin_username,
                    role = %self.config.admin_role,
                    "Created SVM admin account"
                );
                Ok(AccountOutcome::Created { password })
            }
            Err(e) if e.is_already_exists() => Ok(AccountOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    /// The account exists but its secret is gone: set a new password
    async fn recover_account(&self, svm_name: &str, owner_uuid: &str) -> Result<String> {
        let username = &self.config.admin_username;

        if self
            .controller
            .get_account(owner_uuid, username)
            .await?
            .is_none()
        {
            return Err(Error::Internal(format!(
                "account {} on SVM {} reported as existing but cannot be read",
                username, svm_name
            )));
        }

        if !self.config.rotate_on_missing_secret {
            return Err(Error::SeedSecretMissing {
                svm: svm_name.to_string(),
                username: username.clone(),
            });
        }

        warn!(
            svm = svm_name,
            username = %username,
            "Admin account exists without a credential secret, rotating password; \
             existing sessions using the old password will fail"
        );

        let password = generate_password(&mut rand::thread_rng());
        self.controller
            .set_account_password(owner_uuid, username, &password)
            .await?;
        self.metrics.record_credential_rotation();

        Ok(password)
    }

    /// Create the secret, or fill in a secret that exists without a password
    async fn write_secret(
        &self,
        project: &str,
        name: &str,
        credentials: &Credentials,
        stale: bool,
    ) -> Result<()> {
        let secret = SecretRecord {
            namespace: self.config.secret_namespace.clone(),
            name: name.to_string(),
            labels: self.config.labels.labels_for(project),
            credentials: credentials.clone(),
        };

        if stale {
            self.secrets.replace(&secret).await?;
        } else {
            self.secrets.create(&secret).await?;
        }
        info!(
            project,
            namespace = %secret.namespace,
            secret = %secret.name,
            replaced = stale,
            "Wrote credential secret"
        );
        Ok(())
    }
}

fn svm_uuid(svm: &Svm) -> Result<&str> {
    svm.uuid.as_deref().ok_or_else(|| Error::NotFound {
        kind: "SvmUuid".into(),
        name: svm.name.clone(),
    })
}

//! Outbound mail seam.
//!
//! Verification and password-reset delivery is operated outside this
//! server. The trait is the boundary; the default implementation records
//! the handoff so operators can wire a real relay without touching the
//! auth flow.

use async_trait::async_trait;
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::AppError;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

pub struct LogMailer {
    smtp: SmtpConfig,
}

impl LogMailer {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        info!(
            relay = %format!("{}:{}", self.smtp.host, self.smtp.port),
            from = %self.smtp.from_address,
            to,
            subject,
            body_len = body.len(),
            "mail handed off"
        );
        Ok(())
    }
}

//! One-time interactive login.
//!
//! The flow is strictly sequential and has no per-step retries: a missing
//! element usually means a human has to deal with the verification challenge,
//! so the first failure aborts with `AuthenticationFailed`.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, ScrapeError};
use crate::query::{shapes, QueryShape};
use crate::security::Credentials;
use crate::session::SessionStore;
use crate::traits::driver::{Element, ElementSet, Page};
use crate::types::Session;

/// Pause after an input so client-side validation settles before the next query.
///
/// Clamped to [`SettleDelay::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelay(Duration);

impl SettleDelay {
    pub const MAX: Duration = Duration::from_secs(1);

    pub fn new(delay: Duration) -> Self {
        Self(delay.min(Self::MAX))
    }

    /// No pause at all. Intended for tests against scripted drivers.
    pub fn none() -> Self {
        Self(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

impl Default for SettleDelay {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Steps of the login flow, named in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    EnterEmail,
    VerifyHuman,
    SubmitEmail,
    EnterPassword,
    SubmitPassword,
    AwaitDestination,
    CaptureSession,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnterEmail => "enter email",
            Self::VerifyHuman => "verify human",
            Self::SubmitEmail => "submit email",
            Self::EnterPassword => "enter password",
            Self::SubmitPassword => "submit password",
            Self::AwaitDestination => "await destination",
            Self::CaptureSession => "capture session",
        }
    }

    fn failed(self, reason: impl ToString) -> ScrapeError {
        ScrapeError::AuthenticationFailed {
            step: self,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives the login form and persists the resulting session.
pub struct Authenticator {
    credentials: Credentials,
    settle: SettleDelay,
}

impl Authenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            settle: SettleDelay::default(),
        }
    }

    pub fn with_settle_delay(mut self, settle: SettleDelay) -> Self {
        self.settle = settle;
        self
    }

    /// Log in on `page`, which must already show the login entry point, and
    /// save the resulting session to `store`.
    pub async fn login(&self, page: &dyn Page, store: &SessionStore) -> Result<Session> {
        tracing::info!("Starting interactive login");

        let email_form = locate(page, &shapes::email_form(), LoginStep::EnterEmail).await?;
        let email_input = require(&email_form, shapes::EMAIL_INPUT, LoginStep::EnterEmail)?;
        email_input
            .fill(self.credentials.email().expose())
            .await
            .map_err(|e| LoginStep::EnterEmail.failed(e))?;
        self.settle.pause().await;

        let verify = locate(page, &shapes::verify_human(), LoginStep::VerifyHuman).await?;
        require(&verify, shapes::VERIFY_CHECKBOX, LoginStep::VerifyHuman)?
            .click()
            .await
            .map_err(|e| LoginStep::VerifyHuman.failed(e))?;
        self.settle.pause().await;

        require(&email_form, shapes::CONTINUE_BUTTON, LoginStep::SubmitEmail)?
            .click()
            .await
            .map_err(|e| LoginStep::SubmitEmail.failed(e))?;
        tracing::debug!("Email step submitted");

        let password_form =
            locate(page, &shapes::password_form(), LoginStep::EnterPassword).await?;
        require(&password_form, shapes::PASSWORD_INPUT, LoginStep::EnterPassword)?
            .fill(self.credentials.password().expose())
            .await
            .map_err(|e| LoginStep::EnterPassword.failed(e))?;
        self.settle.pause().await;

        require(&password_form, shapes::CONTINUE_BUTTON, LoginStep::SubmitPassword)?
            .click()
            .await
            .map_err(|e| LoginStep::SubmitPassword.failed(e))?;

        page.wait_for_ready()
            .await
            .map_err(|e| LoginStep::AwaitDestination.failed(e))?;

        let session = page
            .storage_state()
            .await
            .map_err(|e| LoginStep::CaptureSession.failed(e))?;
        store.save(&session)?;

        tracing::info!("Login complete");
        Ok(session)
    }
}

async fn locate(page: &dyn Page, shape: &QueryShape, step: LoginStep) -> Result<ElementSet> {
    page.query_elements(shape).await.map_err(|e| step.failed(e))
}

fn require<'a>(elements: &'a ElementSet, path: &str, step: LoginStep) -> Result<&'a dyn Element> {
    elements
        .get(path)
        .ok_or_else(|| step.failed(format!("element '{}' not found", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DriverAction, FakeSite, TempDir};
    use crate::traits::driver::BrowserDriver;

    fn authenticator() -> Authenticator {
        Authenticator::new(Credentials::new("someone@example.org", "hunter2"))
            .with_settle_delay(SettleDelay::none())
    }

    #[test]
    fn test_settle_delay_clamped() {
        assert_eq!(
            SettleDelay::new(Duration::from_secs(30)).duration(),
            SettleDelay::MAX
        );
        assert_eq!(
            SettleDelay::new(Duration::from_millis(250)).duration(),
            Duration::from_millis(250)
        );
        assert_eq!(SettleDelay::default().duration(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_login_follows_protocol_order() {
        let dir = TempDir::new("auth-order");
        let store = SessionStore::new(dir.join("login.json"));
        let site = FakeSite::new();

        let page = site.new_page().await.unwrap();
        let session = authenticator().login(page.as_ref(), &store).await.unwrap();

        let interactions: Vec<DriverAction> = site
            .actions()
            .into_iter()
            .filter(|a| matches!(a, DriverAction::Fill { .. } | DriverAction::Click(_)))
            .collect();

        assert_eq!(
            interactions,
            vec![
                DriverAction::Fill {
                    path: shapes::EMAIL_INPUT.to_string(),
                    text: "someone@example.org".to_string(),
                },
                DriverAction::Click(shapes::VERIFY_CHECKBOX.to_string()),
                DriverAction::Click(shapes::CONTINUE_BUTTON.to_string()),
                DriverAction::Fill {
                    path: shapes::PASSWORD_INPUT.to_string(),
                    text: "hunter2".to_string(),
                },
                DriverAction::Click(shapes::CONTINUE_BUTTON.to_string()),
            ]
        );
        assert_eq!(site.actions().last(), Some(&DriverAction::CaptureState));
        assert_eq!(store.load().unwrap(), session);
    }

    #[tokio::test]
    async fn test_missing_checkbox_fails_without_saving() {
        let dir = TempDir::new("auth-missing");
        let store = SessionStore::new(dir.join("login.json"));
        let site = FakeSite::new().without_element(shapes::VERIFY_CHECKBOX);

        let page = site.new_page().await.unwrap();
        let err = authenticator().login(page.as_ref(), &store).await.unwrap_err();

        match err {
            ScrapeError::AuthenticationFailed { step, reason } => {
                assert_eq!(step, LoginStep::VerifyHuman);
                assert!(reason.contains(shapes::VERIFY_CHECKBOX));
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
        assert!(!store.exists());
        // The password step is never reached.
        assert!(!site
            .actions()
            .iter()
            .any(|a| matches!(a, DriverAction::Fill { path, .. } if path == shapes::PASSWORD_INPUT)));
    }

    #[tokio::test]
    async fn test_missing_password_input_names_step() {
        let dir = TempDir::new("auth-password");
        let store = SessionStore::new(dir.join("login.json"));
        let site = FakeSite::new().without_element(shapes::PASSWORD_INPUT);

        let page = site.new_page().await.unwrap();
        let err = authenticator().login(page.as_ref(), &store).await.unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::AuthenticationFailed {
                step: LoginStep::EnterPassword,
                ..
            }
        ));
    }
}

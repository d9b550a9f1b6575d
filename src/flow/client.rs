//! Identity flow client
//!
//! Every operation is the same two-phase exchange with the identity service:
//! initialize a browser flow, then submit it together with the anti-forgery
//! token the flow carried.

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::extract::{csrf_token, error_message};
use super::types::*;
use crate::error::{ClientError, Result};
use crate::http::{HttpContext, JSON};

/// Moves the caller's view somewhere else (the login page after logout).
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, location: &str) {
        self(location)
    }
}

/// Something that must be torn down when the user logs out.
pub trait Teardown: Send + Sync {
    fn teardown(&self);
}

/// HTTP client for the identity service's self-service flows
#[derive(Clone)]
pub struct IdentityClient {
    http: HttpContext,
}

impl IdentityClient {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    /// Log in with email and password, returning the new session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let flow = self.init_flow(FlowKind::Login).await?;

        let body = LoginSubmission {
            method: "password",
            identifier: email,
            password,
            csrf_token: csrf_token(&flow.ui.nodes),
        };

        let response: LoginResponse = self.submit_flow(FlowKind::Login, &flow.id, &body).await?;

        let session = response
            .session
            .ok_or_else(|| ClientError::InvalidResponse("login response has no session".into()))?;

        info!(session_id = ?session.id, "Logged in");
        Ok(session)
    }

    /// Register a new identity
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<RegistrationResult> {
        let flow = self.init_flow(FlowKind::Registration).await?;

        let body = RegistrationSubmission {
            method: "password",
            password,
            traits: RegistrationTraits { email, name },
            csrf_token: csrf_token(&flow.ui.nodes),
        };

        let result = self
            .submit_flow(FlowKind::Registration, &flow.id, &body)
            .await?;

        info!("Registered new identity");
        Ok(result)
    }

    /// Log out.
    ///
    /// The server-side logout is best effort and its errors are only logged.
    /// Whatever happens to it (including this future being dropped half way),
    /// `channel` is torn down and `navigator` is sent to the entry point.
    pub async fn logout<T, N>(&self, channel: &T, navigator: &N)
    where
        T: Teardown + ?Sized,
        N: Navigator + ?Sized,
    {
        let _sign_out = LocalSignOut {
            channel,
            navigator,
            entry_point: &self.http.config().entry_point,
        };

        if let Err(e) = self.end_server_session().await {
            warn!(error = %e, "Logout error");
        }
    }

    /// The session the cookie jar currently holds
    pub async fn get_current_user(&self) -> Result<Session> {
        let url = self.http.config().auth_url("/sessions/whoami")?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Session check rejected");
            return Err(ClientError::NotAuthenticated);
        }

        Ok(response.json().await?)
    }

    async fn init_flow(&self, kind: FlowKind) -> Result<FlowDescriptor> {
        let url = self
            .http
            .config()
            .auth_url(&format!("/self-service/{}/browser", kind))?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            warn!(flow = %kind, status = %response.status(), "Flow initialization rejected");
            return Err(ClientError::FlowInit(kind));
        }

        let flow: FlowDescriptor = response.json().await?;
        debug!(flow = %kind, flow_id = %flow.id, "Flow initialized");
        Ok(flow)
    }

    async fn submit_flow<B, R>(&self, kind: FlowKind, flow_id: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self
            .http
            .config()
            .auth_url(&format!("/self-service/{}", kind))?;

        let response = self
            .http
            .post(url)
            .query(&[("flow", flow_id)])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            // A body that is not a flow at all still yields the fallback text
            let failure: FlowFailure = serde_json::from_slice(&bytes).unwrap_or_default();
            let message = error_message(failure.ui.as_ref());
            debug!(flow = %kind, status = %status, message = %message, "Flow submission rejected");
            return Err(ClientError::Auth(message));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn end_server_session(&self) -> Result<()> {
        let url = self.http.config().auth_url("/self-service/logout/browser")?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::FlowInit(FlowKind::Logout));
        }

        let flow: LogoutFlow = response.json().await?;

        self.http
            .client()
            .get(&flow.logout_url)
            .header(header::ACCEPT, JSON)
            .send()
            .await?;

        info!("Server session ended");
        Ok(())
    }
}

/// Local half of a logout, run when dropped
struct LocalSignOut<'a, T: Teardown + ?Sized, N: Navigator + ?Sized> {
    channel: &'a T,
    navigator: &'a N,
    entry_point: &'a str,
}

impl<T: Teardown + ?Sized, N: Navigator + ?Sized> Drop for LocalSignOut<'_, T, N> {
    fn drop(&mut self) {
        self.channel.teardown();
        self.navigator.redirect(self.entry_point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingTeardown(AtomicUsize);

    impl Teardown for CountingTeardown {
        fn teardown(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_sign_out_guard_runs_on_drop() {
        let channel = CountingTeardown(AtomicUsize::new(0));
        let visited = Mutex::new(Vec::new());
        let navigator = |location: &str| visited.lock().unwrap().push(location.to_string());

        {
            let _guard = LocalSignOut {
                channel: &channel,
                navigator: &navigator,
                entry_point: "/login.html",
            };
        }

        assert_eq!(channel.0.load(Ordering::SeqCst), 1);
        assert_eq!(*visited.lock().unwrap(), vec!["/login.html".to_string()]);
    }

    #[test]
    fn test_flow_kind_paths() {
        assert_eq!(FlowKind::Login.to_string(), "login");
        assert_eq!(FlowKind::Registration.to_string(), "registration");
        assert_eq!(
            ClientError::FlowInit(FlowKind::Logout).to_string(),
            "Failed to initialize logout flow"
        );
    }
}

use std::time::Duration;

use serde_json::json;

use skillswap_domain::ports::BoxFuture;
use skillswap_domain::ports::auth::{MailError, MailSink};

use crate::config::AppConfig;

const MAIL_TIMEOUT: Duration = Duration::from_secs(5);
const AUTH_HEADER: &str = "X-Relay-Token";

/// Delivers verification codes through an HTTP mail relay. With no relay
/// configured every send reports `Unavailable`, and registration falls back
/// to returning the code in-band.
#[derive(Clone)]
pub struct HttpMailSink {
    http: reqwest::Client,
    relay_url: Option<String>,
    relay_token: Option<String>,
    from: String,
}

impl HttpMailSink {
    pub fn from_config(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(MAIL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let relay_url = config.mail_relay_url.trim().to_string();
        let relay_token = config.mail_relay_token.trim().to_string();
        Self {
            http,
            relay_url: (!relay_url.is_empty()).then_some(relay_url),
            relay_token: (!relay_token.is_empty()).then_some(relay_token),
            from: config.mail_from.clone(),
        }
    }
}

impl MailSink for HttpMailSink {
    fn send_otp(
        &self,
        to: &str,
        name: &str,
        code: &str,
    ) -> BoxFuture<'_, Result<(), MailError>> {
        let to = to.to_string();
        let name = name.to_string();
        let code = code.to_string();
        Box::pin(async move {
            let Some(url) = self.relay_url.as_deref() else {
                return Err(MailError::Unavailable(
                    "mail relay is not configured".to_string(),
                ));
            };

            let payload = json!({
                "from": self.from,
                "to": to,
                "subject": "Your SkillSwap verification code",
                "text": format!(
                    "Hi {name},\n\nYour verification code is {code}. It expires in 10 minutes.\n"
                ),
            });

            let mut request = self.http.post(url).json(&payload);
            if let Some(token) = self.relay_token.as_deref() {
                request = request.header(AUTH_HEADER, token);
            }

            let response = request
                .send()
                .await
                .map_err(|err| MailError::Unavailable(err.to_string()))?;

            let status = response.status();
            if status.is_success() {
                tracing::debug!(to, "otp mail accepted by relay");
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(MailError::Rejected(format!(
                "relay returned {status}: {body}"
            )))
        })
    }
}

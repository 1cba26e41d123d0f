//! Telegram adapter for the alert sink. Alerting is best-effort: an
//! unconfigured bot or a transport failure downgrades to a log notice.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use tracing::{info, warn};

use denywatch_domain::model::BlockedAlert;
use denywatch_domain::sources::{AlertSink, FetchError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramSink {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramSink {
    pub fn new(
        bot_token: Option<String>,
        chat_id: Option<String>,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: bot_token.filter(|token| !token.is_empty()),
            chat_id: chat_id.filter(|chat| !chat.is_empty()),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let base: String = base.into();
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    fn render_message(alert: &BlockedAlert) -> String {
        let mut message = String::from("*Denylist Alert*\n\n");
        message.push_str(&format!("*Account*: {}\n", alert.account_name));
        message.push_str(&format!("*Domain*: `{}`\n", alert.domain));
        message.push_str(&format!("*Reason*: {}\n", alert.reason));
        if let Some(client_ip) = &alert.client_ip {
            message.push_str(&format!("*Client IP*: `{client_ip}`\n"));
        }
        message.push_str(&format!(
            "*Time*: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        message
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn send(&self, alert: &BlockedAlert) -> bool {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            // Local fallback notice so the operator still sees the event.
            info!(
                account = %alert.account_name,
                domain = %alert.domain,
                reason = %alert.reason,
                "alert (no messaging channel configured)"
            );
            counter!("monitor_alerts_sent_total", "result" => "unconfigured").increment(1);
            return false;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let text = Self::render_message(alert);
        let params = [
            ("chat_id", chat_id.as_str()),
            ("text", text.as_str()),
            ("parse_mode", "Markdown"),
        ];

        match self.http.post(url).form(&params).send().await {
            Ok(response) if response.status().is_success() => {
                counter!("monitor_alerts_sent_total", "result" => "ok").increment(1);
                true
            }
            Ok(response) => {
                warn!(
                    status = response.status().as_u16(),
                    domain = %alert.domain,
                    "messaging endpoint rejected alert"
                );
                counter!("monitor_alerts_sent_total", "result" => "rejected").increment(1);
                false
            }
            Err(err) => {
                warn!(%err, domain = %alert.domain, "alert send failed");
                counter!("monitor_alerts_sent_total", "result" => "error").increment(1);
                false
            }
        }
    }
}

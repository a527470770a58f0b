use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::newsletter::{
    dispatch::DispatchReport,
    repo::{Newsletter, Subscriber},
};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub subscriber: Subscriber,
}

#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    pub subject: String,
    pub content: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_for: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct AddSubscriberRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "ADMIN".into()
}

/// Returned by the send endpoint: the SENT campaign plus per-recipient
/// delivery accounting.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub newsletter: Newsletter,
    pub report: DispatchReport,
}

#[derive(Debug, Serialize)]
pub struct NewsletterStatsResponse {
    pub total_sent: i64,
    pub average_open_rate: f64,
    pub average_click_rate: f64,
    pub total_subscribers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_subscriber_defaults_to_admin_source() {
        let req: AddSubscriberRequest =
            serde_json::from_str(r#"{"email":"sub@example.com"}"#).expect("parse");
        assert_eq!(req.source, "ADMIN");
        assert!(req.name.is_none());
    }

    #[test]
    fn campaign_request_parses_rfc3339_schedule() {
        let req: CampaignRequest = serde_json::from_str(
            r#"{"subject":"S","content":"C","scheduled_for":"2026-09-01T10:00:00Z"}"#,
        )
        .expect("parse");
        assert!(req.scheduled_for.is_some());
    }

    #[test]
    fn campaign_request_schedule_is_optional() {
        let req: CampaignRequest =
            serde_json::from_str(r#"{"subject":"S","content":"C"}"#).expect("parse");
        assert!(req.scheduled_for.is_none());
    }
}

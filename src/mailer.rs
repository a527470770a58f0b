use anyhow::Context;
use axum::async_trait;
use tracing::{info, warn};

/// Transactional email delivery. The real implementation talks to the Resend
/// HTTP API; tests and keyless deployments use [`NullMailer`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("resend request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("resend returned {}: {}", status, body);
        }

        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// Drops mail on the floor. Used when RESEND_API_KEY is not configured and by
/// `AppState::fake()`.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> anyhow::Result<()> {
        warn!(to = %to, subject = %subject, "mailer not configured; dropping email");
        Ok(())
    }
}

fn button_email(heading: &str, intro: &str, action_url: &str, label: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 4px; }}
    .footer {{ margin-top: 20px; font-size: 0.9em; color: #666; }}
  </style>
</head>
<body>
  <div class="container">
    <h2>{heading}</h2>
    <p>{intro}</p>
    <p><a href="{action_url}" class="button">{label}</a></p>
    <p>If you didn't request this, you can safely ignore this email.</p>
    {footer}
    <div class="footer">
      <p>If the button doesn't work, copy and paste this link into your browser:</p>
      <p>{action_url}</p>
    </div>
  </div>
</body>
</html>
"#
    )
}

pub fn verification_email(base_url: &str, token: &str) -> (String, String) {
    let verify_url = format!("{}/verify?token={}", base_url, token);
    let html = button_email(
        "Verify Your Email",
        "Thanks for signing up! Click the button below to verify your email address:",
        &verify_url,
        "Verify Email",
        "",
    );
    ("Verify Your Email".to_string(), html)
}

pub fn password_reset_email(base_url: &str, token: &str) -> (String, String) {
    let reset_url = format!("{}/new-password?token={}", base_url, token);
    let html = button_email(
        "Reset Your Password",
        "You requested to reset your password. Click the button below to set a new password:",
        &reset_url,
        "Reset Password",
        "<p>This link will expire in 1 hour.</p>",
    );
    ("Reset Your Password".to_string(), html)
}

pub fn welcome_email() -> (String, String) {
    (
        "Welcome to the Inkwell Newsletter!".to_string(),
        "<h1>Welcome to the Inkwell Newsletter!</h1>\
         <p>Thank you for subscribing to our newsletter.</p>\
         <p>You'll receive updates about our latest content and features.</p>"
            .to_string(),
    )
}

pub fn welcome_back_email() -> (String, String) {
    (
        "Welcome Back to the Inkwell Newsletter!".to_string(),
        "<h1>Welcome Back!</h1>\
         <p>We're glad to have you back on our newsletter list.</p>\
         <p>You'll start receiving our updates again.</p>"
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_embeds_link() {
        let (subject, html) = verification_email("https://example.com", "abc123");
        assert_eq!(subject, "Verify Your Email");
        assert!(html.contains("https://example.com/verify?token=abc123"));
    }

    #[test]
    fn reset_email_embeds_link_and_expiry_notice() {
        let (_, html) = password_reset_email("https://example.com", "deadbeef");
        assert!(html.contains("https://example.com/new-password?token=deadbeef"));
        assert!(html.contains("expire in 1 hour"));
    }

    #[tokio::test]
    async fn null_mailer_accepts_everything() {
        NullMailer
            .send("user@example.com", "Hi", "<p>hi</p>")
            .await
            .expect("null mailer never fails");
    }
}

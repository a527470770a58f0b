use anyhow::Context;
use serde::Deserialize;

use crate::config::OAuthConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Identity from Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

pub fn authorize_url(cfg: &OAuthConfig) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&prompt=consent&access_type=offline",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&cfg.google_client_id),
        urlencoding::encode(&cfg.redirect_url),
    )
}

/// Complete the code-for-identity handshake: exchange the authorization code,
/// then fetch the user's profile with the resulting access token.
pub async fn resolve_identity(cfg: &OAuthConfig, code: &str) -> anyhow::Result<GoogleUser> {
    let http = reqwest::Client::new();

    let token: TokenResponse = http
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", cfg.google_client_id.as_str()),
            ("client_secret", cfg.google_client_secret.as_str()),
            ("redirect_uri", cfg.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("google token exchange")?
        .error_for_status()
        .context("google token exchange rejected")?
        .json()
        .await
        .context("google token response")?;

    let user: GoogleUser = http
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .context("google userinfo")?
        .error_for_status()
        .context("google userinfo rejected")?
        .json()
        .await
        .context("google userinfo response")?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_redirect() {
        let cfg = OAuthConfig {
            google_client_id: "client-123".into(),
            google_client_secret: "shh".into(),
            redirect_url: "http://localhost:3000/oauth/callback".into(),
        };
        let url = authorize_url(&cfg);
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Foauth%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn userinfo_defaults_unverified() {
        let user: GoogleUser =
            serde_json::from_str(r#"{"sub":"1","email":"a@b.co"}"#).expect("parse");
        assert!(!user.email_verified);
        assert!(user.name.is_none());
    }
}

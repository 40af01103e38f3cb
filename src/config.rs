use std::env;
use std::time::Duration;

/// Immutable application configuration, read from the environment once at
/// startup and shared by reference through [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the server listens on.
    pub port: u16,
    /// Stripe secret API key (sk_live_... or sk_test_...).
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret (whsec_...).
    pub webhook_secret: String,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
    /// Redirect target after a completed checkout.
    pub success_url: String,
    /// Redirect target after an abandoned checkout.
    pub cancel_url: String,
    /// Product label shown on the hosted checkout page.
    pub product_name: String,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Requests allowed per window, per client address.
    pub max_requests: u32,
    pub window: Duration,
    /// Message returned with 429 responses.
    pub message: String,
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_string(),
        "http://127.0.0.1:8080".to_string(),
        "https://buymecoffees.org".to_string(),
    ]
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Panics when a required secret is missing; everything else falls back
    /// to a default.
    pub fn from_env() -> Self {
        let stripe_secret_key =
            env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
        let webhook_secret =
            env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET must be set");

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(default_allowed_origins);

        let success_url = env::var("SUCCESS_URL")
            .unwrap_or_else(|_| "https://buymecoffees.org/success.html".to_string());
        let cancel_url = env::var("CANCEL_URL")
            .unwrap_or_else(|_| "https://buymecoffees.org/cancel.html".to_string());

        let max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        let window_secs: u64 = env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15 * 60);

        Self {
            port,
            stripe_secret_key,
            webhook_secret,
            allowed_origins,
            success_url,
            cancel_url,
            product_name: "Buy Me a Coffee".to_string(),
            rate_limit: RateLimitSettings {
                max_requests,
                window: Duration::from_secs(window_secs),
                message: "Too many requests. Try again in 15 minutes.".to_string(),
            },
        }
    }
}

#[cfg(test)]
impl AppConfig {
    /// Fixed configuration for route-level tests; no environment reads.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            stripe_secret_key: "sk_test_dummy".to_string(),
            webhook_secret: "whsec_test_secret".to_string(),
            allowed_origins: default_allowed_origins(),
            success_url: "https://buymecoffees.org/success.html".to_string(),
            cancel_url: "https://buymecoffees.org/cancel.html".to_string(),
            product_name: "Buy Me a Coffee".to_string(),
            rate_limit: RateLimitSettings {
                max_requests: 100,
                window: Duration::from_secs(15 * 60),
                message: "Too many requests. Try again in 15 minutes.".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origin_list_matches_site() {
        let origins = default_allowed_origins();
        assert_eq!(origins.len(), 3);
        assert!(origins.contains(&"https://buymecoffees.org".to_string()));
    }

    #[test]
    fn test_config_has_fifteen_minute_window() {
        let config = AppConfig::for_tests();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
    }
}

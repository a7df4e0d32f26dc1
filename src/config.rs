use std::env;
use std::path::PathBuf;

/// Stripe payment link used when `QRSTUDIO_PAYMENT_URL` is unset (test mode).
pub const DEFAULT_PAYMENT_URL: &str = "https://buy.stripe.com/test_4gM9AM7Wtdc6eeacQ73F600";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Where the design page lives; return URLs are resolved against it.
    pub app_base_url: String,
    pub payment_url: String,
    pub verify_url: String,
    pub storage_dir: PathBuf,
    pub stripe_secret_key: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("QRSTUDIO_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let app_base_url = with_trailing_slash(
            env::var("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port)),
        );

        let verify_url =
            env::var("QRSTUDIO_VERIFY_URL").unwrap_or_else(|_| format!("{}verify", app_base_url));

        Self {
            host,
            port,
            app_base_url,
            payment_url: env::var("QRSTUDIO_PAYMENT_URL")
                .unwrap_or_else(|_| DEFAULT_PAYMENT_URL.to_string()),
            verify_url,
            storage_dir: env::var("QRSTUDIO_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".qrstudio")),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok().filter(|k| !k.is_empty()),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_added_once() {
        assert_eq!(with_trailing_slash("http://a:1".into()), "http://a:1/");
        assert_eq!(with_trailing_slash("http://a:1/".into()), "http://a:1/");
    }
}

use std::env;

use crate::citation::DEFAULT_TRUNCATION_LIMIT;
use crate::models::FrontendSettings;
use crate::parser::DEFAULT_FOLLOWUP_DELIMITER;

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub sanitize_answer: bool,
    pub followup_delimiter: String,
    pub truncation_limit: usize,
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub pdf_endpoint: String,
    pub document_viewer_base_url: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub backend_base_url: String,
    pub feedback_enabled: bool,
    pub render: RenderConfig,
    pub viewer: ViewerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            backend_base_url: "http://127.0.0.1:50505".to_string(),
            feedback_enabled: false,
            render: RenderConfig {
                sanitize_answer: false,
                followup_delimiter: DEFAULT_FOLLOWUP_DELIMITER.to_string(),
                truncation_limit: DEFAULT_TRUNCATION_LIMIT,
            },
            viewer: ViewerConfig {
                pdf_endpoint: "/get-pdf".to_string(),
                document_viewer_base_url: "https://amsterdam.publishone.nl/document/".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env::var("CITEDESK_BIND").unwrap_or(defaults.bind_addr),
            backend_base_url: env::var("BACKEND_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.backend_base_url),
            feedback_enabled: env_flag("FEEDBACK_ENABLED").unwrap_or(defaults.feedback_enabled),
            render: RenderConfig {
                sanitize_answer: env_flag("SANITIZE_ANSWER")
                    .unwrap_or(defaults.render.sanitize_answer),
                followup_delimiter: env::var("FOLLOWUP_DELIMITER")
                    .ok()
                    .filter(|value| !value.is_empty())
                    .unwrap_or(defaults.render.followup_delimiter),
                truncation_limit: env::var("LABEL_TRUNCATION_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.render.truncation_limit),
            },
            viewer: ViewerConfig {
                pdf_endpoint: env::var("PDF_ENDPOINT").unwrap_or(defaults.viewer.pdf_endpoint),
                document_viewer_base_url: env::var("DOCUMENT_VIEWER_BASE_URL")
                    .unwrap_or(defaults.viewer.document_viewer_base_url),
            },
        }
    }

    /// Overlay the switches the backend publishes on `/frontend_settings`.
    pub fn apply_frontend_settings(&mut self, settings: &FrontendSettings) {
        self.render.sanitize_answer = settings.sanitize_answer;
        self.feedback_enabled = settings.feedback_enabled;
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn sanitization_is_off_unless_configured() {
        let config = AppConfig::default();
        assert!(!config.render.sanitize_answer);
        assert_eq!(config.render.truncation_limit, 50);
    }

    #[test]
    fn frontend_settings_override_switches() {
        let mut config = AppConfig::default();
        config.apply_frontend_settings(&FrontendSettings {
            auth_enabled: true,
            feedback_enabled: true,
            sanitize_answer: true,
        });
        assert!(config.render.sanitize_answer);
        assert!(config.feedback_enabled);
    }
}

use crate::types::SlaideConfig;
use crate::ConfigError;

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

fn check_url(errors: &mut Vec<ConfigError>, field: &str, value: &str) {
    if !is_http_url(value) {
        errors.push(ConfigError::InvalidUrl {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl SlaideConfig {
    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        check_url(&mut errors, "host.url", &self.host.url);
        if !self.host.render_path.starts_with('/') {
            errors.push(ConfigError::InvalidConfig(format!(
                "host.render_path '{}' must start with '/'",
                self.host.render_path
            )));
        }

        if self.stability.interval_ms == 0 {
            errors.push(ConfigError::InvalidConfig(
                "stability.interval_ms must be greater than zero".to_string(),
            ));
        } else if self.stability.interval_ms > self.stability.timeout_ms {
            errors.push(ConfigError::InvalidConfig(format!(
                "stability.interval_ms ({}) exceeds stability.timeout_ms ({})",
                self.stability.interval_ms, self.stability.timeout_ms
            )));
        }

        let host_budget_ms = self
            .host
            .timeout_secs
            .saturating_mul(1000)
            .saturating_add(self.stability.timeout_ms);
        if self.server.request_timeout_secs.saturating_mul(1000) <= host_budget_ms {
            errors.push(ConfigError::InvalidConfig(format!(
                "server.request_timeout_secs ({}) must exceed host.timeout_secs ({}) plus stability.timeout_ms ({})",
                self.server.request_timeout_secs,
                self.host.timeout_secs,
                self.stability.timeout_ms
            )));
        }

        if self.server.concurrency_limit == 0 {
            errors.push(ConfigError::InvalidConfig(
                "server.concurrency_limit must be greater than zero".to_string(),
            ));
        }

        if let Some(ref discord) = self.discord {
            check_url(&mut errors, "discord.redirect_uri", &discord.redirect_uri);
            check_url(&mut errors, "discord.api_base", &discord.api_base);
            if discord.client_id.is_empty() || discord.client_secret.is_empty() {
                errors.push(ConfigError::InvalidConfig(
                    "discord.client_id and discord.client_secret must be set".to_string(),
                ));
            }
            if self.supabase.is_none() {
                errors.push(ConfigError::InvalidConfig(
                    "Discord login is configured but there is no supabase section to store users"
                        .to_string(),
                ));
            }
        }

        if let Some(ref supabase) = self.supabase {
            check_url(&mut errors, "supabase.url", &supabase.url);
            if supabase.users_table.is_empty() {
                errors.push(ConfigError::InvalidConfig(
                    "supabase.users_table must not be empty".to_string(),
                ));
            }
        }

        errors
    }

    /// Validate and return the first error, if any.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscordSection, SupabaseSection};

    fn discord() -> DiscordSection {
        DiscordSection {
            client_id: "123".to_string(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:3000/api/auth/discord/callback".to_string(),
            api_base: "https://discord.com/api".to_string(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SlaideConfig::default().validate().is_empty());
    }

    #[test]
    fn test_rejects_non_http_host() {
        let mut config = SlaideConfig::default();
        config.host.url = "localhost:8000".to_string();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::InvalidUrl { field, .. } if field == "host.url"
        ));
    }

    #[test]
    fn test_rejects_bad_render_path() {
        let mut config = SlaideConfig::default();
        config.host.render_path = "render-html".to_string();
        assert!(config.validate_or_err().is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = SlaideConfig::default();
        config.stability.interval_ms = 0;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_rejects_interval_longer_than_timeout() {
        let mut config = SlaideConfig::default();
        config.stability.interval_ms = 10_000;
        let err = config.validate_or_err().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_request_timeout_must_outlast_host() {
        let mut config = SlaideConfig::default();
        config.server.request_timeout_secs = 300;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("request_timeout_secs"));

        // Equal to the Host budget is still too short.
        config.host.timeout_secs = 295;
        config.stability.timeout_ms = 5000;
        assert!(config.validate_or_err().is_err());

        config.server.request_timeout_secs = 301;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_discord_without_supabase() {
        let config = SlaideConfig {
            discord: Some(discord()),
            ..SlaideConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("supabase"));
    }

    #[test]
    fn test_discord_with_supabase_is_valid() {
        let config = SlaideConfig {
            discord: Some(discord()),
            supabase: Some(SupabaseSection {
                url: "https://abc.supabase.co".to_string(),
                key: "key".into(),
                users_table: "users".to_string(),
            }),
            ..SlaideConfig::default()
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://localhost:8000"));
        assert!(is_http_url("https://discord.com/api"));
        assert!(!is_http_url("http://"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https:///path"));
    }
}

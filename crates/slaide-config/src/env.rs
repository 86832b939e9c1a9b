use regex::{Captures, Regex};
use std::env;

use crate::types::{DiscordSection, SlaideConfig, SupabaseSection};
use crate::{defaults, ConfigError};

/// Replace `${VAR_NAME}` occurrences with values from `lookup`.
/// Every unresolved name is reported, not just the first.
pub fn interpolate_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern");
    let mut missing = Vec::new();

    let result = re.replace_all(input, |cap: &Captures<'_>| {
        let name = &cap[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }
    Ok(result.into_owned())
}

/// Interpolate against the process environment.
pub fn interpolate_env(input: &str) -> Result<String, ConfigError> {
    interpolate_with(input, |name| env::var(name).ok())
}

fn first_of<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
}

impl SlaideConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|name| env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// `SLAIDE_HOST_URL` replaces the Host base URL. Discord and Supabase
    /// settings patch an existing section, or create one when every required
    /// value is available.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = first_of(&lookup, &["SLAIDE_HOST_URL"]) {
            self.host.url = url;
        }

        let client_id = first_of(
            &lookup,
            &["DISCORD_CLIENT_ID", "NEXT_PUBLIC_DISCORD_CLIENT_ID"],
        );
        let client_secret = first_of(&lookup, &["DISCORD_CLIENT_SECRET"]);
        let redirect_uri = first_of(&lookup, &["DISCORD_REDIRECT_URI"]);

        match self.discord.as_mut() {
            Some(discord) => {
                if let Some(id) = client_id {
                    discord.client_id = id;
                }
                if let Some(secret) = client_secret {
                    discord.client_secret = secret.into();
                }
                if let Some(uri) = redirect_uri {
                    discord.redirect_uri = uri;
                }
            }
            None => {
                if let (Some(client_id), Some(secret), Some(redirect_uri)) =
                    (client_id, client_secret, redirect_uri)
                {
                    self.discord = Some(DiscordSection {
                        client_id,
                        client_secret: secret.into(),
                        redirect_uri,
                        api_base: defaults::discord_api_base(),
                    });
                }
            }
        }

        let supabase_url = first_of(&lookup, &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]);
        let supabase_key = first_of(&lookup, &["SUPABASE_KEY", "SUPABASE_SERVICE_ROLE_KEY"]);

        match self.supabase.as_mut() {
            Some(supabase) => {
                if let Some(url) = supabase_url {
                    supabase.url = url;
                }
                if let Some(key) = supabase_key {
                    supabase.key = key.into();
                }
            }
            None => {
                if let (Some(url), Some(key)) = (supabase_url, supabase_key) {
                    self.supabase = Some(SupabaseSection {
                        url,
                        key: key.into(),
                        users_table: defaults::users_table(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_interpolate_replaces_all_occurrences() {
        let lookup = vars(&[("A", "one"), ("B", "two")]);
        let out = interpolate_with("${A}-${B}-${A}", lookup).unwrap();
        assert_eq!(out, "one-two-one");
    }

    #[test]
    fn test_interpolate_reports_each_missing_once() {
        let lookup = vars(&[]);
        let err = interpolate_with("${X} ${Y} ${X}", lookup).unwrap_err();
        match err {
            ConfigError::MissingEnvVars(names) => assert_eq!(names, vec!["X", "Y"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_interpolate_leaves_plain_dollar_alone() {
        let out = interpolate_with("cost: $5 and $HOME", vars(&[])).unwrap();
        assert_eq!(out, "cost: $5 and $HOME");
    }

    #[test]
    fn test_interpolate_env_reads_process_env() {
        env::set_var("SLAIDE_TEST_INTERP_VAR", "from-env");
        let out = interpolate_env("v=${SLAIDE_TEST_INTERP_VAR}").unwrap();
        assert_eq!(out, "v=from-env");
    }

    #[test]
    fn test_host_url_override() {
        let mut config = SlaideConfig::default();
        config.apply_env_overrides_with(vars(&[("SLAIDE_HOST_URL", "http://agent:9000")]));
        assert_eq!(config.host.url, "http://agent:9000");
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let mut config = SlaideConfig::default();
        config.apply_env_overrides_with(vars(&[("SLAIDE_HOST_URL", "")]));
        assert_eq!(config.host.url, "http://localhost:8000");
    }

    #[test]
    fn test_discord_section_needs_all_values() {
        let mut config = SlaideConfig::default();
        config.apply_env_overrides_with(vars(&[
            ("DISCORD_CLIENT_ID", "123"),
            ("DISCORD_CLIENT_SECRET", "shh"),
        ]));
        assert!(config.discord.is_none());

        config.apply_env_overrides_with(vars(&[
            ("NEXT_PUBLIC_DISCORD_CLIENT_ID", "123"),
            ("DISCORD_CLIENT_SECRET", "shh"),
            ("DISCORD_REDIRECT_URI", "http://localhost:3000/api/auth/discord/callback"),
        ]));
        let discord = config.discord.expect("discord section");
        assert_eq!(discord.client_id, "123");
        assert_eq!(discord.client_secret.expose(), "shh");
        assert_eq!(discord.api_base, "https://discord.com/api");
    }

    #[test]
    fn test_supabase_patch_existing() {
        let mut config = SlaideConfig {
            supabase: Some(SupabaseSection {
                url: "https://old.supabase.co".to_string(),
                key: "old".into(),
                users_table: "members".to_string(),
            }),
            ..SlaideConfig::default()
        };
        config.apply_env_overrides_with(vars(&[("SUPABASE_SERVICE_ROLE_KEY", "new")]));
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://old.supabase.co");
        assert_eq!(supabase.key.expose(), "new");
        assert_eq!(supabase.users_table, "members");
    }
}

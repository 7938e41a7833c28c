use std::path::PathBuf;

use anyhow::Context;

use crate::error::ProgressionError;

pub const DEFAULT_CACHE_PATH: &str = ".campus-cache.json";
pub const SCHOOL_DOMAINS: [&str; 2] = ["campus-nord.fr", "campus-sud.fr"];
/// `CAMPUS_EMAIL_DOMAINS` value that turns the domain check off.
pub const ANY_DOMAIN: &str = "*";

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_path: PathBuf,
    pub email_policy: EmailPolicy,
}

impl Settings {
    pub fn from_env() -> Self {
        let cache_path = std::env::var("CAMPUS_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_PATH));
        let email_policy = std::env::var("CAMPUS_EMAIL_DOMAINS")
            .map(|raw| EmailPolicy::from_list(&raw))
            .unwrap_or_default();

        if email_policy.domains.is_empty() {
            tracing::warn!("CAMPUS_EMAIL_DOMAINS={ANY_DOMAIN}, accepting any email domain");
        }

        Self {
            cache_path,
            email_policy,
        }
    }

    pub fn database_url() -> anyhow::Result<String> {
        std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

/// Which school email domains may hold a student account. An empty list
/// accepts any domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPolicy {
    domains: Vec<String>,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            domains: SCHOOL_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl EmailPolicy {
    pub fn any_domain() -> Self {
        Self { domains: Vec::new() }
    }

    pub fn from_list(raw: &str) -> Self {
        if raw.trim() == ANY_DOMAIN {
            return Self::any_domain();
        }
        let domains: Vec<String> = raw
            .split(',')
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        if domains.is_empty() {
            return Self::default();
        }
        Self { domains }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Lowercases and checks an email, returning the normalised form.
    pub fn validate(&self, email: &str) -> Result<String, ProgressionError> {
        let email = email.trim().to_ascii_lowercase();
        let invalid = || ProgressionError::InvalidEmail(email.clone());

        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(invalid());
        }
        if !self.domains.is_empty() && !self.domains.iter().any(|d| d == domain) {
            return Err(invalid());
        }
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_only_accepts_school_domains() {
        let policy = EmailPolicy::default();
        assert!(policy.validate("lea.martin@campus-nord.fr").is_ok());
        assert!(policy.validate("ines.dubois@campus-sud.fr").is_ok());
        assert!(policy.validate("someone@gmail.com").is_err());
        assert_eq!(EmailPolicy::from_list(" , "), EmailPolicy::default());
    }

    #[test]
    fn open_policy_accepts_any_well_formed_email() {
        let policy = EmailPolicy::from_list(ANY_DOMAIN);
        assert_eq!(policy, EmailPolicy::any_domain());
        assert_eq!(policy.validate(" Jo.Doe@Example.org "), Ok("jo.doe@example.org".to_string()));
        assert!(policy.validate("no-at-sign").is_err());
        assert!(policy.validate("@example.org").is_err());
        assert!(policy.validate("a@b@example.org").is_err());
        assert!(policy.validate("a@localhost").is_err());
    }

    #[test]
    fn restricted_policy_checks_domain() {
        let policy = EmailPolicy::from_list("school-one.fr, @School-Two.fr,,");
        assert_eq!(policy.domains().len(), 2);
        assert!(policy.validate("ana@school-one.fr").is_ok());
        assert!(policy.validate("ana@SCHOOL-TWO.fr").is_ok());
        assert_eq!(
            policy.validate("ana@gmail.com"),
            Err(ProgressionError::InvalidEmail("ana@gmail.com".to_string()))
        );
    }
}

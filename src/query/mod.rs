//! Query building module
//!
//! Turns user input plus tenant scoping rules into the query string sent to
//! external ranking providers. Handles:
//! - Advanced search fields: field limits, quoted phrases, OR groups,
//!   negated terms, file types, site limits and exclusions
//! - Locale clauses: `language:es`
//! - Tenant scope: `scopeid:` and `site:` disjunctions within a length budget
//! - Tenant keywords: `("keyword one" OR "keyword two")`

use crate::config::SearchSettings;
use crate::tenant::TenantScope;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Scope used when a tenant has neither scope ids nor domains
pub const DEFAULT_SCOPE: &str = "(scopeid:usagovall OR site:gov OR site:mil)";

const SCOPE_DELIMITER: &str = " OR ";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Advanced search form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedQuery {
    /// Field-limit token applied to every core term (e.g. `intitle:`)
    pub query_limit: Option<String>,
    pub query_quote: Option<String>,
    pub query_quote_limit: Option<String>,
    pub query_or: Option<String>,
    pub query_or_limit: Option<String>,
    pub query_not: Option<String>,
    pub query_not_limit: Option<String>,
    pub file_type: Option<String>,
    /// Whitespace-separated sites; only those the tenant owns are kept
    pub site_limits: Option<String>,
    pub site_excludes: Option<String>,
}

impl AdvancedQuery {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Output of the query builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedQuery {
    /// User query after applying the advanced fields
    pub query: String,
    /// Query plus locale and tenant scope, as sent to external providers
    pub formatted: String,
    /// Requested site limits the tenant actually owns
    pub matching_site_limits: Vec<String>,
}

impl FormattedQuery {
    pub fn as_str(&self) -> &str {
        &self.formatted
    }
}

/// Builds provider query strings for one tenant
pub struct QueryBuilder<'a> {
    tenant: &'a TenantScope,
    default_locale: &'a str,
    allocation: usize,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(tenant: &'a TenantScope, settings: &'a SearchSettings) -> Self {
        Self {
            tenant,
            default_locale: &settings.default_locale,
            allocation: settings.query_string_allocation,
        }
    }

    /// Build the formatted query. Never fails; malformed input degrades to
    /// an empty clause.
    pub fn build(&self, raw: &str, advanced: &AdvancedQuery, locale: &str) -> FormattedQuery {
        let (query, matching_site_limits) = self.build_query(raw, advanced);
        let query_plus_locale = self.query_plus_locale(&query, locale);
        let scope = self.scope(&query, &query_plus_locale);
        let formatted = format!("{} {}", query_plus_locale, scope).trim().to_string();

        FormattedQuery {
            query,
            formatted,
            matching_site_limits,
        }
    }

    fn build_query(&self, raw: &str, advanced: &AdvancedQuery) -> (String, Vec<String>) {
        let mut query = raw
            .split_whitespace()
            .map(|term| limit_field(advanced.query_limit.as_deref(), term))
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(quote) = present(advanced.query_quote.as_deref()) {
            let phrase = format!("\"{}\"", quote);
            query.push(' ');
            query.push_str(&limit_field(advanced.query_quote_limit.as_deref(), &phrase));
        }

        if let Some(or_terms) = present(advanced.query_or.as_deref()) {
            let group = or_terms
                .split_whitespace()
                .map(|term| limit_field(advanced.query_or_limit.as_deref(), term))
                .collect::<Vec<_>>()
                .join(" OR ");
            query.push(' ');
            query.push_str(&group);
        }

        if let Some(not_terms) = present(advanced.query_not.as_deref()) {
            let negated = not_terms
                .split_whitespace()
                .map(|term| format!("-{}", limit_field(advanced.query_not_limit.as_deref(), term)))
                .collect::<Vec<_>>()
                .join(" ");
            query.push(' ');
            query.push_str(&negated);
        }

        if let Some(file_type) = present(advanced.file_type.as_deref()) {
            if !file_type.eq_ignore_ascii_case("all") {
                query.push_str(&format!(" filetype:{}", file_type));
            }
        }

        let mut matching_site_limits = Vec::new();
        if let Some(site_limits) = present(advanced.site_limits.as_deref()) {
            matching_site_limits = site_limits
                .split_whitespace()
                .filter(|site| self.tenant.includes_domain(site))
                .map(String::from)
                .collect();
            if !matching_site_limits.is_empty() {
                let sites = matching_site_limits
                    .iter()
                    .map(|site| format!("site:{}", site))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                query.push(' ');
                query.push_str(&sites);
            }
        }

        if let Some(site_excludes) = present(advanced.site_excludes.as_deref()) {
            let excludes = site_excludes
                .split_whitespace()
                .map(|site| format!("-site:{}", site))
                .collect::<Vec<_>>()
                .join(" ");
            query.push(' ');
            query.push_str(&excludes);
        }

        (query.trim().to_string(), matching_site_limits)
    }

    fn locale_clause(&self, locale: &str) -> Option<String> {
        let locale = locale.trim();
        if locale.is_empty() || locale == self.default_locale {
            None
        } else {
            Some(format!("language:{}", locale))
        }
    }

    fn query_plus_locale(&self, query: &str, locale: &str) -> String {
        let combined = format!(
            "({}) {}",
            query,
            self.locale_clause(locale).unwrap_or_default()
        );
        squeeze(&combined)
    }

    /// Tenant scope clause; skipped entirely when the query names a site
    fn scope(&self, query: &str, query_plus_locale: &str) -> String {
        let has_site = query.contains("site:");
        let (scope_ids, domains) = if has_site {
            (String::new(), String::new())
        } else {
            let scope_ids = self
                .tenant
                .scope_ids
                .iter()
                .map(|id| format!("scopeid:{}", id))
                .collect::<Vec<_>>()
                .join(SCOPE_DELIMITER);
            (scope_ids, self.fill_domains_to_remainder(query_plus_locale))
        };

        let mut scope = String::new();
        let has_scope = !scope_ids.is_empty() || !domains.is_empty();
        if has_scope {
            scope.push('(');
            scope.push_str(&scope_ids);
            if scope.len() > 1 && !domains.is_empty() {
                scope.push_str(SCOPE_DELIMITER);
            }
            scope.push_str(&domains);
            scope.push(')');
        } else if !has_site {
            scope.push(' ');
            scope.push_str(DEFAULT_SCOPE);
        }

        if !self.tenant.scope_keywords.is_empty() {
            let keywords = self
                .tenant
                .scope_keywords
                .iter()
                .map(|keyword| format!("\"{}\"", keyword))
                .collect::<Vec<_>>()
                .join(SCOPE_DELIMITER);
            scope.push_str(&format!(" ({})", keywords));
        }

        scope.trim().to_string()
    }

    /// Greedily include tenant domains while their URL-encoded form fits the
    /// remaining query budget
    fn fill_domains_to_remainder(&self, query_plus_locale: &str) -> String {
        let mut remaining = self.allocation as i64 - query_plus_locale.chars().count() as i64;
        let mut domains = Vec::new();

        for site in &self.tenant.allowed_domains {
            let site_str = format!("site:{}", site);
            let encoded = urlencoding::encode(&format!("{}{}", site_str, SCOPE_DELIMITER)).len();
            remaining -= encoded as i64;
            if remaining < 0 {
                break;
            }
            domains.push(site_str);
        }

        domains.join(SCOPE_DELIMITER)
    }
}

fn limit_field(field: Option<&str>, term: &str) -> String {
    match present(field) {
        Some(field) => format!("{}{}", field, term),
        None => term.to_string(),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn squeeze(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_string()
}

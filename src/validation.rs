use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{BankAccountPatch, SupplierDetailPatch, SupplierPatch};

pub const ACCOUNT_TYPES: &[&str] = &["Corporate", "Personal"];

/// Fields that must all be present whenever `account_type` is.
const ACCOUNT_TYPE_GROUP: &[&str] = &["account_holder_name", "account_number", "bank_name"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Url,
    Email,
    OneOf(&'static [&'static str]),
    Length { min: usize, max: usize },
    NoSpace,
    RequiredWith(&'static str),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Url => write!(f, "must be an http(s) URL"),
            Rule::Email => write!(f, "must be an email address"),
            Rule::OneOf(allowed) => write!(f, "must be one of {}", allowed.join(", ")),
            Rule::Length { min, max } => write!(f, "must be {min}-{max} characters"),
            Rule::NoSpace => write!(f, "must not contain whitespace"),
            Rule::RequiredWith(other) => write!(f, "is required when {other} is set"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub rule: Rule,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.rule)
    }
}

pub fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Constraints. An empty value passes every constraint except RequiredWith.
// ---------------------------------------------------------------------------

pub fn is_http_url(raw: &str) -> bool {
    if raw.is_empty() {
        return true;
    }
    match url::Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.has_host(),
        Err(_) => false,
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([a-z0-9_+-]+\.?)*[a-z0-9_+-]@([a-z0-9][a-z0-9-]*\.)+[a-z]{2,}$")
            .expect("email pattern is valid")
    })
}

pub fn is_email(raw: &str) -> bool {
    raw.is_empty() || email_regex().is_match(raw)
}

/// Strict `YYYY-MM-DD`.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn is_one_of(raw: &str, allowed: &[&str]) -> bool {
    raw.is_empty() || allowed.contains(&raw)
}

pub fn has_length(raw: &str, min: usize, max: usize) -> bool {
    let n = raw.chars().count();
    raw.is_empty() || (min..=max).contains(&n)
}

pub fn has_no_space(raw: &str) -> bool {
    !raw.chars().any(char::is_whitespace)
}

pub fn is_swift_code(raw: &str) -> bool {
    has_length(raw, 8, 11) && has_no_space(raw)
}

// ---------------------------------------------------------------------------
// Per-record validation
// ---------------------------------------------------------------------------

fn check(
    out: &mut Vec<Violation>,
    field: &'static str,
    value: &Option<String>,
    rule: Rule,
) {
    let ok = match (&rule, value.as_deref()) {
        (Rule::RequiredWith(_), v) => v.is_some_and(|v| !v.trim().is_empty()),
        (_, None) => true,
        (Rule::Url, Some(v)) => is_http_url(v),
        (Rule::Email, Some(v)) => is_email(v),
        (Rule::OneOf(allowed), Some(v)) => is_one_of(v, allowed),
        (Rule::Length { min, max }, Some(v)) => has_length(v, *min, *max),
        (Rule::NoSpace, Some(v)) => has_no_space(v),
    };
    if !ok {
        out.push(Violation { field, rule });
    }
}

pub fn validate_supplier(s: &SupplierPatch) -> Vec<Violation> {
    let mut out = Vec::new();
    check(&mut out, "vetting_info_url", &s.vetting_info_url, Rule::Url);
    check(&mut out, "social_network_id", &s.social_network_id, Rule::Length { min: 6, max: 20 });
    out
}

pub fn validate_detail(d: &SupplierDetailPatch) -> Vec<Violation> {
    let mut out = Vec::new();
    check(&mut out, "email_address", &d.email_address, Rule::Email);
    check(&mut out, "supplier_website_url", &d.supplier_website_url, Rule::Url);
    out
}

/// Validate the bank account as it will look after the write: the row's
/// values over `stored` when updating, the row alone when inserting.
pub fn validate_bank_account(
    patch: &BankAccountPatch,
    stored: Option<&BankAccountPatch>,
) -> Vec<Violation> {
    let mut out = Vec::new();
    check(&mut out, "account_type", &patch.account_type, Rule::OneOf(ACCOUNT_TYPES));
    if patch.swift_code.as_deref().is_some_and(|code| !is_swift_code(code)) {
        check(&mut out, "swift_code", &patch.swift_code, Rule::Length { min: 8, max: 11 });
        check(&mut out, "swift_code", &patch.swift_code, Rule::NoSpace);
    }

    let effective = match stored {
        Some(stored) => patch.overlay(stored),
        None => patch.clone(),
    };
    if effective.account_type.is_some() {
        let group = [
            &effective.account_holder_name,
            &effective.account_number,
            &effective.bank_name,
        ];
        for (&field, value) in ACCOUNT_TYPE_GROUP.iter().zip(group) {
            check(&mut out, field, value, Rule::RequiredWith("account_type"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swift_code() {
        assert!(is_swift_code("ABCD1234"));
        assert!(is_swift_code("ABCDEFGH123"));
        assert!(!is_swift_code("ABCD 123"));
        assert!(!is_swift_code("ABCDEFG"));
        assert!(!is_swift_code("ABCDEFGH1234"));
    }

    #[test]
    fn test_http_url() {
        assert!(is_http_url("https://example.com/vetting/1"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
        assert!(!is_http_url("/relative/path"));
        assert!(is_http_url(""));
    }

    #[test]
    fn test_email() {
        assert!(is_email("jane.doe@example.com"));
        assert!(is_email("Sales+cn@Acme-Factory.com.cn"));
        assert!(!is_email("jane@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("jane@example"));
        assert!(!is_email("jane doe@example.com"));
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_iso_date("2001-02-03"), NaiveDate::from_ymd_opt(2001, 2, 3));
        assert_eq!(parse_iso_date("2001-02-30"), None);
        assert_eq!(parse_iso_date("03/02/2001"), None);
    }

    #[test]
    fn test_social_network_length() {
        let mut s = SupplierPatch { id: 1, ..Default::default() };
        s.social_network_id = Some("abc".into());
        assert_eq!(
            validate_supplier(&s),
            vec![Violation {
                field: "social_network_id",
                rule: Rule::Length { min: 6, max: 20 }
            }]
        );
        s.social_network_id = Some("wechat_acme".into());
        assert!(validate_supplier(&s).is_empty());
    }

    #[test]
    fn test_detail_email_and_website() {
        let mut d = SupplierDetailPatch { supplier_id: 1, ..Default::default() };
        d.email_address = Some("not-an-email".into());
        d.supplier_website_url = Some("www.acme.com".into());
        let fields: Vec<_> = validate_detail(&d).iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["email_address", "supplier_website_url"]);
    }

    #[test]
    fn test_absent_values_pass() {
        assert!(validate_supplier(&SupplierPatch::default()).is_empty());
        assert!(validate_detail(&SupplierDetailPatch::default()).is_empty());
        assert!(validate_bank_account(&BankAccountPatch::default(), None).is_empty());
    }

    #[test]
    fn test_account_type_enum() {
        let mut b = BankAccountPatch { supplier_id: 1, ..Default::default() };
        b.account_type = Some("Savings".into());
        b.account_holder_name = Some("Jane".into());
        b.account_number = Some("001".into());
        b.bank_name = Some("Bank X".into());
        let v = validate_bank_account(&b, None);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].field, "account_type");
    }

    #[test]
    fn test_required_together_on_insert() {
        let mut b = BankAccountPatch { supplier_id: 1, ..Default::default() };
        b.account_type = Some("Corporate".into());
        b.bank_name = Some("Bank X".into());
        let fields: Vec<_> = validate_bank_account(&b, None).iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["account_holder_name", "account_number"]);
    }

    #[test]
    fn test_required_together_uses_stored_record_on_update() {
        let stored = BankAccountPatch {
            supplier_id: 43,
            account_holder_name: Some("Jane Doe".into()),
            account_number: Some("00112233".into()),
            bank_name: Some("Bank X".into()),
            ..Default::default()
        };
        let mut b = BankAccountPatch { supplier_id: 43, ..Default::default() };
        b.account_type = Some("Personal".into());
        assert!(validate_bank_account(&b, Some(&stored)).is_empty());
    }

    #[test]
    fn test_group_fields_without_account_type_pass() {
        let mut b = BankAccountPatch { supplier_id: 1, ..Default::default() };
        b.bank_name = Some("Bank X".into());
        assert!(validate_bank_account(&b, None).is_empty());
    }

    #[test]
    fn test_swift_violations_reported() {
        let mut b = BankAccountPatch { supplier_id: 1, ..Default::default() };
        b.swift_code = Some("AB CD".into());
        let rules: Vec<_> = validate_bank_account(&b, None).into_iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::Length { min: 8, max: 11 }, Rule::NoSpace]);
    }

    #[test]
    fn test_required_with_rejects_missing_and_blank() {
        let mut out = Vec::new();
        check(&mut out, "bank_name", &None, Rule::RequiredWith("account_type"));
        check(&mut out, "account_number", &Some("  ".into()), Rule::RequiredWith("account_type"));
        check(&mut out, "account_holder_name", &Some("Jane".into()), Rule::RequiredWith("account_type"));
        let fields: Vec<_> = out.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["bank_name", "account_number"]);

        let mut out = Vec::new();
        check(&mut out, "swift_code", &None, Rule::NoSpace);
        assert!(out.is_empty());
    }

    #[test]
    fn test_format_violations() {
        let v = vec![
            Violation { field: "swift_code", rule: Rule::NoSpace },
            Violation { field: "bank_name", rule: Rule::RequiredWith("account_type") },
        ];
        assert_eq!(
            format_violations(&v),
            "swift_code must not contain whitespace; bank_name is required when account_type is set"
        );
    }
}

// ============================================================
// Layer 4b - Sender Features
// ============================================================
// Stateless features computed from the raw sender string:
//
//   1. Format category (one-hot over SenderCategory), e.g.
//        alice@corp.com                → MailOnly
//        "Smith, John" <js@corp.com>   → LastCommaFirst
//        Support Team <x@paypa1.biz>   → NameAngle
//   2. Address features: local/domain lengths, local-part
//      entropy, character flags, free-mail provider.
//
// Lengths are scaled with ln(1 + x) so they sit on the same
// order of magnitude as TF-IDF weights.

use lazy_static::lazy_static;
use ndarray::Array2;
use regex::Regex;
use std::collections::HashMap;

use crate::domain::email::EmailRecord;

lazy_static! {
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref EMAIL_ONLY_RE: Regex = Regex::new(r"(?i)^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PAREN_NAME_RE: Regex =
        Regex::new(r"(?i)^[^@\s]+@[^@\s]+\.[^@\s]+\s*\([^)]+\)\s*$").unwrap();
    static ref PAREN_EMPTY_RE: Regex =
        Regex::new(r"(?i)^[^@\s]+@[^@\s]+\.[^@\s]+\s*\(\s*\)\s*$").unwrap();
    static ref DISPLAY_ANGLE_RE: Regex =
        Regex::new(r"(?i)^(?P<disp>.*?)(?P<addr><\s*[^>]+@[^>]+\s*>)\s*$").unwrap();
    static ref ANGLE_INNER_RE: Regex = Regex::new(r"<\s*([^>]+)\s*>").unwrap();
    static ref QUOTED_NAME_ANGLE_RE: Regex =
        Regex::new(r#"(?i)^"\s*[^"]+\s*"\s*<[^>]+>$"#).unwrap();
    static ref LAST_COMMA_FIRST_RE: Regex =
        Regex::new(r#"(?i)^"?[^",<>]+,[^",<>]+"\s*<[^>]+>$"#).unwrap();
    static ref NAME_ANGLE_RE: Regex = Regex::new(
        r"^[A-Za-zÀ-ÖØ-öø-ÿ'`’\-\. ]+\s+[A-Za-zÀ-ÖØ-öø-ÿ'`’\-\. ]+\s*<[^>]+>$"
    ).unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
    static ref BRACKETS_RE: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
    static ref FAKE_DOMAIN_RE: Regex =
        Regex::new(r"(?i)(no\.hostname\.specified|localhost|example\.com)").unwrap();
}

const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com", "yahoo.com", "hotmail.com", "outlook.com", "aol.com", "icloud.com",
    "protonmail.com", "wanadoo.fr", "orange.fr", "laposte.net", "free.fr", "sfr.fr",
    "yandex.ru", "mail.ru", "zoho.com",
];

/// How the sender string is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderCategory {
    MailOnly,
    MailParenName,
    NameAngle,
    QuotedName,
    LastCommaFirst,
    UsernameAngle,
    DisplayAngle,
    MultiMails,
    MailEmptyParens,
    DoubleAt,
    MailWithBrackets,
    FakeDomain,
    Other,
    DisplayEmptyAngle,
    QuotedTextNoEmail,
}

impl SenderCategory {
    pub const ALL: [SenderCategory; 15] = [
        SenderCategory::MailOnly,
        SenderCategory::MailParenName,
        SenderCategory::NameAngle,
        SenderCategory::QuotedName,
        SenderCategory::LastCommaFirst,
        SenderCategory::UsernameAngle,
        SenderCategory::DisplayAngle,
        SenderCategory::MultiMails,
        SenderCategory::MailEmptyParens,
        SenderCategory::DoubleAt,
        SenderCategory::MailWithBrackets,
        SenderCategory::FakeDomain,
        SenderCategory::Other,
        SenderCategory::DisplayEmptyAngle,
        SenderCategory::QuotedTextNoEmail,
    ];

    fn position(self) -> usize {
        Self::ALL.iter().position(|&c| c == self).unwrap_or(0)
    }
}

/// 15 category flags followed by 10 address features.
pub const SENDER_FEATURE_COUNT: usize = 25;

fn normalize_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// (display name, address) when the sender contains `<addr@domain>`.
fn split_display_angle(s: &str) -> Option<(String, String)> {
    let caps = DISPLAY_ANGLE_RE.captures(s)?;
    let display = caps["disp"].trim().trim_matches(|c| c == '"' || c == ' ').to_string();
    let addr    = &caps["addr"];
    let email   = ANGLE_INNER_RE
        .captures(addr)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| addr.trim().to_string());
    Some((display, email))
}

pub fn classify_sender(raw: &str) -> SenderCategory {
    let s = normalize_ws(raw);
    if s.is_empty() {
        return SenderCategory::Other;
    }
    let at_count = s.matches('@').count();

    if s.contains(',') && at_count >= 2 {
        SenderCategory::MultiMails
    } else if PAREN_EMPTY_RE.is_match(&s) {
        SenderCategory::MailEmptyParens
    } else if PAREN_NAME_RE.is_match(&s) {
        SenderCategory::MailParenName
    } else if BRACKETS_RE.is_match(&s) {
        SenderCategory::MailWithBrackets
    } else if EMAIL_ONLY_RE.is_match(&s) {
        SenderCategory::MailOnly
    } else if at_count > 1 {
        SenderCategory::DoubleAt
    } else if FAKE_DOMAIN_RE.is_match(&s) {
        SenderCategory::FakeDomain
    } else if let Some((display, _)) = split_display_angle(&s) {
        if QUOTED_NAME_ANGLE_RE.is_match(&s) {
            SenderCategory::QuotedName
        } else if LAST_COMMA_FIRST_RE.is_match(&s) {
            SenderCategory::LastCommaFirst
        } else if NAME_ANGLE_RE.is_match(&s) {
            SenderCategory::NameAngle
        } else if USERNAME_RE.is_match(&display) && !display.contains(' ') {
            SenderCategory::UsernameAngle
        } else {
            SenderCategory::DisplayAngle
        }
    } else if s == "\"\" <>" || s == "\"\"<>" {
        SenderCategory::DisplayEmptyAngle
    } else if s.starts_with('"') && s.ends_with('"') && !s.contains('@') {
        SenderCategory::QuotedTextNoEmail
    } else {
        SenderCategory::Other
    }
}

fn shannon_entropy(s: &str) -> f32 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let n = s.chars().count() as f64;
    let mut counts: Vec<usize> = counts.into_values().collect();
    counts.sort_unstable();
    -counts
        .into_iter()
        .map(|c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum::<f64>() as f32
}

/// Feature vector for one sender string; all zeros when the record
/// has no sender.
pub fn sender_features(sender: Option<&str>) -> [f32; SENDER_FEATURE_COUNT] {
    let mut out = [0.0f32; SENDER_FEATURE_COUNT];
    let Some(raw) = sender else {
        return out;
    };
    out[classify_sender(raw).position()] = 1.0;

    let s = normalize_ws(raw);
    let email = match split_display_angle(&s) {
        Some((_, email)) => email,
        None if EMAIL_ONLY_RE.is_match(&s) => s.clone(),
        None => String::new(),
    };
    let (local, domain) = email.split_once('@').unwrap_or(("", ""));
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let base = SenderCategory::ALL.len();

    out[base]     = (local.chars().count() as f32).ln_1p();
    out[base + 1] = (domain.chars().count() as f32).ln_1p();
    out[base + 2] = shannon_entropy(local);
    out[base + 3] = flag(local.chars().any(|c| c.is_ascii_digit()));
    out[base + 4] = flag(local.contains('_'));
    out[base + 5] = flag(local.contains('.'));
    out[base + 6] = flag(local.contains('+'));
    out[base + 7] = flag(FREE_MAIL_DOMAINS.contains(&domain.to_lowercase().as_str()));
    out[base + 8] = flag(domain.chars().any(|c| c.is_ascii_digit()));
    out[base + 9] = flag(domain.contains('-'));
    out
}

/// One row of sender features per record.
pub fn sender_matrix(records: &[EmailRecord]) -> Array2<f32> {
    let mut m = Array2::<f32>::zeros((records.len(), SENDER_FEATURE_COUNT));
    for (i, record) in records.iter().enumerate() {
        for (j, v) in sender_features(record.sender()).iter().enumerate() {
            m[[i, j]] = *v;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(classify_sender("alice@corp.com"), SenderCategory::MailOnly);
        assert_eq!(classify_sender("alice@corp.com (Alice)"), SenderCategory::MailParenName);
        assert_eq!(classify_sender("alice@corp.com ( )"), SenderCategory::MailEmptyParens);
        assert_eq!(classify_sender("Smith, John\" <js@corp.com>"), SenderCategory::LastCommaFirst);
        assert_eq!(classify_sender("\"John Smith\" <js@corp.com>"), SenderCategory::QuotedName);
        // a fully quoted name wins over the comma form
        assert_eq!(classify_sender("\"Smith, John\" <js@corp.com>"), SenderCategory::QuotedName);
        assert_eq!(classify_sender("John Smith <js@corp.com>"), SenderCategory::NameAngle);
        assert_eq!(classify_sender("jsmith99 <js@corp.com>"), SenderCategory::UsernameAngle);
        assert_eq!(classify_sender("a@x.com, b@y.com"), SenderCategory::MultiMails);
        assert_eq!(classify_sender("root@localhost"), SenderCategory::FakeDomain);
        assert_eq!(classify_sender("\"\" <>"), SenderCategory::DisplayEmptyAngle);
        assert_eq!(classify_sender("\"Newsletter\""), SenderCategory::QuotedTextNoEmail);
        assert_eq!(classify_sender(""), SenderCategory::Other);
    }

    #[test]
    fn test_address_features() {
        let f = sender_features(Some("Win Big <lucky_winner7@gmail.com>"));
        let base = SenderCategory::ALL.len();
        assert!((f[base] - (13.0f32).ln_1p()).abs() < 1e-6);
        assert_eq!(f[base + 3], 1.0); // digit in local part
        assert_eq!(f[base + 4], 1.0); // underscore
        assert_eq!(f[base + 7], 1.0); // free mail
        assert_eq!(f[base + 9], 0.0); // no dash in domain
    }

    #[test]
    fn test_exactly_one_category_flag() {
        for s in ["bob@x.org", "Bob <bob@x.org>", "", "weird"] {
            let f = sender_features(Some(s));
            let flags: f32 = f[..SenderCategory::ALL.len()].iter().sum();
            assert_eq!(flags, 1.0, "{s}");
        }
    }

    #[test]
    fn test_missing_sender_is_the_zero_vector() {
        assert!(sender_features(None).iter().all(|&v| v == 0.0));
        // an empty but present sender still gets its category flag
        assert_eq!(sender_features(Some(""))[SenderCategory::Other.position()], 1.0);
    }

    #[test]
    fn test_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert!((shannon_entropy("ab") - 1.0).abs() < 1e-6);
    }
}

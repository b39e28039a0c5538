use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Minimum digits (and `+`) a normalized phone number must keep.
const MIN_PHONE_LEN: usize = 8;

/// Phone formats in precedence order: Pakistani mobile formats first, then
/// the generic Gulf format. The first pattern that matches wins, so the
/// order decides which country a number is attributed to.
const PHONE_PATTERNS: [&str; 5] = [
    r"(?:\+92|0092|92)?[-\s]?(3\d{2})[-\s]?(\d{7})",
    r"(0?3\d{2})[-\s]?(\d{7})",
    r"(0?3\d{2})\s?(\d{3}\s?\d{4})",
    r"(\(0?3\d{2}\))\s?(\d{7})",
    r"(?:\+971|00971|971)?[-\s]?(\d)[-\s]?(\d{3})[-\s]?(\d{4})",
];

struct Patterns {
    email: Regex,
    phones: Vec<Regex>,
    website: Regex,
    likes: Regex,
    followers: Regex,
    non_phone_chars: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    email: RegexBuilder::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b")
        .case_insensitive(true)
        .build()
        .expect("valid email regex"),
    phones: PHONE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid phone regex"))
        .collect(),
    website: Regex::new(r"(https?://[^\s]+|www\.[^\s]+)").expect("valid website regex"),
    likes: Regex::new(r"(?i)(\d+[,.]?\d*)\s*(likes|people\s+like\s+this)")
        .expect("valid likes regex"),
    followers: Regex::new(r"(?i)(\d+[,.]?\d*)\s*(followers|people\s+follow\s+this)")
        .expect("valid followers regex"),
    non_phone_chars: Regex::new(r"[^\d+]").expect("valid cleanup regex"),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Phone,
    Country,
    Website,
    Likes,
    Followers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    Pakistan,
    Uae,
    UsCanada,
    Unknown,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Pakistan => "Pakistan",
            Country::Uae => "UAE",
            Country::UsCanada => "US/Canada",
            Country::Unknown => "Unknown",
        }
    }
}

/// Every field the extractor knows about, pulled from one page's text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
    pub country: String,
    pub website: String,
    pub likes: i64,
    pub followers: i64,
}

impl ContactDetails {
    pub fn from_text(text: &str) -> Self {
        let phone = extract_phone(text);
        let country = match phone.is_empty() {
            true => String::new(),
            false => detect_country(&phone).as_str().to_string(),
        };

        ContactDetails {
            email: extract_email(text),
            phone,
            country,
            website: extract_website(text),
            likes: extract_count(text, Field::Likes),
            followers: extract_count(text, Field::Followers),
        }
    }
}

/// Single-field lookup. Misses come back as an empty string; counts as `"0"`.
pub fn extract(text: &str, field: Field) -> String {
    match field {
        Field::Email => extract_email(text),
        Field::Phone => extract_phone(text),
        Field::Country => ContactDetails::from_text(text).country,
        Field::Website => extract_website(text),
        Field::Likes | Field::Followers => extract_count(text, field).to_string(),
    }
}

pub fn extract_email(text: &str) -> String {
    PATTERNS
        .email
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn extract_phone(text: &str) -> String {
    PATTERNS
        .phones
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| {
            let digits: String = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|group| group.as_str())
                .collect();
            normalize_phone(&digits)
        })
        .unwrap_or_default()
}

/// Strips everything but digits and `+`; drops numbers shorter than 8.
pub fn normalize_phone(phone: &str) -> String {
    let cleaned = PATTERNS.non_phone_chars.replace_all(phone, "").to_string();
    match cleaned.len() >= MIN_PHONE_LEN {
        true => cleaned,
        false => String::new(),
    }
}

pub fn detect_country(phone: &str) -> Country {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.starts_with("92") {
        Country::Pakistan
    } else if digits.starts_with("971") {
        Country::Uae
    } else if digits.starts_with('1') {
        Country::UsCanada
    } else {
        Country::Unknown
    }
}

pub fn extract_website(text: &str) -> String {
    PATTERNS
        .website
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Likes/followers as an integer. Thousands separators are dropped; anything
/// that is still not a plain number becomes 0.
pub fn extract_count(text: &str, field: Field) -> i64 {
    let pattern = match field {
        Field::Likes => &PATTERNS.likes,
        Field::Followers => &PATTERNS.followers,
        _ => return 0,
    };

    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace(',', ""))
        .and_then(|digits| digits.parse::<i64>().ok())
        .unwrap_or(0)
}

//! Locale-aware number, currency and date formatting.
//!
//! Covers the locales templates use in practice; unknown tags fall back to
//! `en-US`.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::template::DateStyle;

/// Supported formatting locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    EnUs,
    EnGb,
    DeDe,
    FrFr,
}

const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const DE_MONTHS: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
    "Oktober", "November", "Dezember",
];
const FR_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];
const FR_MONTHS_SHORT: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];

fn weekday_name(locale: Locale, day: Weekday) -> &'static str {
    let idx = day.num_days_from_monday() as usize;
    match locale {
        Locale::EnUs | Locale::EnGb => [
            "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
        ][idx],
        Locale::DeDe => [
            "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag", "Sonntag",
        ][idx],
        Locale::FrFr => ["lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche"][idx],
    }
}

impl Locale {
    /// Resolve a BCP 47 tag such as `de-DE`, `de` or `en_GB`.
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
        let lang = tag.split('-').next().unwrap_or("");
        match (lang, tag.as_str()) {
            ("en", "en-gb") | ("en", "en-ie") | ("en", "en-au") | ("en", "en-nz") => Locale::EnGb,
            ("de", _) => Locale::DeDe,
            ("fr", _) => Locale::FrFr,
            _ => Locale::EnUs,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
        }
    }

    fn group_separator(&self) -> &'static str {
        match self {
            Locale::EnUs | Locale::EnGb => ",",
            Locale::DeDe => ".",
            Locale::FrFr => "\u{202f}",
        }
    }

    fn decimal_separator(&self) -> char {
        match self {
            Locale::EnUs | Locale::EnGb => '.',
            Locale::DeDe | Locale::FrFr => ',',
        }
    }

    /// Currency symbol follows the amount.
    fn symbol_after(&self) -> bool {
        matches!(self, Locale::DeDe | Locale::FrFr)
    }

    /// Group and localize an already-rounded decimal string like `1234.50`.
    fn localize_digits(&self, plain: &str) -> String {
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (plain, None),
        };
        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(self.group_separator());
            }
            grouped.push(c);
        }
        match frac_part {
            Some(f) if !f.is_empty() => format!("{}{}{}", grouped, self.decimal_separator(), f),
            _ => grouped,
        }
    }

    /// Decimal number with grouping. Without a precision, up to three
    /// fraction digits are kept and trailing zeros dropped.
    pub fn format_number(&self, n: f64, precision: Option<u32>) -> String {
        let plain = match precision {
            Some(p) => format!("{:.*}", p as usize, n.abs()),
            None => {
                let s = format!("{:.3}", n.abs());
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        };
        let body = self.localize_digits(&plain);
        if n < 0.0 && plain.chars().any(|c| c.is_ascii_digit() && c != '0') {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Currency amount with symbol placement and minor-unit digits for `code`.
    pub fn format_currency(&self, amount: f64, code: &str) -> String {
        let code = code.trim().to_ascii_uppercase();
        let (symbol, digits) = currency_symbol(&code);
        let plain = format!("{:.*}", digits, amount.abs());
        let body = self.localize_digits(&plain);
        let negative = amount < 0.0 && plain.chars().any(|c| c.is_ascii_digit() && c != '0');
        let sign = if negative { "-" } else { "" };

        if self.symbol_after() {
            format!("{}{}\u{a0}{}", sign, body, symbol)
        } else if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            format!("{}{}\u{a0}{}", sign, symbol, body)
        } else {
            format!("{}{}{}", sign, symbol, body)
        }
    }

    /// Calendar date in the given style.
    pub fn format_date(&self, date: NaiveDate, style: DateStyle) -> String {
        let (d, m, y) = (date.day(), date.month0() as usize, date.year());
        let weekday = weekday_name(*self, date.weekday());
        match (self, style) {
            (Locale::EnUs, DateStyle::Short) => format!("{}/{}/{:02}", m + 1, d, y.rem_euclid(100)),
            (Locale::EnUs, DateStyle::Medium) => format!("{} {}, {}", &EN_MONTHS[m][..3], d, y),
            (Locale::EnUs, DateStyle::Long) => format!("{} {}, {}", EN_MONTHS[m], d, y),
            (Locale::EnUs, DateStyle::Full) => format!("{}, {} {}, {}", weekday, EN_MONTHS[m], d, y),

            (Locale::EnGb, DateStyle::Short) => format!("{:02}/{:02}/{}", d, m + 1, y),
            (Locale::EnGb, DateStyle::Medium) => format!("{} {} {}", d, &EN_MONTHS[m][..3], y),
            (Locale::EnGb, DateStyle::Long) => format!("{} {} {}", d, EN_MONTHS[m], y),
            (Locale::EnGb, DateStyle::Full) => format!("{} {} {} {}", weekday, d, EN_MONTHS[m], y),

            (Locale::DeDe, DateStyle::Short) => format!("{:02}.{:02}.{:02}", d, m + 1, y.rem_euclid(100)),
            (Locale::DeDe, DateStyle::Medium) => format!("{:02}.{:02}.{}", d, m + 1, y),
            (Locale::DeDe, DateStyle::Long) => format!("{}. {} {}", d, DE_MONTHS[m], y),
            (Locale::DeDe, DateStyle::Full) => format!("{}, {}. {} {}", weekday, d, DE_MONTHS[m], y),

            (Locale::FrFr, DateStyle::Short) => format!("{:02}/{:02}/{}", d, m + 1, y),
            (Locale::FrFr, DateStyle::Medium) => format!("{} {} {}", d, FR_MONTHS_SHORT[m], y),
            (Locale::FrFr, DateStyle::Long) => format!("{} {} {}", d, FR_MONTHS[m], y),
            (Locale::FrFr, DateStyle::Full) => format!("{} {} {} {}", weekday, d, FR_MONTHS[m], y),
        }
    }
}

/// Display symbol and minor-unit digits for an ISO 4217 code.
fn currency_symbol(code: &str) -> (&str, usize) {
    match code {
        "USD" => ("$", 2),
        "EUR" => ("€", 2),
        "GBP" => ("£", 2),
        "JPY" => ("¥", 0),
        other => (other, 2),
    }
}

//! Request-scoped culture: parsing and number formatting.
//!
//! Every [`Request`](crate::Request) carries exactly one [`Locale`]. The
//! server seeds it from its configured default and the
//! [`QueryCulture`](crate::middleware::QueryCulture) stage may replace it for
//! that one request. There is no process-wide "current culture": two
//! concurrent requests asking for different cultures never see each other's.
//!
//! ```rust
//! use relais::Locale;
//!
//! let fr = Locale::parse("fr-fr").unwrap();
//! assert_eq!(fr.tag(), "fr-FR");
//! assert_eq!(fr.format_decimal(1234.5, 2), "1\u{202f}234,50");
//! ```

use std::fmt;

use crate::error::Error;

/// Separators used when rendering numbers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct NumberFormat {
    decimal: char,
    group: char,
}

const fn nf(decimal: char, group: char) -> NumberFormat {
    NumberFormat { decimal, group }
}

const NBSP: char = '\u{a0}';
const NNBSP: char = '\u{202f}';

// Conventions for tags with no entry below.
const DEFAULT_NUMBERS: NumberFormat = nf('.', ',');

// Per-language conventions. A well-formed tag whose language is missing here
// is still accepted and formats with `DEFAULT_NUMBERS`.
const LANGUAGES: &[(&str, NumberFormat)] = &[
    ("ar", nf('.', ',')),
    ("bg", nf(',', NBSP)),
    ("ca", nf(',', '.')),
    ("cs", nf(',', NBSP)),
    ("da", nf(',', '.')),
    ("de", nf(',', '.')),
    ("el", nf(',', '.')),
    ("en", nf('.', ',')),
    ("es", nf(',', '.')),
    ("fi", nf(',', NBSP)),
    ("fr", nf(',', NNBSP)),
    ("he", nf('.', ',')),
    ("hi", nf('.', ',')),
    ("hr", nf(',', '.')),
    ("hu", nf(',', NBSP)),
    ("id", nf(',', '.')),
    ("it", nf(',', '.')),
    ("ja", nf('.', ',')),
    ("ko", nf('.', ',')),
    ("ms", nf('.', ',')),
    ("nb", nf(',', NBSP)),
    ("nl", nf(',', '.')),
    ("pl", nf(',', NBSP)),
    ("pt", nf(',', NBSP)),
    ("ro", nf(',', '.')),
    ("ru", nf(',', NBSP)),
    ("sk", nf(',', NBSP)),
    ("sr", nf(',', '.')),
    ("sv", nf(',', NBSP)),
    ("th", nf('.', ',')),
    ("tr", nf(',', '.')),
    ("uk", nf(',', NBSP)),
    ("vi", nf(',', '.')),
    ("zh", nf('.', ',')),
];

// Regions that deviate from their language's default.
const REGIONAL: &[(&str, &str, NumberFormat)] = &[
    ("de", "AT", nf(',', NBSP)),
    ("de", "CH", nf('.', '\u{2019}')),
    ("es", "MX", nf('.', ',')),
    ("es", "US", nf('.', ',')),
    ("fr", "CA", nf(',', NBSP)),
    ("fr", "CH", nf(',', NNBSP)),
    ("it", "CH", nf('.', '\u{2019}')),
    ("pt", "BR", nf(',', '.')),
];

/// A validated culture identifier (`language[-Script][-REGION][-variant...]`)
/// and the number-formatting conventions that go with it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Locale {
    tag: String,
    numbers: NumberFormat,
}

impl Locale {
    /// The culture-neutral locale: `.` decimal separator, `,` grouping.
    /// Its tag is the empty string.
    pub fn invariant() -> Self {
        Self { tag: String::new(), numbers: DEFAULT_NUMBERS }
    }

    /// Parses a culture tag such as `fr-FR`, `en_gb`, `zh-Hant-TW` or
    /// `en-US-POSIX`.
    ///
    /// Separators may be `-` or `_`, subtags are matched case-insensitively
    /// and the result is canonicalised (variants are lower-cased). Any
    /// well-formed tag is accepted. Languages and regions relais has no
    /// conventions for format like [`Locale::invariant`].
    ///
    /// Fails with [`Error::UnknownLocale`] when a subtag is malformed, out of
    /// order or repeated, or when the tag uses extension or private-use
    /// singletons (`-u-`, `-x-`).
    pub fn parse(tag: &str) -> Result<Self, Error> {
        let unknown = || Error::UnknownLocale(tag.to_owned());
        let mut subtags = tag.trim().split(['-', '_']).peekable();

        let language = subtags
            .next()
            .filter(|s| (2..=3).contains(&s.len()) && is_alpha(s))
            .map(str::to_ascii_lowercase)
            .ok_or_else(unknown)?;
        let script = subtags.next_if(|s| is_script(s)).map(|s| {
            let (head, tail) = s.split_at(1);
            head.to_ascii_uppercase() + &tail.to_ascii_lowercase()
        });
        let region = subtags.next_if(|s| is_region(s)).map(str::to_ascii_uppercase);

        let mut variants: Vec<String> = Vec::new();
        for subtag in subtags {
            let variant = subtag.to_ascii_lowercase();
            if !is_variant(subtag) || variants.contains(&variant) {
                return Err(unknown());
            }
            variants.push(variant);
        }

        let base = LANGUAGES
            .iter()
            .find(|(code, _)| *code == language)
            .map(|(_, numbers)| *numbers)
            .unwrap_or(DEFAULT_NUMBERS);
        let numbers = region
            .as_deref()
            .and_then(|r| {
                REGIONAL
                    .iter()
                    .find(|(lang, reg, _)| *lang == language && *reg == r)
                    .map(|(_, _, numbers)| *numbers)
            })
            .unwrap_or(base);

        let mut canonical = language;
        for part in script.iter().chain(region.iter()).chain(variants.iter()) {
            canonical.push('-');
            canonical.push_str(part);
        }

        Ok(Self { tag: canonical, numbers })
    }

    /// Canonical tag, e.g. `"fr-FR"`. Empty for [`Locale::invariant`].
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_invariant(&self) -> bool {
        self.tag.is_empty()
    }

    pub fn decimal_separator(&self) -> char {
        self.numbers.decimal
    }

    pub fn group_separator(&self) -> char {
        self.numbers.group
    }

    /// Renders an integer with digit grouping: `1234567` → `1,234,567` in `en-US`.
    pub fn format_integer(&self, value: i64) -> String {
        let grouped = self.group_digits(&value.unsigned_abs().to_string());
        if value < 0 { format!("-{grouped}") } else { grouped }
    }

    /// Renders `value` rounded to `fraction_digits` places with digit grouping
    /// and the locale's decimal separator.
    pub fn format_decimal(&self, value: f64, fraction_digits: usize) -> String {
        if value.is_nan() {
            return "NaN".to_owned();
        }
        if value.is_infinite() {
            return if value < 0.0 { "-\u{221e}" } else { "\u{221e}" }.to_owned();
        }

        let rendered = format!("{:.*}", fraction_digits, value.abs());
        let (whole, fraction) = rendered.split_once('.').unwrap_or((&rendered, ""));

        // `-0.00` is printed without its sign.
        let is_zero = rendered.bytes().all(|b| b == b'0' || b == b'.');
        let mut out = String::with_capacity(rendered.len() + whole.len() / 3 + 1);
        if value < 0.0 && !is_zero {
            out.push('-');
        }
        out.push_str(&self.group_digits(whole));
        if !fraction.is_empty() {
            out.push(self.numbers.decimal);
            out.push_str(fraction);
        }
        out
    }

    fn group_digits(&self, digits: &str) -> String {
        let len = digits.len();
        let mut out = String::with_capacity(len + len / 3 * self.numbers.group.len_utf8());
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(self.numbers.group);
            }
            out.push(ch);
        }
        out
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::invariant()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl std::str::FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_alpha(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_script(s: &str) -> bool {
    s.len() == 4 && is_alpha(s)
}

fn is_region(s: &str) -> bool {
    (s.len() == 2 && is_alpha(s)) || (s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()))
}

// `1996`, `posix`, `valencia`: 5-8 alphanumerics, or a digit and three more.
fn is_variant(s: &str) -> bool {
    let alnum = s.bytes().all(|b| b.is_ascii_alphanumeric());
    match s.len() {
        5..=8 => alnum,
        4 => alnum && s.as_bytes()[0].is_ascii_digit(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalises_tags() {
        assert_eq!(Locale::parse("fr-fr").unwrap().tag(), "fr-FR");
        assert_eq!(Locale::parse(" en_GB ").unwrap().tag(), "en-GB");
        assert_eq!(Locale::parse("ZH-hant-tw").unwrap().tag(), "zh-Hant-TW");
        assert_eq!(Locale::parse("es-419").unwrap().tag(), "es-419");
        assert_eq!(Locale::parse("de").unwrap().tag(), "de");
    }

    #[test]
    fn rejects_malformed_tags() {
        let malformed = [
            "not-a-locale", "", "   ", "x", "english", "fr-FRA", "fr-FR-FR", "en-",
            "xx-XX-XX-XX", "en-US-posix-posix", "en-x-private", "de-u-co-phonebk", "fr--FR",
        ];
        for bad in malformed {
            assert!(
                matches!(Locale::parse(bad), Err(Error::UnknownLocale(ref t)) if t == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_well_formed_cultures_without_a_table_entry() {
        let ca = Locale::parse("ca-ES").unwrap();
        assert_eq!(ca.tag(), "ca-ES");
        assert_eq!(ca.format_decimal(1234.5, 2), "1.234,50");

        let sr = Locale::parse("sr_latn_rs").unwrap();
        assert_eq!(sr.tag(), "sr-Latn-RS");
        assert_eq!(sr.decimal_separator(), ',');

        for tag in ["sk-SK", "bg-BG", "hr-HR", "fa-IR", "ms-MY", "xx-XX", "gsw-CH"] {
            assert!(Locale::parse(tag).is_ok(), "{tag:?} should be accepted");
        }
    }

    #[test]
    fn keeps_variants_in_the_tag() {
        let posix = Locale::parse("en-US-POSIX").unwrap();
        assert_eq!(posix.tag(), "en-US-posix");
        assert_eq!(posix.format_decimal(1234.5, 2), "1,234.50");
        assert_eq!(Locale::parse("de-DE-1996").unwrap().tag(), "de-DE-1996");
        assert_eq!(Locale::parse("ca-valencia").unwrap().tag(), "ca-valencia");
    }

    #[test]
    fn unlisted_languages_use_invariant_separators() {
        let fa = Locale::parse("fa-IR").unwrap();
        assert_eq!(fa.decimal_separator(), Locale::invariant().decimal_separator());
        assert_eq!(fa.group_separator(), Locale::invariant().group_separator());
        assert_eq!(fa.format_decimal(1234.5, 2), "1,234.50");
    }

    #[test]
    fn french_uses_comma_and_narrow_space() {
        let fr = Locale::parse("fr-FR").unwrap();
        assert_eq!(fr.decimal_separator(), ',');
        assert_eq!(fr.format_decimal(1234567.891, 2), "1\u{202f}234\u{202f}567,89");
        assert_eq!(fr.format_integer(-1000), "-1\u{202f}000");
    }

    #[test]
    fn regional_conventions_override_language() {
        let pt = Locale::parse("pt-PT").unwrap();
        let br = Locale::parse("pt-BR").unwrap();
        assert_eq!(pt.format_integer(1_000_000), "1\u{a0}000\u{a0}000");
        assert_eq!(br.format_integer(1_000_000), "1.000.000");
        assert_eq!(Locale::parse("de-CH").unwrap().format_decimal(1234.5, 1), "1\u{2019}234.5");
    }

    #[test]
    fn invariant_formatting() {
        let inv = Locale::invariant();
        assert!(inv.is_invariant());
        assert_eq!(inv.to_string(), "");
        assert_eq!(inv.format_decimal(1234.5, 2), "1,234.50");
        assert_eq!(inv.format_decimal(12.0, 0), "12");
        assert_eq!(inv.format_decimal(-0.001, 2), "0.00");
        assert_eq!(inv.format_decimal(-999.999, 1), "-1,000.0");
        assert_eq!(inv.format_integer(999), "999");
        assert_eq!(inv.format_decimal(f64::NAN, 2), "NaN");
    }
}

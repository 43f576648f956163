//! Number formatting for report output.
//!
//! Byte counts are shown as megabytes with two decimals. Separators follow the
//! locale environment the way C `printf` with `'` does: the `C`/`POSIX` locale
//! has no grouping, other locales use the separators of their language.

use crate::collector::procfs::parser::MB;

/// Digit grouping and decimal point applied to formatted numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    thousands_sep: Option<char>,
    decimal_point: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::plain()
    }
}

impl NumberFormat {
    /// No grouping (`C` locale).
    pub const fn plain() -> Self {
        Self::with_separators(None, '.')
    }

    /// Groups thousands with `,` (English locales).
    pub const fn grouped() -> Self {
        Self::with_separators(Some(','), '.')
    }

    pub const fn with_separators(thousands_sep: Option<char>, decimal_point: char) -> Self {
        Self {
            thousands_sep,
            decimal_point,
        }
    }

    /// Resolves separators from `LC_ALL`, `LC_NUMERIC` and `LANG`, in that order.
    pub fn from_env() -> Self {
        let locale = ["LC_ALL", "LC_NUMERIC", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty());
        Self::for_locale(locale.as_deref())
    }

    /// Separators for a locale name such as `de_DE.UTF-8`.
    ///
    /// Covers the common European conventions; any other locale gets the
    /// English `,` and `.`.
    pub fn for_locale(locale: Option<&str>) -> Self {
        let Some(name) = locale else {
            return Self::plain();
        };
        if name == "C" || name == "POSIX" || name.starts_with("C.") {
            return Self::plain();
        }

        // Strip `.codeset` and `@modifier`
        let base = name.split(['.', '@']).next().unwrap_or(name);
        let (language, territory) = base.split_once('_').unwrap_or((base, ""));

        match (language, territory) {
            ("de" | "it", "CH") => Self::with_separators(Some('\u{2019}'), '.'),
            ("de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" | "el", _) => {
                Self::with_separators(Some('.'), ',')
            }
            ("fr", _) => Self::with_separators(Some('\u{202f}'), ','),
            ("ru" | "uk" | "pl" | "cs" | "sk" | "sv" | "fi" | "nb" | "no", _) => {
                Self::with_separators(Some('\u{a0}'), ',')
            }
            _ => Self::grouped(),
        }
    }

    /// Formats an integer.
    pub fn integer(&self, value: u64) -> String {
        self.group(&value.to_string())
    }

    /// Formats a float with two decimals.
    pub fn decimal(&self, value: f64) -> String {
        self.group(&format!("{:.2}", value))
    }

    /// Formats a byte count as megabytes with two decimals.
    pub fn megabytes(&self, bytes: u64) -> String {
        self.decimal(bytes as f64 / MB as f64)
    }

    /// Formats a signed byte difference as megabytes, always carrying a sign.
    pub fn delta_megabytes(&self, delta: i64) -> String {
        let sign = if delta < 0 { '-' } else { '+' };
        format!("{}{}", sign, self.megabytes(delta.unsigned_abs()))
    }

    fn group(&self, digits: &str) -> String {
        let Some(sep) = self.thousands_sep else {
            return digits.replace('.', &self.decimal_point.to_string());
        };

        let (sign, unsigned) = match digits.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", digits),
        };
        let (int_part, frac_part) = match unsigned.find('.') {
            Some(pos) => unsigned.split_at(pos),
            None => (unsigned, ""),
        };

        let mut out = String::with_capacity(digits.len() + int_part.len() / 3);
        out.push_str(sign);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                out.push(sep);
            }
            out.push(ch);
        }
        if let Some(frac) = frac_part.strip_prefix('.') {
            out.push(self.decimal_point);
            out.push_str(frac);
        }
        out
    }
}

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::numbers;

/// Upper bound on fixed-point iterations. Each pass removes whole footnote
/// runs, so the loop normally settles after the second pass.
const MAX_PASSES: usize = 8;

/// Punctuation allowed to survive besides letters, digits and whitespace.
const ALLOWED_PUNCTUATION: &str = ".,?!-'\"()";

/// The two pause buckets every punctuation mark is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseClass {
    Sentence,
    Phrase,
}

impl PauseClass {
    pub fn of(ch: char) -> Option<Self> {
        match ch {
            '.' | '?' | '!' | ';' | '-' => Some(PauseClass::Sentence),
            ',' | ':' => Some(PauseClass::Phrase),
            _ => None,
        }
    }
}

static BRACKETED_FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]|\(\d+\)").unwrap());
static SUPERSCRIPT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{00B9}\u{00B2}\u{00B3}\u{2070}-\u{2079}]+").unwrap());
static INLINE_FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+\d{1,3})+(\s+\p{Lu})").unwrap());
static TRAILING_FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+\d{1,3})+\s*$").unwrap());
static ATTACHED_FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\p{L}"'])\d{1,3}([\s.,;:!?)]|$)"#).unwrap());

static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([$£€])\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?\b").unwrap()
});
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)(?:\.(\d+))?\s?%").unwrap());
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").unwrap());
static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").unwrap());
static UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d+(?:\.\d+)?)\s?(km|kg|cm|mm|mg|ml|lbs|lb|mph|kph|ft|oz|hrs|hr|mins|min|mi|sec)\b",
    )
    .unwrap()
});
static GROUPED_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,3}(?:,\d{3})+\b").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\.(\d+)\b").unwrap());

static TITLE_ABBREVIATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Dr|Mr|Mrs|Ms|Prof|St|Gen|Capt|Lt|Col|Sgt|Rev|Hon|Mt)\.").unwrap()
});
static TRAILING_ABBREVIATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Jr|Sr|etc|vs|approx)\.(\s*$|\s+\p{Lu})?").unwrap()
});
static LATIN_ABBREVIATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(e\.g|i\.e)\.").unwrap());

static DASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:[\u{2012}-\u{2015}\u{2E3A}\u{2E3B}]|-{2,})\s*").unwrap());
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}|\u{2026}").unwrap());
static ISOLATED_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+-\s+|^\s*-\s+").unwrap());
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\)").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,?!])").unwrap());
static PUNCT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,?!]{2,}").unwrap());
static LEADING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s.,?!]+").unwrap());

/// Cleans raw chapter text into something the synthesis engine can read
/// aloud. Pure and idempotent.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_pass(raw: &str) -> String {
    let text = normalize_quotes(raw);
    let text = remove_footnotes(&text);
    let text = expand_numbers(&text);
    let text = expand_abbreviations(&text);
    let text = fold_punctuation(&text);
    let text = strip_disallowed(&text);
    tidy(&text)
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' => '\'',
            '\u{2010}' | '\u{2011}' | '\u{2212}' => '-',
            other => other,
        })
        .collect()
}

fn remove_footnotes(text: &str) -> String {
    let text = BRACKETED_FOOTNOTE.replace_all(text, "");
    let text = SUPERSCRIPT_DIGITS.replace_all(&text, "");
    let text = INLINE_FOOTNOTE.replace_all(&text, "$1");
    let text = TRAILING_FOOTNOTE.replace_all(&text, "");
    ATTACHED_FOOTNOTE.replace_all(&text, "$1$2").into_owned()
}

fn expand_numbers(text: &str) -> String {
    let text = CURRENCY.replace_all(text, |caps: &Captures| {
        let (major, minor) = match &caps[1] {
            "£" => (("pound", "pounds"), ("penny", "pence")),
            "€" => (("euro", "euros"), ("cent", "cents")),
            _ => (("dollar", "dollars"), ("cent", "cents")),
        };
        let fraction = caps.get(3).map(|m| m.as_str());
        let whole = match numbers::parse_grouped(&caps[2]) {
            Some(whole) if fraction.map_or(true, |digits| digits.len() <= 2) => whole,
            // Amounts too large to count, or with more than two decimals,
            // are read digit by digit.
            _ => {
                let spoken = spoken_digits(&caps[2]);
                return match fraction {
                    Some(digits) => format!(
                        "{spoken} point {} {}",
                        numbers::digits_to_words(digits),
                        major.1
                    ),
                    None => format!("{spoken} {}", major.1),
                };
            }
        };
        let cents = fraction.map_or(0, |digits| {
            let value: u64 = digits.parse().unwrap_or(0);
            if digits.len() == 1 {
                value * 10
            } else {
                value
            }
        });
        match (whole, cents) {
            (0, 0) => numbers::amount(0, major.0, major.1),
            (0, cents) => numbers::amount(cents, minor.0, minor.1),
            (whole, 0) => numbers::amount(whole, major.0, major.1),
            (whole, cents) => format!(
                "{} and {}",
                numbers::amount(whole, major.0, major.1),
                numbers::amount(cents, minor.0, minor.1)
            ),
        }
    });

    let text = PERCENTAGE.replace_all(&text, |caps: &Captures| {
        let whole = spoken_digits(&caps[1]);
        match caps.get(2) {
            Some(fraction) => format!(
                "{whole} point {} percent",
                numbers::digits_to_words(fraction.as_str())
            ),
            None => format!("{whole} percent"),
        }
    });

    let text = ISO_DATE.replace_all(&text, |caps: &Captures| {
        spoken_date(&caps[2], &caps[3], &caps[1]).unwrap_or_else(|| caps[0].replace('-', " "))
    });
    let text = SLASH_DATE.replace_all(&text, |caps: &Captures| {
        spoken_date(&caps[1], &caps[2], &caps[3]).unwrap_or_else(|| caps[0].replace('/', " "))
    });

    let text = CLOCK_TIME.replace_all(&text, |caps: &Captures| {
        let hour: u64 = caps[1].parse().unwrap_or(u64::MAX);
        let minute: u64 = caps[2].parse().unwrap_or(u64::MAX);
        let second: u64 = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(u64::MAX));
        if hour >= 24 || minute >= 60 || second >= 60 {
            return caps[0].to_string();
        }
        let clock = match minute {
            0 => format!("{} o'clock", numbers::to_words(hour)),
            m if m < 10 => format!("{} oh {}", numbers::to_words(hour), numbers::to_words(m)),
            m => format!("{} {}", numbers::to_words(hour), numbers::to_words(m)),
        };
        match second {
            0 => clock,
            s => format!("{clock} and {}", numbers::amount(s, "second", "seconds")),
        }
    });

    let text = UNIT.replace_all(&text, |caps: &Captures| {
        let quantity = &caps[1];
        let singular = quantity == "1";
        let unit = match (&caps[2], singular) {
            ("km", true) => "kilometer",
            ("km", false) => "kilometers",
            ("kg", true) => "kilogram",
            ("kg", false) => "kilograms",
            ("cm", true) => "centimeter",
            ("cm", false) => "centimeters",
            ("mm", true) => "millimeter",
            ("mm", false) => "millimeters",
            ("mg", true) => "milligram",
            ("mg", false) => "milligrams",
            ("ml", true) => "milliliter",
            ("ml", false) => "milliliters",
            ("lb" | "lbs", true) => "pound",
            ("lb" | "lbs", false) => "pounds",
            ("mph", _) => "miles per hour",
            ("kph", _) => "kilometers per hour",
            ("ft", true) => "foot",
            ("ft", false) => "feet",
            ("oz", true) => "ounce",
            ("oz", false) => "ounces",
            ("hr" | "hrs", true) => "hour",
            ("hr" | "hrs", false) => "hours",
            ("min" | "mins", true) => "minute",
            ("min" | "mins", false) => "minutes",
            ("mi", true) => "mile",
            ("mi", false) => "miles",
            ("sec", true) => "second",
            _ => "seconds",
        };
        format!("{quantity} {unit}")
    });

    let text = GROUPED_NUMBER.replace_all(&text, |caps: &Captures| {
        numbers::parse_grouped(&caps[0])
            .map(numbers::to_words)
            .unwrap_or_else(|| caps[0].replace(',', ""))
    });

    DECIMAL
        .replace_all(&text, |caps: &Captures| match caps[1].parse::<u64>() {
            Ok(whole) => format!(
                "{} point {}",
                numbers::to_words(whole),
                numbers::digits_to_words(&caps[2])
            ),
            Err(_) => format!(
                "{} point {}",
                numbers::digits_to_words(&caps[1]),
                numbers::digits_to_words(&caps[2])
            ),
        })
        .into_owned()
}

/// Whole-number words, or digit-by-digit reading when the value does not fit
/// a `u64`.
fn spoken_digits(digits: &str) -> String {
    match numbers::parse_grouped(digits) {
        Some(value) => numbers::to_words(value),
        None => numbers::digits_to_words(digits),
    }
}

/// Month-first date, e.g. `("1", "2", "2020")` -> "January 2nd 2020".
fn spoken_date(month: &str, day: &str, year: &str) -> Option<String> {
    let month = numbers::month_name(month.parse().ok()?)?;
    let day: u32 = day.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let year = match year.len() {
        2 => {
            let short: u32 = year.parse().ok()?;
            if short < 50 {
                2000 + short
            } else {
                1900 + short
            }
        }
        _ => year.parse().ok()?,
    };
    Some(format!("{month} {} {year}", numbers::ordinal_digits(day)))
}

fn expand_abbreviations(text: &str) -> String {
    let text = TITLE_ABBREVIATION.replace_all(text, |caps: &Captures| {
        match &caps[1] {
            "Dr" => "Doctor",
            "Mr" => "Mister",
            "Mrs" => "Missus",
            "Ms" => "Miz",
            "Prof" => "Professor",
            "St" => "Saint",
            "Gen" => "General",
            "Capt" => "Captain",
            "Lt" => "Lieutenant",
            "Col" => "Colonel",
            "Sgt" => "Sergeant",
            "Rev" => "Reverend",
            "Hon" => "Honorable",
            _ => "Mount",
        }
        .to_string()
    });

    // These often close a sentence; the period is kept when the text ends or
    // a capitalised word follows.
    let text = TRAILING_ABBREVIATION.replace_all(&text, |caps: &Captures| {
        let word = match &caps[1] {
            "Jr" => "Junior",
            "Sr" => "Senior",
            "etc" => "et cetera",
            "vs" => "versus",
            _ => "approximately",
        };
        match caps.get(2) {
            Some(tail) => format!("{word}.{}", tail.as_str()),
            None => word.to_string(),
        }
    });

    LATIN_ABBREVIATION
        .replace_all(&text, |caps: &Captures| {
            if &caps[1] == "e.g" {
                "for example"
            } else {
                "that is"
            }
            .to_string()
        })
        .into_owned()
}

fn fold_punctuation(text: &str) -> String {
    let text = text.replace('&', " and ");
    let text = DASHES.replace_all(&text, ", ");
    let text = ELLIPSIS.replace_all(&text, ".");
    text.chars()
        .map(|ch| match ch {
            ':' => ',',
            ';' => '.',
            '/' | '\\' | '|' | '_' => ' ',
            other => other,
        })
        .collect()
}

fn strip_disallowed(text: &str) -> String {
    text.chars()
        .filter(|ch| {
            ch.is_alphanumeric() || ch.is_whitespace() || ALLOWED_PUNCTUATION.contains(*ch)
        })
        .collect()
}

fn tidy(text: &str) -> String {
    let text = ISOLATED_HYPHEN.replace_all(text, ". ");
    let text = EMPTY_PARENS.replace_all(&text, "");
    let text = remove_orphaned_quotes(&text);
    let text = WHITESPACE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(text.trim(), "$1");
    let text = PUNCT_RUN.replace_all(&text, |caps: &Captures| {
        let run = &caps[0];
        if run.contains('?') {
            "?"
        } else if run.contains('!') {
            "!"
        } else if run.contains('.') {
            "."
        } else {
            ","
        }
        .to_string()
    });
    let text = LEADING_PUNCT.replace(&text, "");
    text.trim().to_string()
}

/// Drops quote marks that touch no word on either side.
fn remove_orphaned_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    for (idx, &ch) in chars.iter().enumerate() {
        if ch == '"' || ch == '\'' {
            let before = idx
                .checked_sub(1)
                .and_then(|i| chars.get(i))
                .is_some_and(|c| c.is_alphanumeric());
            let after = chars.get(idx + 1).is_some_and(|c| c.is_alphanumeric());
            if !before && !after {
                continue;
            }
        }
        output.push(ch);
    }
    output
}

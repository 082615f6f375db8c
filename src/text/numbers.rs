//! Spoken-word rendering of numbers, used by the normalizer.

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "quintillion"),
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `1234` -> "one thousand two hundred thirty-four".
pub fn to_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut remaining = n;
    for (scale, name) in SCALES {
        if remaining >= scale {
            parts.push(format!("{} {name}", below_thousand(remaining / scale)));
            remaining %= scale;
        }
    }
    if remaining > 0 {
        parts.push(below_thousand(remaining));
    }
    parts.join(" ")
}

fn below_thousand(n: u64) -> String {
    debug_assert!(n < 1000);
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, rest) => below_hundred(rest),
        (h, 0) => format!("{} hundred", ONES[h as usize]),
        (h, rest) => format!("{} hundred {}", ONES[h as usize], below_hundred(rest)),
    }
}

fn below_hundred(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    let tens = TENS[(n / 10) as usize];
    match n % 10 {
        0 => tens.to_string(),
        one => format!("{tens}-{}", ONES[one as usize]),
    }
}

/// Reads each digit separately, as in "three point one four".
pub fn digits_to_words(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a digit string that may carry thousands separators.
pub fn parse_grouped(digits: &str) -> Option<u64> {
    digits.replace(',', "").parse().ok()
}

/// `2` -> "2nd", `11` -> "11th", `23` -> "23rd".
pub fn ordinal_digits(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

pub fn month_name(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTHS[(month - 1) as usize]),
        _ => None,
    }
}

/// Pluralised amount, e.g. `(1, "dollar", "dollars")` -> "one dollar".
pub fn amount(n: u64, singular: &str, plural: &str) -> String {
    let unit = if n == 1 { singular } else { plural };
    format!("{} {unit}", to_words(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_cardinals() {
        assert_eq!(to_words(0), "zero");
        assert_eq!(to_words(5), "five");
        assert_eq!(to_words(99), "ninety-nine");
        assert_eq!(to_words(100), "one hundred");
        assert_eq!(to_words(1_250), "one thousand two hundred fifty");
        assert_eq!(
            to_words(3_000_017),
            "three million seventeen"
        );
    }

    #[test]
    fn renders_ordinal_suffixes() {
        assert_eq!(ordinal_digits(1), "1st");
        assert_eq!(ordinal_digits(2), "2nd");
        assert_eq!(ordinal_digits(3), "3rd");
        assert_eq!(ordinal_digits(11), "11th");
        assert_eq!(ordinal_digits(12), "12th");
        assert_eq!(ordinal_digits(22), "22nd");
        assert_eq!(ordinal_digits(31), "31st");
    }

    #[test]
    fn months_are_one_based() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(13), None);
        assert_eq!(month_name(0), None);
    }

    #[test]
    fn reads_digits_individually() {
        assert_eq!(digits_to_words("14"), "one four");
        assert_eq!(amount(1, "cent", "cents"), "one cent");
        assert_eq!(amount(2, "cent", "cents"), "two cents");
    }
}

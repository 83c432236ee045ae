// src/extractors/metadata.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// --- Constants ---
// Each field scans its own window of non-empty lines, counted from the top of
// the document. A match for one field never narrows the window of another.
const TYPE_WINDOW: usize = 5;
const NUMBER_WINDOW: usize = 5;
const DATE_WINDOW: usize = 5;
const YEAR_FALLBACK_WINDOW: usize = 10;
const COUNTERPARTY_WINDOW: usize = 20;

/// Uppercase heading keyword ("contract/agreement") that marks the title line.
pub const CONTRACT_HEADING: &str = "ДОГОВОР";

// --- Regex Patterns (Lazy Static) ---

// Contract type cleanup
static NUMBER_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"№\s*\S+").expect("Failed to compile NUMBER_SEGMENT_RE")
});

static GENITIVE_AGREEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bдоговора\b").expect("Failed to compile GENITIVE_AGREEMENT_RE")
});

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Zа-яА-ЯёЁ0-9\s]").expect("Failed to compile NON_WORD_RE")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RE")
});

static UNDERSCORES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_+").expect("Failed to compile UNDERSCORES_RE")
});

// A heading continuation line must not look like the number/date line.
static CONTINUATION_STOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)№|\d{4}|г\.|год").expect("Failed to compile CONTINUATION_STOP_RE")
});

// Contract number, tried in order on every line
static NUMBER_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)№\s*([^\s,]+)",
        r"(?i)номер[:\s]*([^\s,]+)",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static NUMBER_JUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Zа-яА-ЯёЁ0-9/\-]").expect("Failed to compile NUMBER_JUNK_RE")
});

/// How the three capture groups of a date pattern are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateLayout {
    /// day, genitive month name, year
    DayMonthNameYear,
    /// day, month, year
    DayMonthYear,
    /// year, month, day
    YearMonthDay,
}

struct DatePattern {
    regex: Regex,
    layout: DateLayout,
}

// Full dates, in priority order. The first line+pattern combination wins.
static DATE_PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    [
        (r"«(\d{1,2})»\s*([а-яё]+)\s*(\d{4})", DateLayout::DayMonthNameYear),
        (r#""(\d{1,2})"\s*([а-яё]+)\s*(\d{4})"#, DateLayout::DayMonthNameYear),
        (r"(\d{1,2})\s*([а-яё]+)\s*(\d{4})", DateLayout::DayMonthNameYear),
        (r"(\d{1,2})\.(\d{1,2})\.(\d{4})", DateLayout::DayMonthYear),
        (r"(\d{1,2})/(\d{1,2})/(\d{4})", DateLayout::DayMonthYear),
        (r"(\d{4})[-–](\d{1,2})[-–](\d{1,2})", DateLayout::YearMonthDay),
        (r"(\d{1,2})[-–](\d{1,2})[-–](\d{4})", DateLayout::DayMonthYear),
    ]
    .into_iter()
    .filter_map(|(pat, layout)| {
        Regex::new(&format!("(?i){}", pat))
            .ok()
            .map(|regex| DatePattern { regex, layout })
    })
    .collect()
});

static YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(20\d{2})\b").expect("Failed to compile YEAR_RE")
});

// Genitive month names as they appear in «5» марта 2023.
static MONTHS: [(&str, &str); 12] = [
    ("января", "01"),
    ("февраля", "02"),
    ("марта", "03"),
    ("апреля", "04"),
    ("мая", "05"),
    ("июня", "06"),
    ("июля", "07"),
    ("августа", "08"),
    ("сентября", "09"),
    ("октября", "10"),
    ("ноября", "11"),
    ("декабря", "12"),
];

// Counterparty forms, in priority order.
static COUNTERPARTY_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Legal entities with a quoted name
        r#"(?i)Общество с ограниченной ответственностью\s*[«"]([^»"]+)[»"]"#,
        r#"(?i)\bООО\s*[«"]([^»"]+)[»"]"#,
        // Unanchored on purpose: also covers ПАО, ОАО and НАО
        r#"(?i)АО\s*[«"]([^»"]+)[»"]"#,
        r#"(?i)\bЗАО\s*[«"]([^»"]+)[»"]"#,
        // Individual entrepreneurs
        r"(?i)индивидуальный предприниматель\s+([^,]+)",
        r"(?i)\bИП\s+([^,]+)",
        // Private persons
        r"(?i)Гражданин Российской Федерации\s+([^,]+)",
        r"(?i)Гражданка Российской Федерации\s+([^,]+)",
        r#"(?i)Компания\s*[«"]([^»"]+)[»"]"#,
        // Generic party labels
        r"(?i)Покупатель[:\s]*([^,]+)",
        r"(?i)Продавец[:\s]*([^,]+)",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static NAME_UNSAFE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[«»"'“”„\\/:*?<>|\s\p{Cc}]"#).expect("Failed to compile NAME_UNSAFE_RE")
});

// --- Data Structures ---

/// Best-effort metadata recovered from the top of a contract.
///
/// Every field is either empty or a token that can be embedded in a file
/// name as-is. Fields are only readable: the record is built once by
/// [`extract`] and never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractMetadata {
    #[serde(rename = "type")]
    contract_type: String,
    counterparty: String,
    date: String,
    number: String,
}

impl ContractMetadata {
    pub fn contract_type(&self) -> &str {
        &self.contract_type
    }

    pub fn counterparty(&self) -> &str {
        &self.counterparty
    }

    /// `YYYY-MM-DD`, a bare `YYYY`, or empty.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// True when nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        self.contract_type.is_empty()
            && self.counterparty.is_empty()
            && self.date.is_empty()
            && self.number.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(contract_type: &str, counterparty: &str, date: &str, number: &str) -> Self {
        Self {
            contract_type: contract_type.to_string(),
            counterparty: counterparty.to_string(),
            date: date.to_string(),
            number: number.to_string(),
        }
    }
}

// --- Extraction ---

/// Extracts type, counterparty, date and number from recovered document text.
///
/// Never fails: a field that no pattern recognizes simply stays empty.
pub fn extract(text: &str) -> ContractMetadata {
    let lines = document_lines(text);

    let metadata = ContractMetadata {
        contract_type: extract_type(&lines),
        counterparty: extract_counterparty(&lines),
        date: extract_date(&lines),
        number: extract_number(&lines),
    };
    tracing::debug!("Extracted metadata: {:?}", metadata);
    metadata
}

/// Trimmed, non-empty lines in document order.
fn document_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn extract_type(lines: &[&str]) -> String {
    let Some(index) = lines
        .iter()
        .take(TYPE_WINDOW)
        .position(|line| line.contains(CONTRACT_HEADING))
    else {
        return String::new();
    };

    let heading = NUMBER_SEGMENT_RE.replace_all(lines[index], "");
    let heading = GENITIVE_AGREEMENT_RE.replace_all(&heading, "");
    let mut contract_type = underscore_words(&heading);

    // "ДОГОВОР" alone: the kind of contract is usually on the next line.
    if contract_type == CONTRACT_HEADING {
        if let Some(next) = lines.get(index + 1) {
            if !CONTINUATION_STOP_RE.is_match(next) {
                let tail = underscore_words(next);
                if !tail.is_empty() {
                    tracing::trace!("Heading continues on next line: '{}'", next);
                    contract_type.push('_');
                    contract_type.push_str(&tail);
                }
            }
        }
    }

    contract_type
}

/// Keeps letters, digits and whitespace, then joins the words with `_`.
fn underscore_words(line: &str) -> String {
    let kept = NON_WORD_RE.replace_all(line, "");
    let joined = WHITESPACE_RE.replace_all(kept.trim(), "_");
    collapse_underscores(&joined)
}

fn collapse_underscores(value: &str) -> String {
    UNDERSCORES_RE
        .replace_all(value, "_")
        .trim_matches('_')
        .to_string()
}

fn extract_number(lines: &[&str]) -> String {
    for line in lines.iter().take(NUMBER_WINDOW) {
        for re in NUMBER_RE.iter() {
            let Some(caps) = re.captures(line) else { continue };
            // A slash would read as a path separator once the number is in a file name.
            let number = NUMBER_JUNK_RE
                .replace_all(caps[1].trim(), "")
                .replace('/', "-");
            if !number.is_empty() {
                return number;
            }
        }
    }
    String::new()
}

fn extract_date(lines: &[&str]) -> String {
    for line in lines.iter().take(DATE_WINDOW) {
        for pattern in DATE_PATTERNS.iter() {
            if let Some(date) = match_date(pattern, line) {
                tracing::trace!("Date pattern {:?} matched '{}'", pattern.layout, line);
                return date;
            }
        }
    }

    lines
        .iter()
        .take(YEAR_FALLBACK_WINDOW)
        .find_map(|line| YEAR_RE.captures(line).map(|caps| caps[1].to_string()))
        .unwrap_or_default()
}

fn match_date(pattern: &DatePattern, line: &str) -> Option<String> {
    match pattern.layout {
        // An unknown month word means this was not a date after all.
        DateLayout::DayMonthNameYear => pattern.regex.captures_iter(line).find_map(|caps| {
            let month = month_number(&caps[2])?;
            Some(format!("{}-{}-{:0>2}", &caps[3], month, &caps[1]))
        }),
        DateLayout::DayMonthYear => pattern
            .regex
            .captures(line)
            .map(|caps| format!("{}-{:0>2}-{:0>2}", &caps[3], &caps[2], &caps[1])),
        DateLayout::YearMonthDay => pattern
            .regex
            .captures(line)
            .map(|caps| format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3])),
    }
}

fn month_number(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

fn extract_counterparty(lines: &[&str]) -> String {
    for line in lines.iter().take(COUNTERPARTY_WINDOW) {
        for re in COUNTERPARTY_RE.iter() {
            let Some(caps) = re.captures(line) else { continue };
            let name = NAME_UNSAFE_RE.replace_all(&caps[1], "_");
            let name = collapse_underscores(&name);
            if !name.is_empty() {
                return name;
            }
        }
    }
    String::new()
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const FILENAME_UNSAFE: &[char] = &['\\', '/', '*', '?', ':', '"', '\'', '<', '>', '|', '«', '»', ' ', '\t'];

    fn assert_filename_safe(metadata: &ContractMetadata) {
        for field in [
            metadata.contract_type(),
            metadata.counterparty(),
            metadata.date(),
            metadata.number(),
        ] {
            assert!(
                !field.contains(FILENAME_UNSAFE),
                "Field '{}' contains a character unsafe for file names",
                field
            );
        }
    }

    #[test]
    fn test_split_heading_appends_continuation() {
        let text = "ДОГОВОР № 123-А\nаренды нежилого помещения\nг. Москва «5» марта 2023 г.";
        let metadata = extract(text);
        assert_eq!(metadata.contract_type(), "ДОГОВОР_аренды_нежилого_помещения");
        assert_eq!(metadata.number(), "123-А");
        assert_eq!(metadata.date(), "2023-03-05");
    }

    #[test]
    fn test_heading_with_kind_on_same_line() {
        let metadata = extract("ДОГОВОР ПОСТАВКИ № 7\nг. Казань 01.12.2022");
        assert_eq!(metadata.contract_type(), "ДОГОВОР_ПОСТАВКИ");
        assert_eq!(metadata.number(), "7");
    }

    #[test]
    fn test_continuation_skipped_when_next_line_is_dated() {
        let metadata = extract("ДОГОВОР\nг. Москва 2023 год\nаренды");
        assert_eq!(metadata.contract_type(), "ДОГОВОР");
    }

    #[test]
    fn test_genitive_agreement_is_removed() {
        let metadata = extract("Дополнительное соглашение к ДОГОВОРУ, текст договора подряда ДОГОВОР");
        assert_eq!(
            metadata.contract_type(),
            "Дополнительное_соглашение_к_ДОГОВОРУ_текст_подряда_ДОГОВОР"
        );
    }

    #[test]
    fn test_heading_outside_first_five_lines_is_ignored() {
        let text = "a\nb\nc\nd\ne\nДОГОВОР ПОДРЯДА";
        assert_eq!(extract(text).contract_type(), "");
    }

    #[test]
    fn test_number_label_form() {
        let metadata = extract("Соглашение\nномер: 45/Б-2023, от 2023");
        assert_eq!(metadata.number(), "45-Б-2023");
    }

    #[test]
    fn test_number_falls_through_empty_token() {
        // "№ ," gives nothing usable, so the search moves on to the next line.
        let metadata = extract("№ ,\nномер 12");
        assert_eq!(metadata.number(), "12");
    }

    #[test]
    fn test_date_month_name_forms() {
        assert_eq!(extract("«5» марта 2023").date(), "2023-03-05");
        assert_eq!(extract("\"17\" Января 2021 г.").date(), "2021-01-17");
        assert_eq!(extract("г. Москва, 9 декабря 2020 года").date(), "2020-12-09");
    }

    #[test]
    fn test_date_numeric_forms() {
        assert_eq!(extract("01.12.2022").date(), "2022-12-01");
        assert_eq!(extract("дата 3/4/2019").date(), "2019-04-03");
        assert_eq!(extract("2024-5-6").date(), "2024-05-06");
        assert_eq!(extract("2024–11–30").date(), "2024-11-30");
        assert_eq!(extract("7-8-2018").date(), "2018-08-07");
    }

    #[test]
    fn test_date_first_line_wins_over_later_priority() {
        let metadata = extract("от 01.02.2020\n«5» марта 2023");
        assert_eq!(metadata.date(), "2020-02-01");
    }

    #[test]
    fn test_unknown_month_is_not_a_date() {
        // "12 от 2023" is not a date; the bare year is still found.
        assert_eq!(extract("№ 12 от 2023").date(), "2023");
    }

    #[test]
    fn test_year_fallback() {
        assert_eq!(extract("Договор аренды от 2021 года").date(), "2021");
        let late = "a\nb\nc\nd\ne\nf\nсрок до 2030\n";
        assert_eq!(extract(late).date(), "2030");
        let too_late = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\nсрок до 2030";
        assert_eq!(extract(too_late).date(), "");
    }

    #[test]
    fn test_counterparty_quoted_llc() {
        let metadata = extract("ООО «Ромашка», именуемое в дальнейшем Арендатор");
        assert_eq!(metadata.counterparty(), "Ромашка");
    }

    #[test]
    fn test_counterparty_forms() {
        assert_eq!(
            extract("Общество с ограниченной ответственностью \"Вектор Плюс\"").counterparty(),
            "Вектор_Плюс"
        );
        assert_eq!(
            extract("ЗАО «Стройинвест», в лице директора").counterparty(),
            "Стройинвест"
        );
        assert_eq!(
            extract("Индивидуальный предприниматель Иванов Иван Иванович, действующий").counterparty(),
            "Иванов_Иван_Иванович"
        );
        assert_eq!(
            extract("Гражданка Российской Федерации Петрова А.В., паспорт").counterparty(),
            "Петрова_А.В."
        );
        assert_eq!(extract("Покупатель: Сидоров П.П., с одной стороны").counterparty(), "Сидоров_П.П.");
    }

    #[test]
    fn test_counterparty_remaining_forms() {
        assert_eq!(extract("ИП Сергеев Олег Петрович, ОГРНИП 123").counterparty(), "Сергеев_Олег_Петрович");
        assert_eq!(
            extract("Гражданин Российской Федерации Кузнецов Николай, паспорт").counterparty(),
            "Кузнецов_Николай"
        );
        assert_eq!(extract("Компания «Global Trade» в лице").counterparty(), "Global_Trade");
        assert_eq!(extract("Продавец: Смирнова Е.К., с другой стороны").counterparty(), "Смирнова_Е.К.");
    }

    #[test]
    fn test_counterparty_joint_stock_prefixes() {
        assert_eq!(extract("ПАО «Сбербанк России», именуемое Банк").counterparty(), "Сбербанк_России");
        assert_eq!(extract("ОАО «РЖД», в лице начальника").counterparty(), "РЖД");
        assert_eq!(extract("НАО «Альфа», в лице директора").counterparty(), "Альфа");
    }

    #[test]
    fn test_counterparty_earlier_pattern_wins_on_same_line() {
        // The LLC form is tried before the buyer label.
        assert_eq!(extract("Покупатель: ООО «Икс», в лице директора").counterparty(), "Икс");
    }

    #[test]
    fn test_counterparty_abbreviation_needs_word_boundary() {
        // "ТИП " must not be read as an entrepreneur marker.
        let metadata = extract("ТИП ДОКУМЕНТА, внутренний\nАО «Север»");
        assert_eq!(metadata.counterparty(), "Север");
    }

    #[test]
    fn test_counterparty_window_is_twenty_lines() {
        let mut text = "строка\n".repeat(20);
        text.push_str("ООО «Поздно»");
        assert_eq!(extract(&text).counterparty(), "");
    }

    #[test]
    fn test_fields_are_independent() {
        let metadata = extract("Просто текст без реквизитов");
        assert!(metadata.is_empty());
        assert_eq!(extract(""), ContractMetadata::default());
    }

    #[test]
    fn test_extract_is_filename_safe() {
        let inputs = [
            "ДОГОВОР № 12/34*?\nООО «A/B:C*D?E<F>G|H\"», именуемое",
            "ДОГОВОР\n\"купли\" / продажи <товара>\nПродавец: Иван \\ \"Грозный\" | ООО",
            "номер: ../../etc/passwd\nПокупатель:  :::  Тест  ",
            "\t\r\n   \n",
        ];
        for input in inputs {
            assert_filename_safe(&extract(input));
        }
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "ДОГОВОР № 5\nпоставки\n«1» июня 2022\nООО «Альфа»";
        assert_eq!(extract(text), extract(text));
    }
}

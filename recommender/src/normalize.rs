use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Spaced-out capital runs ("И  В  А  Н  О  В"), an OCR artifact of scanned
    /// rulings. The run must end at a non-word character so that trailing
    /// lowercase text is never consumed.
    static ref CAP_SPACES: Regex =
        Regex::new(r"\s((?:[А-ЯЁ]\s+){2,}[А-ЯЁ])(\W)").expect("valid regex");

    /// Heading that opens the operative part of a ruling.
    static ref OPERATIVE_START: Regex =
        Regex::new(r"(?i)установил\s*:\s*\n?").expect("valid regex");

    /// Heading that opens the resolution part ("... решил:"), everything from
    /// here on is boilerplate for our purposes.
    static ref OPERATIVE_END: Regex =
        Regex::new(r"(?i)(?:\n|суд)\s*решил\s*:").expect("valid regex");

    /// Rulings issued in closed session must never enter a public index.
    static ref CLOSED_SESSION: Regex =
        Regex::new(r"(?i)закрытом\s+судебном\s+заседании").expect("valid regex");

    /// Newline runs that are page/paragraph artifacts rather than semantic
    /// breaks: the preceding character is a letter, digit, quote or bracket.
    static ref MID_SENTENCE_NEWLINE: Regex =
        Regex::new("([а-яА-ЯёЁ,\"«»()0-9])\\s*\n+").expect("valid regex");

    /// Monetary amounts: "1 000 000 руб. 50 коп.", "1000000,00 рублей" etc.
    static ref MONEY: Regex = Regex::new(
        r"\d[\d\s]+(?:[,.]\d\d\s*)?руб(?:\.|л[а-я]+)(?:\s+\d\d\s*коп(?:\.|[а-я]+))?",
    )
    .expect("valid regex");

    /// Legal-code names, replaced with their canonical abbreviations. Order is
    /// fixed; all patterns tolerate flexible internal whitespace and any case.
    static ref CODEX_RULES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(?i)арбитражн[а-я]*[\s\-]+процессуальн[а-я]*\s+кодекс[а-я]*").unwrap(),
            "АПК",
        ),
        (Regex::new(r"(?i)гражданск[а-я]*\s+кодекс[а-я]*").unwrap(), "ГК"),
        (Regex::new(r"(?i)налогов[а-я]*\s+кодекс[а-я]*").unwrap(), "НК"),
        (
            Regex::new(r"(?i)кодекс[а-я]*\s+административного\s+судопроизводства").unwrap(),
            "КАС",
        ),
        (
            Regex::new(r"(?i)кодекс[а-я]*\s+(?:об\s+)?административн[а-я]*\s+правонарушени[а-я]*")
                .unwrap(),
            "КоАП",
        ),
    ];

    /// Organization-form names to their abbreviations. The general "АО" rule
    /// must come after the more specific "ОАО"/"ЗАО"/"ПАО" rules it would
    /// otherwise shadow.
    static ref ORG_RULES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(?i)обществ[а-я]*\s+с\s+ограниченной\s+ответственностью").unwrap(),
            "ООО",
        ),
        (Regex::new(r"(?i)открыто[а-я]*\s+акционерно[а-я]*\s+обществ[а-я]*").unwrap(), "ОАО"),
        (Regex::new(r"(?i)закрыто[а-я]*\s+акционерно[а-я]*\s+обществ[а-я]*").unwrap(), "ЗАО"),
        (Regex::new(r"(?i)публично[а-я]*\s+акционерно[а-я]*\s+обществ[а-я]*").unwrap(), "ПАО"),
        (Regex::new(r"(?i)акционерно[а-я]*\s+обществ[а-я]*").unwrap(), "АО"),
    ];

    /// Quoted proper names «...» (no digits inside).
    static ref QUOTED_NAME: Regex = Regex::new("«[^»0-9]*»").expect("valid regex");
}

/// Tunable parts of the cleanup transform.
#[derive(Debug, Clone)]
pub struct NormalizePolicy {
    /// Digit runs at least this long are masked as NUM. Short numbers
    /// (statute and article references) carry meaning and stay literal.
    pub num_digit_threshold: u32,
    /// Rewrite organization-form names to abbreviations and quoted names
    /// to ORG.
    pub collapse_orgs: bool,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self { num_digit_threshold: 5, collapse_orgs: false }
    }
}

/// Rule-based cleanup applied to extracted ruling text before tokenization.
/// Pure: same input and policy always give the same output, and no step ever
/// fails — a rule that matches nothing is a no-op.
#[derive(Debug)]
pub struct Normalizer {
    policy: NormalizePolicy,
    num_re: Regex,
}

impl Normalizer {
    pub fn new(policy: NormalizePolicy) -> Self {
        let num_re = Regex::new(&format!(r"\d{{{},}}", policy.num_digit_threshold))
            .expect("valid regex");
        Self { policy, num_re }
    }

    pub fn policy(&self) -> &NormalizePolicy {
        &self.policy
    }

    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.trim();
        let text = fix_cap_spaces(text);
        let text = cut_operative_part(&text);
        let mut text = text.into_owned();
        for (re, abbr) in CODEX_RULES.iter() {
            text = re.replace_all(&text, *abbr).into_owned();
        }
        let text = MID_SENTENCE_NEWLINE.replace_all(&text, "$1 ");
        let text = MONEY.replace_all(&text, "SUM");
        let mut text = self.num_re.replace_all(&text, "NUM").into_owned();
        if self.policy.collapse_orgs {
            for (re, abbr) in ORG_RULES.iter() {
                text = re.replace_all(&text, *abbr).into_owned();
            }
            text = QUOTED_NAME.replace_all(&text, "ORG").into_owned();
        }
        text
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizePolicy::default())
    }
}

/// Whether the text contains the heading that opens the operative part.
/// Documents without it are malformed or irrelevant and are excluded from
/// the corpus.
pub fn has_operative_marker(text: &str) -> bool {
    OPERATIVE_START.is_match(text)
}

/// Whether the ruling was issued in closed session.
pub fn is_closed_session(text: &str) -> bool {
    CLOSED_SESSION.is_match(text)
}

fn fix_cap_spaces(text: &str) -> String {
    CAP_SPACES
        .replace_all(text, |caps: &regex::Captures| {
            let run: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
            format!(" {}{}", run, &caps[2])
        })
        .into_owned()
}

/// Keeps the operative part: after the first "установил:" heading and before
/// the first "решил:" heading. A missing start marker keeps the whole text, a
/// missing end marker keeps everything to the end.
fn cut_operative_part(text: &str) -> std::borrow::Cow<'_, str> {
    let start = OPERATIVE_START.find(text).map(|m| m.end()).unwrap_or(0);
    let end = OPERATIVE_END
        .find(&text[start..])
        .map(|m| start + m.start())
        .unwrap_or(text.len());
    std::borrow::Cow::Borrowed(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codex_names_are_abbreviated() {
        let n = Normalizer::default();
        let out = n.normalize("согласно Арбитражному    процессуальному кодексу РФ");
        assert!(out.contains("АПК"));
        let out = n.normalize("статья 10 Гражданского кодекса");
        assert!(out.contains("ГК"));
    }

    #[test]
    fn closed_session_marker_is_detected() {
        assert!(is_closed_session("рассмотрев в закрытом судебном заседании дело"));
        assert!(!is_closed_session("рассмотрев в открытом судебном заседании дело"));
    }
}

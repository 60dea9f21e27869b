use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};

pub const UA_MARKET_URL: &str = "https://icu.ua/research/market-reviews";
pub const US_MARKET_URL: &str =
    "https://www.blackrock.com/us/individual/insights/blackrock-investment-institute/weekly-commentary";
pub const GLOBAL_MARKET_URL: &str = "https://www.ib.barclays/our-insights/weekly-insights.html";
pub const ECB_MARKET_URL: &str =
    "https://www.ecb.europa.eu/press/economic-bulletin/html/index.en.html";

/// The ECB bulletin is quarterly; it is listed from this day of a quarter's first month.
const ECB_FIRST_DAY: u32 = 14;
const QUARTER_START_MONTHS: [u32; 4] = [1, 4, 7, 10];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Parses `name=url,name=url` into a list of sources. Blank input is an empty list.
pub fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    let Some(s) = s.filter(|v| !v.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    s.split(',')
        .map(|entry| {
            let entry = entry.trim();
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid source '{}': expected 'name=url'",
                    entry
                ))
            })?;
            Ok(Source::new(name.trim(), url.trim()))
        })
        .collect()
}

pub fn should_include_ecb(date: NaiveDate) -> bool {
    date.day() >= ECB_FIRST_DAY && QUARTER_START_MONTHS.contains(&date.month())
}

pub fn build_sources(date: NaiveDate, extra: &[Source]) -> Vec<Source> {
    let mut sources = vec![
        Source::new("Український ринок", UA_MARKET_URL),
        Source::new("Американський ринок", US_MARKET_URL),
        Source::new("Короткий огляд глобального ринку", GLOBAL_MARKET_URL),
    ];

    if should_include_ecb(date) {
        sources.push(Source::new(
            "Європейський ринок, квартальний огляд",
            ECB_MARKET_URL,
        ));
    }

    sources.extend(extra.iter().cloned());
    sources
}

pub const SYSTEM_PROMPT: &str = r#"Ти фінансовий аналітик.
Пиши чіткі, структуровані огляди українською мовою у форматі bullet list.
Використовуй простий, зрозумілий для читача текст, без перевантаження спеціальними термінами та аббревіатурами. Без всяких EM, UST, IG gilts, DM, тощо. Роби текст зрозумілим для читача не з фінансового сектору.
Секції: 'Головні події', 'Основні загрози / ризики', 'Ключові прогнози'.
Якщо є трохи цифр, будь ласка вкажи їх також, але не вигадуй нічого від себе. Не змінюй цифри, лише показуй їх."#;

const REPORT_STRUCTURE: &str = r#"найактуальніші фінансові звіти
найактуальніший щотижневий фінансовий звіт (Financial Weekly / Фінансовий тижневик) і зроби по ньому короткий звіт у вказаному форматі: Україна: ОВДП, євробонди, валютний ринок, стан економіки;
США: облігації, акції, стан економіки;
Європа: облігації, акції, стан економіки;
Світ: облігації, акції, стан економіки;
Інвестування з позиції українця, який хоче зберегти свої заощадження та хоче помірного зростання портфелю без ризиків, на 8%-12% річних, з диверсифікацією: облігації, акції, криптовалюти, реальний сектор, нерухомість."#;

pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

pub fn build_user_prompt(sources: &[Source]) -> String {
    let source_lines = sources
        .iter()
        .map(|s| format!("- {}: {}", s.name, s.url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Знайди на цих джерелах:\n{}\n{}",
        source_lines, REPORT_STRUCTURE
    )
}

pub const DEFAULT_LOCALE: &str = "de";

pub const LOCALES: [&str; 3] = ["de", "fr", "it"];

pub fn is_supported(locale: &str) -> bool {
    LOCALES.contains(&locale)
}

/// Root path of a locale: `/` for the default locale, `/{locale}/` otherwise.
pub fn locale_root(locale: &str) -> String {
    if locale == DEFAULT_LOCALE {
        "/".to_owned()
    } else {
        format!("/{locale}/")
    }
}

pub fn section_url(locale: &str, slug: &str) -> String {
    if locale == DEFAULT_LOCALE {
        format!("/{slug}")
    } else {
        format!("/{locale}/{slug}")
    }
}

/// Parses a comma separated locale list, keeping the input order and dropping
/// duplicates.
pub fn parse_locale_list(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut locales: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let locale = part.trim().to_ascii_lowercase();
        if locale.is_empty() {
            continue;
        }
        if !is_supported(&locale) {
            anyhow::bail!(
                "unsupported locale: {locale} (expected one of {})",
                LOCALES.join(", ")
            );
        }
        if !locales.contains(&locale) {
            locales.push(locale);
        }
    }
    if locales.is_empty() {
        anyhow::bail!("locale list is empty");
    }
    Ok(locales)
}

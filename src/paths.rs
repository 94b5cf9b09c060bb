use std::collections::BTreeMap;

use crate::formats::{PagePath, Section, SectionMappings};
use crate::mapping::slug_variants;

/// Static page paths for every section of the given locales.
///
/// The slug comes from the section mappings when the locale has a variant
/// there, otherwise from the section itself. Sections without a usable slug
/// are skipped.
pub fn generate_section_paths(
    sections_by_locale: &BTreeMap<String, Vec<Section>>,
    mappings: &SectionMappings,
    locales: &[String],
    include_locale_param: bool,
) -> Vec<PagePath> {
    let mut paths = Vec::new();

    for locale in locales {
        let Some(sections) = sections_by_locale.get(locale) else {
            tracing::debug!(locale = %locale, "no sections for locale");
            continue;
        };

        for section in sections {
            let section_id = section.id.to_string();
            let localized = slug_variants(&section_id, mappings)
                .into_iter()
                .find(|variant| &variant.locale == locale)
                .map(|variant| variant.slug);
            let slug = localized.unwrap_or_else(|| section.slug.clone());
            if slug.is_empty() {
                tracing::debug!(section_id = section.id, locale = %locale, "skipping section without slug");
                continue;
            }

            paths.push(PagePath {
                lang: include_locale_param.then(|| locale.clone()),
                slug,
                section_id: section.id,
                locale: locale.clone(),
            });
        }
    }

    tracing::info!(count = paths.len(), locales = %locales.join(", "), "generated page paths");
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::build_mappings;

    fn section(id: u64, locale: &str, slug: &str) -> Section {
        Section {
            id,
            title: slug.to_owned(),
            slug: slug.to_owned(),
            locale: locale.to_owned(),
            sorting: 1,
            chapters: Vec::new(),
        }
    }

    fn input() -> BTreeMap<String, Vec<Section>> {
        BTreeMap::from([
            (
                "de".to_owned(),
                vec![section(1, "de", "wolfsstufe"), section(2, "de", "")],
            ),
            ("fr".to_owned(), vec![section(1, "fr", "louveteaux")]),
        ])
    }

    #[test]
    fn paths_use_localized_slugs_and_skip_empty_ones() {
        let sections = input();
        let mappings = build_mappings(&sections);
        let locales = vec!["de".to_owned(), "fr".to_owned(), "it".to_owned()];

        let paths = generate_section_paths(&sections, &mappings.section_mappings, &locales, false);
        assert_eq!(
            paths,
            vec![
                PagePath {
                    lang: None,
                    slug: "wolfsstufe".to_owned(),
                    section_id: 1,
                    locale: "de".to_owned(),
                },
                PagePath {
                    lang: None,
                    slug: "louveteaux".to_owned(),
                    section_id: 1,
                    locale: "fr".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn locale_param_is_included_on_request() {
        let sections = input();
        let mappings = build_mappings(&sections);
        let locales = vec!["fr".to_owned()];

        let paths = generate_section_paths(&sections, &mappings.section_mappings, &locales, true);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].lang.as_deref(), Some("fr"));
    }
}

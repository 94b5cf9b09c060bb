use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::{MappingsArgs, ResolveArgs};
use crate::formats::{
    Chapter, ChapterMappings, Mappings, Section, SectionLink, SectionMappings, SectionRecord,
    SlugVariant,
};
use crate::locale::{LOCALES, locale_root, section_url};

/// Builds `mappings.json` from a `sections.json` holding raw CMS records per
/// locale.
pub fn run(args: MappingsArgs) -> anyhow::Result<()> {
    let sections_path = PathBuf::from(&args.sections);
    let out_path = PathBuf::from(&args.out);

    let records: BTreeMap<String, Vec<SectionRecord>> =
        crate::store::read_json(&sections_path).context("read sections")?;
    let sections_by_locale = records
        .into_iter()
        .map(|(locale, records)| {
            let sections = records
                .into_iter()
                .map(|record| Section::from_record(record, &locale))
                .collect::<Vec<_>>();
            (locale, sections)
        })
        .collect::<BTreeMap<_, _>>();

    let mappings = build_mappings(&sections_by_locale);
    crate::store::write_json(&out_path, &mappings, args.force).context("write mappings")?;

    tracing::info!(
        sections = mappings.section_mappings.len(),
        chapters = mappings.chapter_mappings.len(),
        out = %out_path.display(),
        "wrote mappings"
    );
    Ok(())
}

/// Prints the url of a section in a locale.
pub fn resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let mappings_path = PathBuf::from(&args.mappings);
    let mappings: Mappings = crate::store::read_json(&mappings_path).context("read mappings")?;
    println!(
        "{}",
        resolve_url(&args.section_id, &args.locale, &mappings.section_mappings)
    );
    Ok(())
}

/// Builds the section and chapter mapping tables for one set of fetched
/// sections.
///
/// Sections are grouped by `id` across locales. Chapters of two locale
/// variants of the same section are joined on `sorting`; a chapter without a
/// counterpart in some target locale simply has no entry for that locale.
pub fn build_mappings(sections_by_locale: &BTreeMap<String, Vec<Section>>) -> Mappings {
    let groups = group_sections_by_id(sections_by_locale);

    let mut section_mappings = SectionMappings::new();
    let mut chapter_mappings = ChapterMappings::new();

    for (id, group) in &groups {
        let entry = section_mappings.entry(id.to_string()).or_default();
        for (&locale, &section) in group {
            entry.insert(
                locale.clone(),
                SectionLink {
                    title: section.title.clone(),
                    slug: section.slug.clone(),
                    url: section_url(locale, &section.slug),
                },
            );
        }

        if group.len() < 2 {
            continue;
        }

        let index = SortingIndex::new(group);
        for (&from, &section) in group {
            for chapter in &section.chapters {
                for &to in group.keys().filter(|&&to| to != from) {
                    let Some(target) = index.get(to, chapter.sorting) else {
                        tracing::debug!(
                            section_id = id,
                            from = %from,
                            to = %to,
                            chapter = %chapter.slug,
                            sorting = chapter.sorting,
                            "no chapter with matching sorting"
                        );
                        continue;
                    };
                    chapter_mappings
                        .entry(chapter_key(from, &chapter.slug))
                        .or_default()
                        .insert(to.clone(), target.slug.clone());
                }
            }
        }
    }

    tracing::debug!(
        sections = section_mappings.len(),
        chapters = chapter_mappings.len(),
        "built mappings"
    );

    Mappings {
        section_mappings,
        chapter_mappings,
    }
}

/// Locale variants of one logical section, keyed by locale.
type SectionGroup<'a> = BTreeMap<&'a String, &'a Section>;

fn group_sections_by_id(
    sections_by_locale: &BTreeMap<String, Vec<Section>>,
) -> BTreeMap<u64, SectionGroup<'_>> {
    let mut groups: BTreeMap<u64, SectionGroup<'_>> = BTreeMap::new();
    for (locale, sections) in sections_by_locale {
        for section in sections {
            let group = groups.entry(section.id).or_default();
            if group.contains_key(locale) {
                tracing::debug!(
                    section_id = section.id,
                    locale = %locale,
                    "duplicate section id within locale; keeping the first"
                );
                continue;
            }
            group.insert(locale, section);
        }
    }
    groups
}

/// Join index over the chapters of one section group, keyed by
/// `(locale, sorting)`.
///
/// Duplicate `sorting` values within one section resolve to the chapter with
/// the lowest id.
struct SortingIndex<'a> {
    chapters: HashMap<(&'a str, i64), &'a Chapter>,
}

impl<'a> SortingIndex<'a> {
    fn new(group: &SectionGroup<'a>) -> Self {
        let mut chapters: HashMap<(&'a str, i64), &'a Chapter> = HashMap::new();
        for (&locale, &section) in group {
            for chapter in &section.chapters {
                chapters
                    .entry((locale.as_str(), chapter.sorting))
                    .and_modify(|current| {
                        if chapter.id < current.id {
                            *current = chapter;
                        }
                    })
                    .or_insert(chapter);
            }
        }
        Self { chapters }
    }

    fn get(&self, locale: &str, sorting: i64) -> Option<&'a Chapter> {
        self.chapters.get(&(locale, sorting)).copied()
    }
}

pub fn chapter_key(locale: &str, chapter_slug: &str) -> String {
    format!("{locale}_{chapter_slug}")
}

/// Url of a section in `target_locale`, falling back to the locale root when
/// the section is unknown there.
pub fn resolve_url(section_id: &str, target_locale: &str, mappings: &SectionMappings) -> String {
    mappings
        .get(section_id)
        .and_then(|by_locale| by_locale.get(target_locale))
        .map(|link| link.url.clone())
        .unwrap_or_else(|| locale_root(target_locale))
}

pub fn resolve_chapter_slug<'a>(
    locale: &str,
    chapter_slug: &str,
    target_locale: &str,
    mappings: &'a ChapterMappings,
) -> Option<&'a str> {
    mappings
        .get(&chapter_key(locale, chapter_slug))
        .and_then(|targets| targets.get(target_locale))
        .map(String::as_str)
}

pub fn slug_variants(section_id: &str, mappings: &SectionMappings) -> Vec<SlugVariant> {
    mappings
        .get(section_id)
        .map(|by_locale| {
            by_locale
                .iter()
                .map(|(locale, link)| SlugVariant {
                    locale: locale.clone(),
                    slug: link.slug.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Urls of a section for every supported locale, for language switchers.
pub fn alternate_urls(section_id: &str, mappings: &SectionMappings) -> Vec<(String, String)> {
    LOCALES
        .iter()
        .map(|locale| {
            (
                (*locale).to_owned(),
                resolve_url(section_id, locale, mappings),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: u64, slug: &str, sorting: i64) -> Chapter {
        Chapter {
            id,
            title: slug.to_owned(),
            slug: slug.to_owned(),
            sorting,
        }
    }

    fn section(id: u64, locale: &str, slug: &str, chapters: Vec<Chapter>) -> Section {
        Section {
            id,
            title: slug.to_owned(),
            slug: slug.to_owned(),
            locale: locale.to_owned(),
            sorting: id as i64,
            chapters,
        }
    }

    fn three_locales() -> BTreeMap<String, Vec<Section>> {
        BTreeMap::from([
            (
                "de".to_owned(),
                vec![
                    section(
                        1,
                        "de",
                        "wolfsstufe",
                        vec![chapter(10, "spiele", 1), chapter(11, "lager", 2)],
                    ),
                    section(2, "de", "pfadistufe", vec![]),
                ],
            ),
            (
                "fr".to_owned(),
                vec![section(
                    1,
                    "fr",
                    "louveteaux",
                    vec![chapter(20, "jeux", 1), chapter(21, "camp", 2)],
                )],
            ),
            (
                "it".to_owned(),
                vec![section(1, "it", "lupetti", vec![chapter(30, "giochi", 1)])],
            ),
        ])
    }

    #[test]
    fn section_mappings_cover_every_locale_of_a_group() {
        let mappings = build_mappings(&three_locales());

        let group = &mappings.section_mappings["1"];
        assert_eq!(group.len(), 3);
        assert_eq!(group["de"].url, "/wolfsstufe");
        assert_eq!(group["fr"].url, "/fr/louveteaux");
        assert_eq!(group["it"].url, "/it/lupetti");
        assert_eq!(group["fr"].title, "louveteaux");
    }

    #[test]
    fn single_locale_section_has_one_entry_and_no_chapter_keys() {
        let mappings = build_mappings(&three_locales());

        let group = &mappings.section_mappings["2"];
        assert_eq!(group.len(), 1);
        assert_eq!(group["de"].url, "/pfadistufe");
    }

    #[test]
    fn chapters_are_joined_on_sorting() {
        let mappings = build_mappings(&three_locales());
        let chapters = &mappings.chapter_mappings;

        assert_eq!(chapters["de_spiele"]["fr"], "jeux");
        assert_eq!(chapters["de_spiele"]["it"], "giochi");
        assert_eq!(chapters["fr_camp"]["de"], "lager");
        assert_eq!(chapters["it_giochi"]["de"], "spiele");
        assert_eq!(chapters["it_giochi"]["fr"], "jeux");
    }

    #[test]
    fn unmatched_sorting_omits_only_that_target() {
        let mappings = build_mappings(&three_locales());
        let lager = &mappings.chapter_mappings["de_lager"];

        assert_eq!(lager.get("fr").map(String::as_str), Some("camp"));
        assert!(!lager.contains_key("it"));
    }

    #[test]
    fn duplicate_sorting_resolves_to_lowest_chapter_id() {
        let input = BTreeMap::from([
            (
                "de".to_owned(),
                vec![section(1, "de", "a", vec![chapter(1, "eins", 5)])],
            ),
            (
                "fr".to_owned(),
                vec![section(
                    1,
                    "fr",
                    "a",
                    vec![chapter(9, "neuf", 5), chapter(3, "trois", 5)],
                )],
            ),
        ]);
        let mappings = build_mappings(&input);
        assert_eq!(mappings.chapter_mappings["de_eins"]["fr"], "trois");
    }

    #[test]
    fn empty_locale_still_maps_the_others() {
        let mut input = three_locales();
        input.insert("it".to_owned(), Vec::new());

        let mappings = build_mappings(&input);
        let group = &mappings.section_mappings["1"];
        assert_eq!(group.len(), 2);
        assert!(group.contains_key("de"));
        assert!(group.contains_key("fr"));
        assert_eq!(mappings.chapter_mappings["de_spiele"].len(), 1);
    }

    #[test]
    fn building_twice_yields_equal_tables() {
        let input = three_locales();
        assert_eq!(build_mappings(&input), build_mappings(&input));
    }

    #[test]
    fn resolve_url_falls_back_to_locale_root() {
        let mappings = build_mappings(&three_locales());
        let sections = &mappings.section_mappings;

        assert_eq!(resolve_url("1", "fr", sections), "/fr/louveteaux");
        assert_eq!(resolve_url("2", "fr", sections), "/fr/");
        assert_eq!(resolve_url("999", "de", sections), "/");
        assert_eq!(resolve_url("999", "it", sections), "/it/");
    }

    #[test]
    fn chapter_slug_lookup() {
        let mappings = build_mappings(&three_locales());
        let chapters = &mappings.chapter_mappings;

        assert_eq!(
            resolve_chapter_slug("de", "spiele", "it", chapters),
            Some("giochi")
        );
        assert_eq!(resolve_chapter_slug("de", "lager", "it", chapters), None);
        assert_eq!(resolve_chapter_slug("de", "spiele", "de", chapters), None);
    }

    #[test]
    fn slug_variants_and_alternates() {
        let mappings = build_mappings(&three_locales());
        let sections = &mappings.section_mappings;

        let variants = slug_variants("1", sections);
        assert_eq!(variants.len(), 3);
        assert!(slug_variants("404", sections).is_empty());

        let alternates = alternate_urls("2", sections);
        assert_eq!(
            alternates,
            vec![
                ("de".to_owned(), "/pfadistufe".to_owned()),
                ("fr".to_owned(), "/fr/".to_owned()),
                ("it".to_owned(), "/it/".to_owned()),
            ]
        );
    }
}

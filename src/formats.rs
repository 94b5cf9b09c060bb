use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::slug::slugify;

/// Section as returned by the CMS `sections` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: u64,
    pub title: String,
    pub sorting: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chapters: Vec<ChapterRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: u64,
    pub title: String,
    pub sorting: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub locale: String,
    pub sorting: i64,
    pub chapters: Vec<Chapter>,
}

impl Section {
    pub fn from_record(record: SectionRecord, locale: &str) -> Self {
        Self {
            id: record.id,
            slug: slugify(&record.title),
            title: record.title,
            locale: locale.to_owned(),
            sorting: record.sorting,
            chapters: record.chapters.into_iter().map(Chapter::from_record).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub sorting: i64,
}

impl Chapter {
    pub fn from_record(record: ChapterRecord) -> Self {
        Self {
            id: record.id,
            slug: slugify(&record.title),
            title: record.title,
            sorting: record.sorting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLink {
    pub title: String,
    pub slug: String,
    pub url: String,
}

/// Section id (string form) -> locale -> link.
pub type SectionMappings = BTreeMap<String, BTreeMap<String, SectionLink>>;

/// `{locale}_{chapter_slug}` -> target locale -> target chapter slug.
pub type ChapterMappings = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mappings {
    pub section_mappings: SectionMappings,
    pub chapter_mappings: ChapterMappings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugVariant {
    pub locale: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePath {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub slug: String,
    pub section_id: u64,
    pub locale: String,
}

/// One contiguous piece of rendered markdown.
///
/// Units that share a `group` came from the same paragraph and are meant to be
/// shown inside one wrapper region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderUnit {
    Html {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<usize>,
    },
    Quiz {
        source_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<usize>,
    },
}

impl RenderUnit {
    pub fn group(&self) -> Option<usize> {
        match self {
            Self::Html { group, .. } | Self::Quiz { group, .. } => *group,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

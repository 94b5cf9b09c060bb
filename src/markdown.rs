use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::formats::RenderUnit;

static CAPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)caption:\s*([^;]+);").unwrap());

static CAPTION_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)caption:\s*[^;]+;\s*").unwrap());

static CSS_DECLARATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9_-]+)\s*:\s*(.+)\s*$").unwrap());

/// Renders a markdown body into an ordered sequence of render units.
///
/// Plain blocks collapse into `Html` units. Links to quiz JSON documents are
/// lifted out of the HTML into `Quiz` units; when such a link shares its
/// paragraph with other content, every child of that paragraph becomes its
/// own unit tagged with a common group.
pub fn render(markdown_source: &str) -> Vec<RenderUnit> {
    lex(markdown_source)
        .into_iter()
        .enumerate()
        .fold(Accumulator::default(), |acc, (index, token)| {
            acc.push_token(index, token)
        })
        .finish()
}

pub fn is_quiz_href(href: &str) -> bool {
    let href = href.to_ascii_lowercase();
    href.contains("quiz") && href.contains(".json")
}

pub fn is_external_href(href: &str) -> bool {
    href.starts_with("http") || href.starts_with("//")
}

pub fn render_link(href: &str, title: &str, text_html: &str) -> String {
    let href = escape_attr(href);
    let title_attr = if title.is_empty() {
        String::new()
    } else {
        format!(" title=\"{}\"", escape_attr(title))
    };

    if is_external_href(&href) {
        format!(
            "<a href=\"{href}\"{title_attr} target=\"_blank\" rel=\"noopener noreferrer\">{text_html}</a>"
        )
    } else {
        format!("<a href=\"{href}\"{title_attr}>{text_html}</a>")
    }
}

/// Renders an image, mining its alt text for an optional `caption: ...;`
/// directive and inline CSS declarations.
///
/// CSS from the alt text wins over the title; a title that looks like CSS
/// (`width:`, `height:`, `float:`) is emitted as `style` instead of `title`.
pub fn render_image(src: &str, title: &str, alt: &str) -> String {
    let caption = CAPTION_RE
        .captures(alt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned());

    let remaining = match caption {
        Some(_) => CAPTION_STRIP_RE.replacen(alt, 1, "").trim().to_owned(),
        None => alt.to_owned(),
    };
    let style = parse_css_declarations(&remaining);

    // With both a caption and CSS the alt stays empty and the caption only
    // shows in `<caption>`; `caption: Logo; width: 300px;` must render
    // `alt=""`. The general rule would pick the caption as alt here.
    let alt_text = match (&style, &caption) {
        (Some(_), _) => String::new(),
        (None, Some(caption)) => caption.clone(),
        (None, None) => remaining,
    };
    let caption_text = caption.as_deref().unwrap_or(&alt_text);

    let mut img = format!(
        "<img src=\"{}\" alt=\"{}\"",
        escape_attr(src),
        escape_attr(&alt_text)
    );
    if let Some(style) = &style {
        img.push_str(&format!(" style=\"{}\"", escape_attr(style)));
    } else if !title.is_empty() {
        if title.contains("width:") || title.contains("height:") || title.contains("float:") {
            img.push_str(&format!(" style=\"{}\"", escape_attr(title)));
        } else {
            img.push_str(&format!(" title=\"{}\"", escape_attr(title)));
        }
    }
    img.push_str(" />");

    format!(
        "<span class=\"md-img-wrap\">{img} <caption>{}</caption></span>",
        escape_attr(caption_text)
    )
}

/// Parses `property: value` pairs separated by `;`, dropping fragments that
/// are not declarations. Returns `None` when nothing valid remains.
pub fn parse_css_declarations(text: &str) -> Option<String> {
    let declarations = text
        .split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .filter_map(|fragment| {
            let Some(caps) = CSS_DECLARATION_RE.captures(fragment) else {
                tracing::debug!(fragment, "dropping malformed css fragment");
                return None;
            };
            let value = caps[2].trim();
            if value.is_empty() {
                return None;
            }
            Some(format!("{}: {value}", &caps[1]))
        })
        .collect::<Vec<_>>();

    (!declarations.is_empty()).then(|| declarations.join("; "))
}

#[derive(Debug)]
enum Token<'a> {
    Paragraph(Vec<Inline<'a>>),
    Block(Vec<Event<'a>>),
}

#[derive(Debug)]
enum Inline<'a> {
    Link(LinkToken<'a>),
    Other(Vec<Event<'a>>),
}

#[derive(Debug)]
struct LinkToken<'a> {
    link_type: LinkType,
    href: CowStr<'a>,
    title: CowStr<'a>,
    id: CowStr<'a>,
    children: Vec<Event<'a>>,
}

impl LinkToken<'_> {
    fn is_quiz(&self) -> bool {
        is_quiz_href(&self.href)
    }
}

impl<'a> Inline<'a> {
    fn is_quiz_link(&self) -> bool {
        matches!(self, Self::Link(link) if link.is_quiz())
    }

    fn into_events(self) -> Vec<Event<'a>> {
        match self {
            Self::Other(events) => events,
            Self::Link(link) => {
                let mut events = Vec::with_capacity(link.children.len() + 2);
                events.push(Event::Start(Tag::Link {
                    link_type: link.link_type,
                    dest_url: link.href,
                    title: link.title,
                    id: link.id,
                }));
                events.extend(link.children);
                events.push(Event::End(TagEnd::Link));
                events
            }
        }
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Splits the event stream into top-level block tokens.
fn lex(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;

    for event in Parser::new_ext(source, parser_options()) {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(event);
        if depth == 0 {
            tokens.push(block_token(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Block(current));
    }

    tokens
}

fn block_token(mut events: Vec<Event<'_>>) -> Token<'_> {
    let is_paragraph = matches!(events.first(), Some(Event::Start(Tag::Paragraph)))
        && matches!(events.last(), Some(Event::End(TagEnd::Paragraph)));
    if !is_paragraph || events.len() < 2 {
        return Token::Block(events);
    }

    events.pop();
    let inner = events.split_off(1);
    Token::Paragraph(split_inline(inner))
}

/// Splits paragraph content into children: links, and one balanced inline
/// construct per child otherwise. Adjacent text and line breaks share one
/// child.
fn split_inline(events: Vec<Event<'_>>) -> Vec<Inline<'_>> {
    let mut children = Vec::new();
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let (inner, _) = take_balanced(&mut iter);
                children.push(Inline::Link(LinkToken {
                    link_type,
                    href: dest_url,
                    title,
                    id,
                    children: inner,
                }));
            }
            Event::Start(tag) => {
                let mut group = vec![Event::Start(tag)];
                let (inner, end) = take_balanced(&mut iter);
                group.extend(inner);
                group.extend(end);
                children.push(Inline::Other(group));
            }
            event @ (Event::Text(_) | Event::SoftBreak | Event::HardBreak) => {
                match children.last_mut() {
                    Some(Inline::Other(run)) if run.iter().all(is_text_run_event) => {
                        run.push(event);
                    }
                    _ => children.push(Inline::Other(vec![event])),
                }
            }
            other => children.push(Inline::Other(vec![other])),
        }
    }

    children
}

fn is_text_run_event(event: &Event<'_>) -> bool {
    matches!(event, Event::Text(_) | Event::SoftBreak | Event::HardBreak)
}

/// Consumes events up to the `End` matching an already consumed `Start`.
fn take_balanced<'a>(
    iter: &mut impl Iterator<Item = Event<'a>>,
) -> (Vec<Event<'a>>, Option<Event<'a>>) {
    let mut inner = Vec::new();
    let mut depth = 1usize;

    for event in iter.by_ref() {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return (inner, Some(event));
                }
            }
            _ => {}
        }
        inner.push(event);
    }

    (inner, None)
}

/// Replaces every link and image event group with one inline HTML event
/// rendered by [`render_link`] / [`render_image`].
fn rewrite_events(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => {
                let (inner, _) = take_balanced(&mut iter);
                let href = match link_type {
                    LinkType::Email => format!("mailto:{dest_url}"),
                    _ => dest_url.to_string(),
                };
                let html = render_link(&href, &title, &events_to_html(inner));
                out.push(Event::InlineHtml(html.into()));
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let (inner, _) = take_balanced(&mut iter);
                let html = render_image(&dest_url, &title, &plain_text(&inner));
                out.push(Event::InlineHtml(html.into()));
            }
            other => out.push(other),
        }
    }

    out
}

fn events_to_html(events: Vec<Event<'_>>) -> String {
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, rewrite_events(events).into_iter());
    html
}

fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

#[derive(Debug, Default)]
struct Accumulator {
    units: Vec<RenderUnit>,
    pending: String,
}

impl Accumulator {
    fn push_token(self, index: usize, token: Token<'_>) -> Self {
        match token {
            Token::Paragraph(children) => {
                // A lone quiz link is still a paragraph child and gets a group.
                if children.iter().any(Inline::is_quiz_link) {
                    return self.flush().push_quiz_paragraph(index, children);
                }

                let mut events = vec![Event::Start(Tag::Paragraph)];
                events.extend(children.into_iter().flat_map(Inline::into_events));
                events.push(Event::End(TagEnd::Paragraph));
                self.push_html(&events_to_html(events))
            }
            Token::Block(events) => self.push_html(&events_to_html(events)),
        }
    }

    fn push_quiz_paragraph(mut self, index: usize, children: Vec<Inline<'_>>) -> Self {
        let group = Some(index);
        for child in children {
            let unit = match child {
                Inline::Link(link) if link.is_quiz() => RenderUnit::Quiz {
                    source_url: link.href.to_string(),
                    group,
                },
                child => RenderUnit::Html {
                    content: events_to_html(child.into_events()),
                    group,
                },
            };
            self.units.push(unit);
        }
        self
    }

    fn push_html(mut self, html: &str) -> Self {
        self.pending.push_str(html);
        self
    }

    fn flush(mut self) -> Self {
        let pending = std::mem::take(&mut self.pending);
        if !pending.trim().is_empty() {
            self.units.push(RenderUnit::Html {
                content: pending,
                group: None,
            });
        }
        self
    }

    fn finish(self) -> Vec<RenderUnit> {
        self.flush().units
    }
}

pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(content: &str) -> RenderUnit {
        RenderUnit::Html {
            content: content.to_owned(),
            group: None,
        }
    }

    #[test]
    fn external_links_open_in_new_tab() {
        assert_eq!(
            render_link("https://x.com", "", "t"),
            r#"<a href="https://x.com" target="_blank" rel="noopener noreferrer">t</a>"#
        );
        assert_eq!(
            render_link("//cdn.example.org/a", "", "t"),
            r#"<a href="//cdn.example.org/a" target="_blank" rel="noopener noreferrer">t</a>"#
        );
    }

    #[test]
    fn internal_links_stay_plain_and_keep_title() {
        assert_eq!(
            render_link("/fr/louveteaux", "Louveteaux", "t"),
            r#"<a href="/fr/louveteaux" title="Louveteaux">t</a>"#
        );
    }

    #[test]
    fn markdown_links_are_rewritten_everywhere() {
        let units = render("# See [docs](https://x.com)\n\n- [home](/)\n");
        let [RenderUnit::Html { content, group }] = units.as_slice() else {
            panic!("expected a single html unit, got {units:?}");
        };
        assert!(group.is_none());
        assert!(content.contains(
            r#"<h1>See <a href="https://x.com" target="_blank" rel="noopener noreferrer">docs</a></h1>"#
        ));
        assert!(content.contains(r#"<li><a href="/">home</a></li>"#));
    }

    #[test]
    fn paragraph_with_single_external_link() {
        assert_eq!(
            render("[t](https://x.com)"),
            vec![html(
                "<p><a href=\"https://x.com\" target=\"_blank\" rel=\"noopener noreferrer\">t</a></p>\n"
            )]
        );
    }

    #[test]
    fn caption_and_css_in_alt_text() {
        let out = render_image("logo.png", "", "caption: Logo; width: 300px;");
        assert_eq!(
            out,
            r#"<span class="md-img-wrap"><img src="logo.png" alt="" style="width: 300px" /> <caption>Logo</caption></span>"#
        );
    }

    #[test]
    fn caption_only_becomes_alt() {
        let out = render_image("logo.png", "", "Caption: Logo OMMS;");
        assert_eq!(
            out,
            r#"<span class="md-img-wrap"><img src="logo.png" alt="Logo OMMS" /> <caption>Logo OMMS</caption></span>"#
        );
    }

    #[test]
    fn css_only_alt_yields_empty_alt() {
        let out = render_image("a.png", "", "width: 300px; height: 200px;");
        assert!(out.contains(r#"alt="" style="width: 300px; height: 200px""#));
        assert!(out.ends_with("<caption></caption></span>"));
    }

    #[test]
    fn plain_alt_is_kept_untouched() {
        let out = render_image("a.png", "A group photo", "Group photo");
        assert_eq!(
            out,
            r#"<span class="md-img-wrap"><img src="a.png" alt="Group photo" title="A group photo" /> <caption>Group photo</caption></span>"#
        );
    }

    #[test]
    fn style_like_title_becomes_style() {
        let out = render_image("a.png", "width: 50%; float: left", "Map");
        assert!(out.contains(r#"alt="Map" style="width: 50%; float: left" />"#));
        assert!(!out.contains("title="));
    }

    #[test]
    fn alt_css_wins_over_title() {
        let out = render_image("a.png", "width: 10px", "height: 20px");
        assert!(out.contains(r#"style="height: 20px""#));
        assert!(!out.contains("10px"));
    }

    #[test]
    fn malformed_css_fragments_are_dropped() {
        assert_eq!(
            parse_css_declarations("width: 300px; not css; bad prop: 1; height:;  ; border: 1px solid"),
            Some("width: 300px; border: 1px solid".to_owned())
        );
        assert_eq!(parse_css_declarations("just words"), None);
        assert_eq!(parse_css_declarations(""), None);
    }

    #[test]
    fn images_in_markdown_use_the_image_rule() {
        let units = render("![caption: Logo; width: 300px;](logo.png)");
        assert_eq!(
            units,
            vec![html(
                "<p><span class=\"md-img-wrap\"><img src=\"logo.png\" alt=\"\" style=\"width: 300px\" /> <caption>Logo</caption></span></p>\n"
            )]
        );
    }

    #[test]
    fn quiz_href_detection_is_case_insensitive() {
        assert!(is_quiz_href("https://cdn.example.org/Quiz/Knots.JSON"));
        assert!(is_quiz_href("/uploads/quiz_1.json?v=2"));
        assert!(!is_quiz_href("/uploads/quiz.pdf"));
        assert!(!is_quiz_href("/data/items.json"));
    }

    #[test]
    fn lone_quiz_link_is_a_grouped_unit() {
        let units = render("Intro\n\n[Quiz](/uploads/quiz-knots.json)\n\nOutro\n");
        assert_eq!(
            units,
            vec![
                html("<p>Intro</p>\n"),
                RenderUnit::Quiz {
                    source_url: "/uploads/quiz-knots.json".to_owned(),
                    group: Some(1),
                },
                html("<p>Outro</p>\n"),
            ]
        );

        assert_eq!(
            render("[Quiz](/uploads/quiz-knots.json)\n"),
            vec![RenderUnit::Quiz {
                source_url: "/uploads/quiz-knots.json".to_owned(),
                group: Some(0),
            }]
        );
    }

    #[test]
    fn line_breaks_stay_in_one_text_child() {
        let units = render("line one\nline two [q](/a/quiz.json)\n");
        assert_eq!(
            units,
            vec![
                RenderUnit::Html {
                    content: "line one\nline two ".to_owned(),
                    group: Some(0),
                },
                RenderUnit::Quiz {
                    source_url: "/a/quiz.json".to_owned(),
                    group: Some(0),
                },
            ]
        );

        let units = render("first  \nsecond [q](/a/quiz.json)\n");
        assert_eq!(
            units[0],
            RenderUnit::Html {
                content: "first<br />\nsecond ".to_owned(),
                group: Some(0),
            }
        );
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn quiz_inside_paragraph_splits_children_in_order() {
        let units = render("# Title\n\nTest yourself: [Quiz](/uploads/QUIZ-1.json) *now*\n");
        assert_eq!(
            units,
            vec![
                html("<h1>Title</h1>\n"),
                RenderUnit::Html {
                    content: "Test yourself: ".to_owned(),
                    group: Some(1),
                },
                RenderUnit::Quiz {
                    source_url: "/uploads/QUIZ-1.json".to_owned(),
                    group: Some(1),
                },
                RenderUnit::Html {
                    content: " ".to_owned(),
                    group: Some(1),
                },
                RenderUnit::Html {
                    content: "<em>now</em>".to_owned(),
                    group: Some(1),
                },
            ]
        );
    }

    #[test]
    fn non_quiz_links_in_quiz_paragraph_are_rewritten() {
        let units = render("[a](https://x.com) [q](/quiz.json)");
        assert_eq!(
            units[0],
            RenderUnit::Html {
                content: r#"<a href="https://x.com" target="_blank" rel="noopener noreferrer">a</a>"#
                    .to_owned(),
                group: Some(0),
            }
        );
        assert!(matches!(
            &units[2],
            RenderUnit::Quiz { source_url, group: Some(0) } if source_url == "/quiz.json"
        ));
    }

    #[test]
    fn plain_blocks_collapse_into_one_unit() {
        let units = render("para one\n\npara two\n\n---\n");
        assert_eq!(
            units,
            vec![html("<p>para one</p>\n<p>para two</p>\n<hr />\n")]
        );
    }

    #[test]
    fn empty_input_yields_no_units() {
        assert!(render("").is_empty());
        assert!(render("   \n\n").is_empty());
    }

    #[test]
    fn rendering_is_idempotent() {
        let source = "Hello [q](/a/quiz.json) world\n\n![x](y.png)";
        assert_eq!(render(source), render(source));
    }

    #[test]
    fn attributes_are_escaped() {
        assert_eq!(escape_attr(r#"a "b" <c> & d"#), "a &quot;b&quot; &lt;c&gt; &amp; d");
    }
}

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

use crate::cli::{RenderArgs, RenderFormat};
use crate::config::SiteConfig;
use crate::fetch::{QuizData, fetch_quizzes, http_client};
use crate::formats::RenderUnit;
use crate::markdown::{escape_attr, render};

pub async fn run(args: RenderArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let markdown = std::fs::read_to_string(&input_path)
        .with_context(|| format!("read markdown: {}", input_path.display()))?;

    let units = render(&markdown);
    tracing::debug!(units = units.len(), "rendered markdown");

    let output = match args.format {
        RenderFormat::Units => {
            let mut json = serde_json::to_string_pretty(&units).context("serialize render units")?;
            json.push('\n');
            json
        }
        RenderFormat::Html => {
            let quizzes = if args.fetch_quizzes {
                let config = SiteConfig::from_env()
                    .context("load config")?
                    .with_overrides(args.api_base_url.as_deref(), None);
                let base_url = Url::parse(&config.api_base_url)
                    .with_context(|| format!("parse api base url: {}", config.api_base_url))?;
                let client = http_client(config.http_timeout)?;
                fetch_quizzes(&client, &base_url, quiz_urls(&units)).await
            } else {
                BTreeMap::new()
            };
            render_page_html(&units, &quizzes)
        }
    };

    match args.out.as_deref() {
        Some(out) => crate::store::write_output(&PathBuf::from(out), output.as_bytes(), true)
            .context("write render output")?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .context("write render output to stdout")?;
            stdout.flush().context("flush stdout")?;
        }
    }

    Ok(())
}

/// Distinct quiz urls in order of first appearance.
pub fn quiz_urls(units: &[RenderUnit]) -> Vec<&str> {
    let mut urls: Vec<&str> = Vec::new();
    for unit in units {
        if let RenderUnit::Quiz { source_url, .. } = unit
            && !urls.contains(&source_url.as_str())
        {
            urls.push(source_url);
        }
    }
    urls
}

/// Assembles render units into the page body.
///
/// Units sharing a group are wrapped in one `markdownrenderer-quiz-wrapper`
/// region. Quiz placeholders embed the quiz JSON when it was fetched.
pub fn render_page_html(units: &[RenderUnit], quizzes: &BTreeMap<String, QuizData>) -> String {
    let mut html = String::from("<div class=\"markdown-content\">\n");
    let mut open_group: Option<usize> = None;

    for unit in units {
        let group = unit.group();
        if open_group.is_some() && open_group != group {
            html.push_str("</div>\n");
            open_group = None;
        }
        if group.is_some() && open_group.is_none() {
            html.push_str("<div class=\"markdownrenderer-quiz-wrapper\">\n");
            open_group = group;
        }

        match unit {
            RenderUnit::Html { content, group } => {
                let tag = if group.is_some() { "span" } else { "div" };
                html.push_str(&format!("<{tag}>{content}</{tag}>\n"));
            }
            RenderUnit::Quiz { source_url, .. } => {
                html.push_str(&render_quiz(source_url, quizzes.get(source_url)));
            }
        }
    }

    if open_group.is_some() {
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
    html
}

fn render_quiz(source_url: &str, data: Option<&QuizData>) -> String {
    let src = escape_attr(source_url);
    match data {
        Some(QuizData::Loaded(value)) => {
            // `</` must not terminate the script element early.
            let json = value.to_string().replace("</", "<\\/");
            format!(
                "<div class=\"quiz-container\" data-quiz-src=\"{src}\"><script type=\"application/json\">{json}</script></div>\n"
            )
        }
        Some(QuizData::Failed(reason)) => format!(
            "<div class=\"quiz-error\" data-quiz-src=\"{src}\">Error loading quiz: {}</div>\n",
            escape_attr(reason)
        ),
        None => format!(
            "<div class=\"quiz-container quiz-loading\" data-quiz-src=\"{src}\">Loading quiz...</div>\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> Vec<RenderUnit> {
        vec![
            RenderUnit::Html {
                content: "<p>Intro</p>\n".to_owned(),
                group: None,
            },
            RenderUnit::Html {
                content: "Try: ".to_owned(),
                group: Some(1),
            },
            RenderUnit::Quiz {
                source_url: "/q/quiz.json".to_owned(),
                group: Some(1),
            },
            RenderUnit::Quiz {
                source_url: "/q/quiz.json".to_owned(),
                group: None,
            },
        ]
    }

    #[test]
    fn grouped_units_share_one_wrapper() {
        let html = render_page_html(&units(), &BTreeMap::new());
        assert_eq!(
            html,
            "<div class=\"markdown-content\">\n\
<div><p>Intro</p>\n</div>\n\
<div class=\"markdownrenderer-quiz-wrapper\">\n\
<span>Try: </span>\n\
<div class=\"quiz-container quiz-loading\" data-quiz-src=\"/q/quiz.json\">Loading quiz...</div>\n\
</div>\n\
<div class=\"quiz-container quiz-loading\" data-quiz-src=\"/q/quiz.json\">Loading quiz...</div>\n\
</div>\n"
        );
    }

    #[test]
    fn loaded_and_failed_quizzes() {
        let mut quizzes = BTreeMap::new();
        quizzes.insert(
            "/q/quiz.json".to_owned(),
            QuizData::Loaded(serde_json::json!({"quizTitle": "</script>"})),
        );
        let html = render_page_html(&units(), &quizzes);
        assert!(html.contains(
            r#"<script type="application/json">{"quizTitle":"<\/script>"}</script>"#
        ));

        quizzes.insert(
            "/q/quiz.json".to_owned(),
            QuizData::Failed("404 Not Found".to_owned()),
        );
        let html = render_page_html(&units(), &quizzes);
        assert!(html.contains("Error loading quiz: 404 Not Found"));
    }

    #[test]
    fn quiz_urls_are_deduplicated() {
        assert_eq!(quiz_urls(&units()), vec!["/q/quiz.json"]);
    }
}

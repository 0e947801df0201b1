use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Fetches a web page and reduces it to its visible text. Anchors keep their
/// destination, rendered `[text](href)`, so the model can follow up with
/// another scrape.
pub struct ScrapeTool {
    pub http: reqwest::Client,
    pub timeout: Duration,
}

#[async_trait]
impl Tool for ScrapeTool {
    fn name(&self) -> &str {
        "scrape"
    }

    fn description(&self) -> &str {
        "Scrape a website."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL of the website to scrape."
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: &[String]) -> anyhow::Result<String> {
        let url = args
            .first()
            .ok_or_else(|| anyhow::anyhow!("scrape requires a url argument"))?;

        let response = match self.http.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(error) => return Ok(format!("An error occurred: {}", error)),
        };

        if !response.status().is_success() {
            return Ok(format!("Response not ok. Status {}.", response.status().as_u16()));
        }

        let body = response.text().await?;
        Ok(extract_visible_text(&body))
    }
}

/// Strip markup down to the text a reader would see: scripts and styles
/// dropped, block tags forcing line breaks, anchors kept with their hrefs.
fn extract_visible_text(html: &str) -> String {
    let html = strip_element(html, "script");
    let html = strip_element(&html, "style");

    let mut out = String::new();
    let mut tag = String::new();
    let mut in_tag = false;
    let mut anchor_href: Option<String> = None;
    let mut anchor_text = String::new();

    for ch in html.chars() {
        if in_tag {
            if ch == '>' {
                in_tag = false;
                handle_tag(tag.trim(), &mut out, &mut anchor_href, &mut anchor_text);
                tag.clear();
            } else {
                tag.push(ch);
            }
        } else if ch == '<' {
            in_tag = true;
        } else if anchor_href.is_some() {
            anchor_text.push(ch);
        } else {
            out.push(ch);
        }
    }

    let decoded = decode_entities(&out);
    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn handle_tag(
    tag: &str,
    out: &mut String,
    anchor_href: &mut Option<String>,
    anchor_text: &mut String,
) {
    let lower = tag.to_ascii_lowercase();

    if lower == "a" || lower.starts_with("a ") {
        *anchor_href = Some(parse_href(tag).unwrap_or_default());
        anchor_text.clear();
    } else if lower.starts_with("/a") {
        if let Some(href) = anchor_href.take() {
            let text = anchor_text.trim();
            if href.is_empty() {
                out.push_str(text);
            } else {
                out.push_str(&format!("[{}]({})", text, href));
            }
            anchor_text.clear();
        }
    } else if is_block_boundary(&lower) {
        out.push('\n');
    }
}

fn is_block_boundary(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    matches!(
        name.as_str(),
        "p" | "div" | "br" | "li" | "ul" | "ol" | "tr" | "table" | "section" | "article"
            | "header" | "footer" | "nav" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote"
            | "pre"
    )
}

fn parse_href(tag: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let start = lower.find("href=")? + "href=".len();
    let rest = &tag[start..];
    let mut chars = rest.chars();
    match chars.next()? {
        quote @ ('"' | '\'') => Some(chars.take_while(|&c| c != quote).collect()),
        first => Some(
            std::iter::once(first)
                .chain(chars.take_while(|c| !c.is_whitespace() && *c != '>'))
                .collect(),
        ),
    }
}

/// Remove `<name ...>...</name>` blocks wholesale, case-insensitively.
fn strip_element(html: &str, name: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{}", name);
    let close = format!("</{}>", name);

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(&open) {
        let start = cursor + found;
        out.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => return out,
        }
    }
    out.push_str(&html[cursor..]);
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

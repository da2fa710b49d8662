//! Forum page extraction
//!
//! The forum is a phpBB board. Area sub-forums ("Standorte in ...") list
//! categories, each category pages through topics 30 at a time, and the
//! first post of a topic describes one location. Everything here works on
//! page text already fetched; network access lives in `net`.

use crate::constants::forum::{DESCRIPTION_LABEL, ENTRY_MARKER, GPS_LABEL};
use crate::error::{Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::warn;

static ROW: LazyLock<Selector> = LazyLock::new(|| selector("li.row"));
static FORUM_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("a.forumtitle"));
static SUBFORUM: LazyLock<Selector> = LazyLock::new(|| selector("a.subforum.read[href]"));
static TOPIC_LIST: LazyLock<Selector> = LazyLock::new(|| selector("div.forumbg"));
static TOPIC_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("a.topictitle[href]"));
static PAGINATION: LazyLock<Selector> = LazyLock::new(|| selector("div.pagination"));
static FIRST_POST: LazyLock<Selector> =
    LazyLock::new(|| selector("div.post.bg1, div.post.bg2"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h3.first"));
static STYLED_SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span[style]"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector("p.author"));

static SESSION_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"sid=.*").expect("valid regex"));
static START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"start=(\d+)").expect("valid regex"));
static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Seite\s+(\d+)\s+von\s+(\d+)").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// A link with its visible title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: String,
}

/// What the first post of a topic turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPage {
    Location(PostInfo),
    /// Discussion, announcement or anything else without a location block
    Other,
}

/// Location fields from the first post of a topic
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostInfo {
    pub description: String,
    pub gps_text: Option<String>,
    pub entry_date: Option<String>,
}

/// Make a forum link absolute and strip the session
///
/// `./viewforum.php?f=12&sid=abc` becomes
/// `{base}viewforum.php?f=12&start=0`.
pub fn complete_link(href: &str, base_url: &str) -> String {
    let full = href.replacen("./", base_url, 1);
    let full = SESSION_ID.replace(&full, "start=0").into_owned();
    if START.is_match(&full) {
        full
    } else if full.contains('?') {
        format!("{}&start=0", full)
    } else {
        format!("{}?start=0", full)
    }
}

/// Category links below every area sub-forum whose title has the prefix
pub fn area_forum_links(index_html: &str, base_url: &str, area_prefix: &str) -> Vec<Link> {
    let document = Html::parse_document(index_html);
    document
        .select(&ROW)
        .filter(|row| {
            row.select(&FORUM_TITLE)
                .any(|title| title.text().collect::<String>().starts_with(area_prefix))
        })
        .flat_map(|row| row.select(&SUBFORUM).collect::<Vec<_>>())
        .filter_map(|a| link_of(a, base_url))
        .collect()
}

/// Topic links on one listing page of a category
///
/// Only the plain topic list counts; announcements sit in a `forumbg
/// announcement` block.
pub fn topic_links(page_html: &str, base_url: &str) -> Result<Vec<Link>> {
    let document = Html::parse_document(page_html);
    let list = document
        .select(&TOPIC_LIST)
        .find(|div| div.value().attr("class").map(str::trim) == Some("forumbg"))
        .ok_or_else(|| Error::Html("no topic list on category page".to_string()))?;
    Ok(list
        .select(&TOPIC_TITLE)
        .filter_map(|a| link_of(a, base_url))
        .collect())
}

fn link_of(a: ElementRef<'_>, base_url: &str) -> Option<Link> {
    let href = a.value().attr("href")?;
    Some(Link {
        url: complete_link(href, base_url),
        title: a.text().collect::<String>().trim().to_string(),
    })
}

/// Whether a listing page is the last one
///
/// Reads "Seite X von Y" from the first pagination block. A page without
/// the marker has no further pages.
pub fn is_last_page(page_html: &str) -> bool {
    let document = Html::parse_document(page_html);
    let Some(pagination) = document.select(&PAGINATION).next() else {
        return true;
    };
    let text = pagination.text().collect::<String>();
    match PAGE_MARKER.captures(&text) {
        Some(caps) => caps[1] == caps[2],
        None => true,
    }
}

/// URL of the following listing page
pub fn next_page(url: &str, page_size: usize) -> String {
    let start = START
        .captures(url)
        .and_then(|caps| caps[1].parse::<usize>().ok());
    match start {
        Some(start) => START
            .replace(url, format!("start={}", start + page_size))
            .into_owned(),
        None => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}start={}", url, sep, page_size)
        }
    }
}

/// Classify a topic page and pull out its location fields
pub fn parse_entry_page(html: &str, expected_name: &str) -> Result<EntryPage> {
    let document = Html::parse_document(html);
    let post = document
        .select(&FIRST_POST)
        .next()
        .ok_or_else(|| Error::Html("topic page has no post".to_string()))?;

    if let Some(heading) = post.select(&HEADING).next() {
        let heading = heading.text().collect::<String>();
        if collapse_spaces(&heading) != collapse_spaces(expected_name) {
            warn!(heading = %heading.trim(), expected = expected_name, "topic title differs from link text");
        }
    }

    let is_location = post
        .select(&SPAN)
        .any(|span| span.text().collect::<String>().contains(ENTRY_MARKER));
    if !is_location {
        return Ok(EntryPage::Other);
    }

    let description = labelled_section(post, DESCRIPTION_LABEL, "\n").unwrap_or_default();
    let gps_text = labelled_section(post, GPS_LABEL, " ").filter(|s| !s.is_empty());
    let entry_date = post.select(&AUTHOR).next().and_then(|author| {
        let text = author.text().collect::<String>();
        text.split('»').nth(1).map(|date| date.trim().to_string())
    });

    Ok(EntryPage::Location(PostInfo {
        description,
        gps_text,
        entry_date,
    }))
}

fn collapse_spaces(s: &str) -> String {
    SPACES.replace_all(s.trim(), " ").into_owned()
}

fn has_style(el: &ElementRef<'_>, prefix: &str) -> bool {
    el.value().name() == "span"
        && el
            .value()
            .attr("style")
            .is_some_and(|style| style.trim_start().starts_with(prefix))
}

fn is_bold(el: &ElementRef<'_>) -> bool {
    has_style(el, "font-weight: bold")
}

fn is_struck(el: &ElementRef<'_>) -> bool {
    has_style(el, "text-decoration: line-through")
}

/// Text after the bold label containing `label`, up to the next bold label
///
/// Struck-through text is left out. Text pieces are joined by `separator`.
fn labelled_section(post: ElementRef<'_>, label: &str, separator: &str) -> Option<String> {
    let label_el = post
        .select(&STYLED_SPAN)
        .filter(is_bold)
        .find(|span| span.text().collect::<String>().contains(label))?;
    let label_id = label_el.id();

    let mut parts: Vec<String> = Vec::new();
    let mut started = false;
    for node in post.descendants() {
        if node.id() == label_id {
            started = true;
            continue;
        }
        if !started || node.ancestors().any(|a| a.id() == label_id) {
            continue;
        }
        if let Some(el) = ElementRef::wrap(node) {
            if is_bold(&el) {
                break;
            }
            continue;
        }
        if let Node::Text(text) = node.value() {
            let struck = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| is_struck(&a));
            let piece = text.trim();
            if !struck && !piece.is_empty() {
                parts.push(piece.to_string());
            }
        }
    }
    Some(parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://forum.example/phpBB3/";

    const INDEX: &str = r#"
        <html><body><ul class="topiclist forums">
          <li class="row">
            <a class="forumtitle" href="./viewforum.php?f=130&amp;sid=ff">Standorte in Hessen</a>
            <a class="subforum read" href="./viewforum.php?f=131&amp;sid=ff">Frankfurt</a>,
            <a class="subforum read" href="./viewforum.php?f=132&amp;sid=ff">Kassel</a>
          </li>
          <li class="row">
            <a class="forumtitle" href="./viewforum.php?f=140">Tauschbörse</a>
            <a class="subforum read" href="./viewforum.php?f=141">Suche</a>
          </li>
          <li class="row">
            <a class="forumtitle" href="./viewforum.php?f=150">Standorte in Bayern</a>
            <a class="subforum unread" href="./viewforum.php?f=151">Ignored</a>
            <a class="subforum read" href="./viewforum.php?f=152&amp;sid=ab">München</a>
          </li>
        </ul></body></html>"#;

    fn listing(current: u32, total: u32, topics: &[(&str, &str)]) -> String {
        let links: String = topics
            .iter()
            .map(|(href, title)| format!(r#"<li><a class="topictitle" href="{}">{}</a></li>"#, href, title))
            .collect();
        format!(
            r#"<html><body>
            <div class="pagination">42 Themen &bull; Seite <strong>{c}</strong> von <strong>{t}</strong></div>
            <div class="forumbg announcement"><a class="topictitle" href="./viewtopic.php?t=1">Regeln</a></div>
            <div class="forumbg"><ul>{links}</ul></div>
            <div class="pagination">Seite {c} von {t}</div>
            </body></html>"#,
            c = current,
            t = total,
            links = links
        )
    }

    const ENTRY: &str = r##"
        <html><body>
        <div id="p1" class="post has-profile bg2"><div class="inner">
          <h3 class="first"><a href="#p1">Zoo  Frankfurt</a></h3>
          <p class="author">von <strong>sammler</strong> &raquo; 12.05.2019, 14:03</p>
          <div class="content">
            <span style="font-weight: bold">Standortbeschreibung:</span><br>
            Bernhard-Grzimek-Allee 1<br>
            <span style="text-decoration: line-through">Alter Eingang</span><br>
            60316 Frankfurt am Main<br>
            <span style="font-weight: bold">GPS:</span><br>
            N 50° 07.046'<br>E 008° 42.048'<br>
            <span style="font-weight: bold">Motive:</span> 3
          </div>
        </div></div>
        <div class="post bg1"><span style="font-weight: bold">GPS:</span> N 1 E 1</div>
        </body></html>"##;

    #[test]
    fn test_complete_link() {
        assert_eq!(
            complete_link("./viewforum.php?f=131&sid=deadbeef", BASE),
            "http://forum.example/phpBB3/viewforum.php?f=131&start=0"
        );
        assert_eq!(
            complete_link("./viewtopic.php?f=131&t=9", BASE),
            "http://forum.example/phpBB3/viewtopic.php?f=131&t=9&start=0"
        );
        assert_eq!(
            complete_link("./viewforum.php?f=1&start=60", BASE),
            "http://forum.example/phpBB3/viewforum.php?f=1&start=60"
        );
    }

    #[test]
    fn test_area_forum_links() {
        let links = area_forum_links(INDEX, BASE, "Standorte in");
        let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Frankfurt", "Kassel", "München"]);
        assert_eq!(links[0].url, "http://forum.example/phpBB3/viewforum.php?f=131&start=0");
    }

    #[test]
    fn test_topic_links_skip_announcements() {
        let page = listing(1, 2, &[("./viewtopic.php?t=10&sid=x", "Zoo"), ("./viewtopic.php?t=11", "Museum")]);
        let links = topic_links(&page, BASE).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Zoo");
        assert_eq!(links[0].url, "http://forum.example/phpBB3/viewtopic.php?t=10&start=0");
    }

    #[test]
    fn test_topic_links_requires_list() {
        assert!(topic_links("<html><body></body></html>", BASE).is_err());
    }

    #[test]
    fn test_is_last_page() {
        assert!(!is_last_page(&listing(1, 3, &[])));
        assert!(is_last_page(&listing(3, 3, &[])));
        assert!(is_last_page("<html><body><p>Keine Themen</p></body></html>"));
    }

    #[test]
    fn test_next_page() {
        assert_eq!(next_page("http://x/viewforum.php?f=1&start=0", 30), "http://x/viewforum.php?f=1&start=30");
        assert_eq!(next_page("http://x/viewforum.php?f=1&start=30", 30), "http://x/viewforum.php?f=1&start=60");
        assert_eq!(next_page("http://x/viewforum.php?f=1", 30), "http://x/viewforum.php?f=1&start=30");
    }

    #[test]
    fn test_parse_location_entry() {
        let page = parse_entry_page(ENTRY, "Zoo Frankfurt").unwrap();
        let EntryPage::Location(info) = page else {
            panic!("expected a location entry");
        };
        assert_eq!(info.description, "Bernhard-Grzimek-Allee 1\n60316 Frankfurt am Main");
        assert_eq!(info.gps_text.as_deref(), Some("N 50° 07.046' E 008° 42.048'"));
        assert_eq!(info.entry_date.as_deref(), Some("12.05.2019, 14:03"));
    }

    #[test]
    fn test_parse_other_entry() {
        let html = r#"<div class="post bg1"><h3 class="first">Treffen</h3>
            <p class="author">von x &raquo; 01.01.2020</p><div class="content">Hallo</div></div>"#;
        assert_eq!(parse_entry_page(html, "Treffen").unwrap(), EntryPage::Other);
    }

    #[test]
    fn test_parse_entry_without_gps() {
        let html = r#"<div class="post bg1"><div class="content">
            <span style="font-weight: bold">Standortbeschreibung:</span> Marktplatz 1
            </div></div>"#;
        let EntryPage::Location(info) = parse_entry_page(html, "Markt").unwrap() else {
            panic!("expected a location entry");
        };
        assert_eq!(info.description, "Marktplatz 1");
        assert!(info.gps_text.is_none());
        assert!(info.entry_date.is_none());
    }

    #[test]
    fn test_parse_entry_without_post() {
        assert!(parse_entry_page("<html></html>", "x").is_err());
    }
}

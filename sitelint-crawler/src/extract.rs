use crate::result::{ExtractedData, LinkEdge, RenderedData};
use crate::scope;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

const MAX_ANCHOR_TEXT: usize = 200;

fn selector(css: &str) -> Selector {
    // Selectors here are static strings, parse cannot fail.
    Selector::parse(css).unwrap()
}

/// Pull the SEO signal set and the outbound links out of one page's
/// static HTML. Pure: same input, same output.
pub fn extract(html: &str, base_url: &Url, seed_domain: &str) -> (ExtractedData, Vec<LinkEdge>) {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title");
    let meta_description = attr_value(&document, "meta[name=\"description\"]", "content");
    let canonical = attr_value(&document, "link[rel=\"canonical\"]", "href");
    let meta_robots = attr_value(&document, "meta[name=\"robots\"]", "content");

    let h1_selector = selector("h1");
    let h1s: Vec<String> = document
        .select(&h1_selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .collect();

    let word_count = visible_text(&document).split_whitespace().count();

    let data = ExtractedData {
        title,
        meta_description,
        canonical,
        h1_count: h1s.len(),
        first_h1: h1s.into_iter().next(),
        word_count,
        meta_robots,
        content_hash: format!("{:016x}", xxh3_64(html.as_bytes())),
    };

    let links = extract_links(&document, base_url, seed_domain);

    (data, links)
}

/// The reduced signal tuple re-read from the DOM after rendering.
pub fn extract_rendered(html: &str) -> RenderedData {
    let document = Html::parse_document(html);

    let h1_selector = selector("h1");

    RenderedData {
        title: first_text(&document, "title"),
        meta_description: attr_value(&document, "meta[name=\"description\"]", "content"),
        h1_count: document.select(&h1_selector).count(),
        word_count: visible_text(&document).split_whitespace().count(),
    }
}

fn extract_links(document: &Html, base_url: &Url, seed_domain: &str) -> Vec<LinkEdge> {
    let link_selector = selector("a[href]");
    let source = scope::normalize_url(base_url);

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = scope::resolve_link(base_url, href) else {
            continue;
        };

        let target = scope::normalize_url(&resolved);
        if !seen.insert(target.clone()) {
            continue;
        }

        let is_internal = resolved
            .host_str()
            .map(|h| scope::same_registrable_domain(h, seed_domain))
            .unwrap_or(false);

        let is_followed = !element
            .value()
            .attr("rel")
            .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("nofollow")))
            .unwrap_or(false);

        let mut anchor_text = collapse_whitespace(&element.text().collect::<String>());
        if anchor_text.chars().count() > MAX_ANCHOR_TEXT {
            anchor_text = anchor_text.chars().take(MAX_ANCHOR_TEXT).collect();
        }

        links.push(LinkEdge {
            source_url: source.clone(),
            target_url: target,
            anchor_text,
            is_internal,
            is_followed,
        });
    }

    links
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    document
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn attr_value(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css);
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Text as a reader would see it: script, style and template content
/// excluded.
fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    out
}

fn collect_text(element: ElementRef, out: &mut String) {
    match element.value().name() {
        "script" | "style" | "noscript" | "template" | "head" => return,
        _ => {}
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

use super::*;

fn page() -> Url {
    Url::parse("https://blog.example.com/posts/rust?ref=feed").unwrap()
}

// =============================================================================
// parse_page_url
// =============================================================================

#[test]
fn parse_page_url_accepts_http_and_https() {
    assert!(parse_page_url("http://x").is_ok());
    assert!(parse_page_url("  https://example.com/a  ").is_ok());
}

#[test]
fn parse_page_url_rejects_other_schemes_and_garbage() {
    assert!(matches!(parse_page_url("ftp://example.com"), Err(ScrapeError::InvalidUrl(_))));
    assert!(matches!(parse_page_url("not a url"), Err(ScrapeError::InvalidUrl(_))));
}

// =============================================================================
// parse_metadata
// =============================================================================

#[test]
fn open_graph_tags_take_precedence() {
    let html = r#"
        <html><head>
          <title>Fallback title</title>
          <meta name="description" content="fallback description">
          <meta property="og:title" content="Ownership &amp; Borrowing">
          <meta content="A tour of the borrow checker" property="og:description">
          <meta property="og:image" content="https://cdn.example.com/cover.png">
          <meta property="og:site_name" content="Example Blog">
          <link rel="icon" href="/favicon.ico">
        </head></html>"#;

    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.title.as_deref(), Some("Ownership & Borrowing"));
    assert_eq!(parsed.description.as_deref(), Some("A tour of the borrow checker"));
    assert_eq!(parsed.image_url.as_deref(), Some("https://cdn.example.com/cover.png"));
    assert_eq!(parsed.site_name.as_deref(), Some("Example Blog"));
    assert_eq!(parsed.icon.as_deref(), Some("https://blog.example.com/favicon.ico"));
}

#[test]
fn falls_back_to_plain_html_and_host() {
    let html = "<HTML><HEAD><TITLE> Plain page </TITLE>\
                <META NAME='description' CONTENT='just html'>\
                <link rel='shortcut icon' href='img/icon.png'></HEAD></HTML>";

    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.title.as_deref(), Some("Plain page"));
    assert_eq!(parsed.description.as_deref(), Some("just html"));
    assert_eq!(parsed.image_url, None);
    assert_eq!(parsed.site_name.as_deref(), Some("blog.example.com"));
    assert_eq!(parsed.icon.as_deref(), Some("https://blog.example.com/posts/img/icon.png"));
}

#[test]
fn relative_og_image_is_resolved_against_page() {
    let html = r#"<meta property="og:image" content="/static/hero.jpg">"#;
    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.image_url.as_deref(), Some("https://blog.example.com/static/hero.jpg"));
}

#[test]
fn first_duplicate_meta_wins_and_blank_values_are_dropped() {
    let html = r#"
        <meta property="og:title" content="first">
        <meta property="og:title" content="second">
        <meta property="og:description" content="   ">"#;
    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.title.as_deref(), Some("first"));
    assert_eq!(parsed.description, None);
}

#[test]
fn empty_document_has_no_preview_fields() {
    let parsed = parse_metadata("<html><body>nothing</body></html>", &page());
    assert!(parsed.is_empty());
    assert_eq!(parsed.site_name.as_deref(), Some("blog.example.com"));
}

#[test]
fn stylesheet_links_are_not_icons() {
    let html = r#"<link rel="stylesheet" href="/site.css"><link rel="apple-touch-icon" href="/touch.png">"#;
    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.icon, None);
}

#[test]
fn quoted_angle_bracket_does_not_end_the_tag() {
    let html = r#"<title>Fallback</title>
        <meta property="og:title" content="A > B">
        <link title="a > b" rel="icon" href="/fav.ico">"#;
    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.title.as_deref(), Some("A > B"));
    assert_eq!(parsed.icon.as_deref(), Some("https://blog.example.com/fav.ico"));
}

#[test]
fn numeric_and_named_entities_are_decoded() {
    let html = r#"<meta property="og:description" content="x &#8217; y &#x2014; &amp;">"#;
    let parsed = parse_metadata(html, &page());
    assert_eq!(parsed.description.as_deref(), Some("x \u{2019} y \u{2014} &"));
}

// =============================================================================
// ensure_html / append_capped
// =============================================================================

#[test]
fn html_content_types_are_accepted() {
    assert!(ensure_html(Some("text/html; charset=utf-8")).is_ok());
    assert!(ensure_html(Some("Application/XHTML+XML")).is_ok());
    assert!(ensure_html(None).is_ok());
}

#[test]
fn binary_content_types_are_rejected() {
    assert!(matches!(ensure_html(Some("video/mp4")), Err(ScrapeError::NotHtml(m)) if m == "video/mp4"));
    assert!(matches!(ensure_html(Some("application/json")), Err(ScrapeError::NotHtml(_))));
}

#[test]
fn append_capped_allows_exactly_the_cap() {
    let mut body = Vec::new();
    append_capped(&mut body, &[1; 6], 10).unwrap();
    append_capped(&mut body, &[2; 4], 10).unwrap();
    assert_eq!(body.len(), 10);
}

#[test]
fn append_capped_rejects_overflow_without_growing() {
    let mut body = vec![0; 8];
    let result = append_capped(&mut body, &[1; 3], 10);
    assert!(matches!(result, Err(ScrapeError::TooLarge(10))));
    assert_eq!(body.len(), 8);
}

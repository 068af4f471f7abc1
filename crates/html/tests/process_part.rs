//! End-to-end properties of the document parser over whole messages.

use html::{
    DEFAULT_MAX_TAGS, ExceptionKind, HtmlDocument, doc_flags, process_part, process_part_full,
};
use urls::{UrlTable, flags as url_flags};

fn parse_full(input: &[u8]) -> (HtmlDocument, Vec<u8>, Vec<html::ProcessException>, UrlTable, UrlTable) {
    let mut doc = HtmlDocument::new();
    let mut exceptions = Vec::new();
    let mut urls_tbl = UrlTable::new();
    let mut emails_tbl = UrlTable::new();
    let text = process_part_full(
        &mut doc,
        input,
        &mut exceptions,
        &mut urls_tbl,
        &mut emails_tbl,
    );
    (doc, text, exceptions, urls_tbl, emails_tbl)
}

#[test]
fn newsletter_like_message_extracts_everything() {
    let input = br##"<html>
<head><title>Weekly offers</title><style>p { color: red }</style></head>
<body bgcolor="#ffffff">
<div class="header" style="background-color: #eeeeee">
<p>Dear customer,</p>
<p>Check our <a href="http://shop.example.com/sale">summer sale</a> today!</p>
<img src="cid:logo@shop" width=120 height=40>
<img src="http://shop.example.com/banner.png" style="width: 600; height: 80">
<p>Contact <a href="mailto:help@shop.example.com">support</a>.</p>
</div>
</body>
</html>"##;

    let (doc, text, _, urls_tbl, emails_tbl) = parse_full(input);
    let text = String::from_utf8_lossy(&text).into_owned();

    assert!(text.contains("Dear customer,"));
    assert!(text.contains("summer sale"));
    assert!(text.contains("Contact support"));
    assert!(!text.contains("color: red"), "style text must not leak");
    assert!(!text.contains("Weekly offers"), "head content must not leak");

    assert_eq!(doc.flags & doc_flags::UNBALANCED, 0);
    assert!(doc.tag_seen("img"));
    assert!(doc.tag_seen("body"));

    let images: Vec<_> = doc.images().collect();
    assert_eq!(images.len(), 2);
    assert!(images[0].embedded);
    assert_eq!((images[0].width, images[0].height), (120, 40));
    assert!(!images[1].embedded);
    assert_eq!((images[1].width, images[1].height), (600, 80));

    assert!(urls_tbl.iter().any(|u| u.host() == "shop.example.com"));
    assert!(emails_tbl.iter().any(|u| u.host() == "shop.example.com"));

    for block in doc.blocks() {
        assert!(block.font_color.valid);
        assert!(block.background_color.valid);
    }
}

#[test]
fn balance_invariant_holds_for_well_formed_input() {
    let mut input = String::from("<html><body>");
    for depth in 0..50 {
        input.push_str(&format!("<div>level {depth}"));
    }
    for _ in 0..50 {
        input.push_str("</div>");
    }
    input.push_str("</body></html>");

    let (doc, _, _, _, _) = parse_full(input.as_bytes());
    assert_eq!(
        doc.flags & doc_flags::UNBALANCED,
        0,
        "well-formed nesting must never flag unbalanced"
    );
}

#[test]
fn tag_bomb_is_bounded_and_flagged() {
    let mut input = String::new();
    for _ in 0..20_000 {
        input.push_str("<b>x</b>");
    }
    let (doc, text, _, _, _) = parse_full(input.as_bytes());
    assert!(doc.flags & doc_flags::TOO_MANY_TAGS != 0);
    assert!(doc.tree.len() - 1 <= DEFAULT_MAX_TAGS);
    // Text keeps flowing after the cap.
    assert_eq!(text.len(), 20_000);
}

#[test]
fn deep_nesting_is_bounded() {
    let mut input = String::new();
    for _ in 0..10_000 {
        input.push_str("<div>");
    }
    input.push('x');
    for _ in 0..10_000 {
        input.push_str("</div>");
    }
    let (doc, text, _, _, _) = parse_full(input.as_bytes());
    assert!(doc.flags & doc_flags::TOO_MANY_TAGS != 0);
    assert!(doc.tree.len() - 1 <= DEFAULT_MAX_TAGS);
    assert!(text.starts_with(b"x"));
}

#[test]
fn entity_bomb_decodes_linearly() {
    let mut input = String::from("<p>");
    for _ in 0..50_000 {
        input.push_str("&amp;");
    }
    input.push_str("</p>");
    let (_, text, _, _, _) = parse_full(input.as_bytes());
    assert_eq!(text.len(), 50_000 + 2, "each entity decodes to one byte plus CRLF");
    assert!(text[..50_000].iter().all(|&b| b == b'&'));
}

#[test]
fn phishing_anchor_flags_target_and_displayed() {
    let (_, _, exceptions, urls_tbl, _) =
        parse_full(b"<a href=\"http://good-bank.com\">http://evil-bank.net</a>");

    let target = urls_tbl
        .iter()
        .find(|u| u.host() == "good-bank.com")
        .expect("target registered");
    assert!(target.flags & url_flags::PHISHED != 0);

    let displayed = urls_tbl
        .iter()
        .find(|u| u.host() == "evil-bank.net")
        .expect("displayed registered");
    assert!(displayed.flags & url_flags::HTML_DISPLAYED != 0);
    assert!(displayed.tags.iter().any(|t| t.name == "phishing"));

    assert!(exceptions.iter().any(|e| e.kind == ExceptionKind::Url));
}

#[test]
fn subdomain_relationship_does_not_flag() {
    let (_, _, _, urls_tbl, _) =
        parse_full(b"<a href=\"http://sub.good-bank.com\">http://good-bank.com</a>");
    for url in urls_tbl.iter() {
        assert!(url.flags & url_flags::PHISHED == 0);
    }
}

#[test]
fn plain_anchor_text_is_not_phishing() {
    let (_, _, exceptions, urls_tbl, _) =
        parse_full(b"<a href=\"http://good-bank.com\">Click here for your account</a>");
    for url in urls_tbl.iter() {
        assert!(url.flags & url_flags::PHISHED == 0);
    }
    assert!(!exceptions.iter().any(|e| e.kind == ExceptionKind::Url));
}

#[test]
fn hidden_subtree_produces_no_text_but_keeps_structure() {
    let (doc, text, _, _, _) = parse_full(
        b"<div style=\"display:none\">hidden <b>words</b> here</div><p>shown</p>",
    );
    let text = String::from_utf8_lossy(&text).into_owned();
    assert!(!text.contains("hidden"));
    assert!(!text.contains("words"));
    assert!(text.contains("shown"));
    assert!(doc.blocks().any(|b| !b.visible));
}

#[test]
fn malformed_soup_never_panics_and_degrades_to_flags() {
    let samples: &[&[u8]] = &[
        b"<",
        b"<>",
        b"</>",
        b"<!",
        b"<!--",
        b"<!-- unterminated",
        b"<?xml",
        b"<a <b <c",
        b"<1bad>text</1bad>",
        b"<div foo bar baz>",
        b"</closing-only>",
        b"<![compound [nested]]>",
        b"\xff\xfe<\x00div>",
        b"<a href=\"broken",
    ];
    for sample in samples {
        let mut doc = HtmlDocument::new();
        let _ = process_part(&mut doc, sample);
    }
}

#[test]
fn repeated_href_counts_instead_of_duplicating() {
    let (_, _, _, urls_tbl, _) = parse_full(
        b"<a href=\"http://x.example/\">a</a>\
          <a href=\"http://x.example/\">b</a>\
          <a href=\"http://x.example/\">c</a>",
    );
    assert_eq!(urls_tbl.len(), 1);
    assert_eq!(urls_tbl.iter().next().unwrap().count, 3);
}

#[test]
fn iframe_sources_are_registered() {
    let (_, _, _, urls_tbl, _) =
        parse_full(b"<iframe src=\"http://tracker.example/frame\"></iframe>");
    assert!(urls_tbl.iter().any(|u| u.host() == "tracker.example"));
}

#[test]
fn obscured_and_schemeless_urls_are_flagged() {
    let (_, _, _, urls_tbl, _) = parse_full(b"<a href=\"evil.example/pa th\">x</a>");
    let url = urls_tbl.iter().next().expect("url registered");
    assert!(url.flags & url_flags::SCHEMELESS != 0);
    assert!(url.flags & url_flags::OBSCURED != 0);
    assert_eq!(url.host(), "evil.example");
}

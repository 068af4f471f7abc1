#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut doc = html::HtmlDocument::new();
    let mut exceptions = Vec::new();
    let mut urls_tbl = urls::UrlTable::new();
    let mut emails_tbl = urls::UrlTable::new();
    let _ = html::process_part_full(
        &mut doc,
        data,
        &mut exceptions,
        &mut urls_tbl,
        &mut emails_tbl,
    );
    assert!(doc.tree.len() <= html::DEFAULT_MAX_TAGS + 1);
});

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use html::{HtmlDocument, process_part_full};
use urls::UrlTable;

fn newsletter(paragraphs: usize) -> Vec<u8> {
    let mut out = String::from("<html><head><title>bench</title></head><body bgcolor=\"#ffffff\">");
    for i in 0..paragraphs {
        out.push_str(&format!(
            "<div style=\"background-color: #eeeeee\"><p>Paragraph {i} with &amp; entities \
             and <a href=\"http://shop.example.com/item/{i}\">http://shop.example.com/item/{i}</a> \
             inside.</p><img src=\"http://img.example.com/{i}.png\" width=100 height=50></div>"
        ));
    }
    out.push_str("</body></html>");
    out.into_bytes()
}

fn bench_process_part(c: &mut Criterion) {
    let small = newsletter(10);
    let large = newsletter(500);

    c.bench_function("process_part_newsletter_10", |b| {
        b.iter(|| {
            let mut doc = HtmlDocument::new();
            let mut exceptions = Vec::new();
            let mut urls_tbl = UrlTable::new();
            let mut emails_tbl = UrlTable::new();
            black_box(process_part_full(
                &mut doc,
                black_box(&small),
                &mut exceptions,
                &mut urls_tbl,
                &mut emails_tbl,
            ))
        })
    });

    c.bench_function("process_part_newsletter_500", |b| {
        b.iter(|| {
            let mut doc = HtmlDocument::new();
            let mut exceptions = Vec::new();
            let mut urls_tbl = UrlTable::new();
            let mut emails_tbl = UrlTable::new();
            black_box(process_part_full(
                &mut doc,
                black_box(&large),
                &mut exceptions,
                &mut urls_tbl,
                &mut emails_tbl,
            ))
        })
    });
}

criterion_group!(benches, bench_process_part);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use herb::{extract_ruby, lex, parse, ExtractRubyOptions, ParseOptions};

fn sample_template(repeat: usize) -> Vec<u8> {
    let row = b"  <tr id=\"row-<%= item.id %>\" class=\"<%= cycle('odd', 'even') %>\">\n    <td><%= link_to item.name, item_path(item) %></td>\n    <td><% if item.active? %>active<% else %>inactive<% end %></td>\n  </tr>\n";

    let mut template = Vec::new();
    template.extend_from_slice(b"<!DOCTYPE html>\n<html>\n<body>\n<table>\n<tbody>\n");
    for _ in 0..repeat {
        template.extend_from_slice(row);
    }
    template.extend_from_slice(b"</tbody>\n</table>\n</body>\n</html>\n");
    template
}

fn bench_lex(c: &mut Criterion) {
    let template = sample_template(100);

    let mut group = c.benchmark_group("lex");
    group.throughput(Throughput::Bytes(template.len() as u64));
    group.bench_function("table-template", |b| b.iter(|| lex(black_box(&template))));
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let template = sample_template(100);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(template.len() as u64));
    group.bench_function("raw", |b| {
        let options = ParseOptions {
            analyze: false,
            ..ParseOptions::default()
        };
        b.iter(|| parse(black_box(&template), &options))
    });
    group.bench_function("analyzed", |b| {
        let options = ParseOptions::default();
        b.iter(|| parse(black_box(&template), &options))
    });
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let template = sample_template(100);

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Bytes(template.len() as u64));
    group.bench_function("ruby", |b| {
        let options = ExtractRubyOptions::default();
        b.iter(|| extract_ruby(black_box(&template), &options))
    });
    group.finish();
}

criterion_group!(benches, bench_lex, bench_parse, bench_extract);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use datforge::{import_tree, parse_datfile_str, DatIngest, ImportOptions, IngestOptions};

fn synthetic_datfile(games: usize) -> String {
    let mut xml = String::with_capacity(games * 128);
    xml.push_str("<datafile><header><name>Bench Collection</name><version>2024-01-01</version></header>");
    for i in 0..games {
        xml.push_str(&format!(
            r#"<game name="Game {i}"><description>Game number {i}</description><rom name="game{i}.bin" size="{}" crc="deadbeef"/></game>"#,
            1024 + i
        ));
    }
    xml.push_str("</datafile>");
    xml
}

fn benchmark(c: &mut Criterion) {
    let xml = synthetic_datfile(1000);
    let root = parse_datfile_str(&xml, "<bench>").unwrap();
    let options = ImportOptions::default();

    c.bench_function("parse_1000_games", |b| {
        b.iter(|| parse_datfile_str(black_box(&xml), "<bench>").unwrap())
    });

    c.bench_function("import_1000_games", |b| {
        b.iter(|| import_tree(black_box(&root), &options).unwrap())
    });

    c.bench_function("fold_10_files", |b| {
        b.iter(|| {
            let mut ingest = DatIngest::new(IngestOptions::default());
            for i in 0..10 {
                ingest
                    .ingest_document("TOSEC", &format!("File {}", i), "v1", &root, "<bench>")
                    .unwrap();
            }
            black_box(ingest.model().table("game").map(|t| t.rows.len()))
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

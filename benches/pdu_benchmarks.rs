// ABOUTME: Benchmark suite for the SMS PDU codec
// ABOUTME: Measures septet packing, SMS-SUBMIT encoding across message sizes and SMS-DELIVER decoding

use airlink::client::parse_listing;
use airlink::datatypes::gsm7;
use airlink::pdu::{PduDecoder, PduEncoder};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

const DELIVER_7BIT: &str =
    "07911326040000F0040B911346610089F60000208062917314080CC8F71D14969741F977FD07";

fn bench_septets(c: &mut Criterion) {
    let mut group = c.benchmark_group("septets");
    let septets = gsm7::to_septets(&"The quick brown fox ".repeat(8)).unwrap();
    let packed = gsm7::pack(&septets, 0);

    group.bench_function("pack_160", |b| {
        b.iter(|| gsm7::pack(black_box(&septets), 0))
    });
    group.bench_function("unpack_160", |b| {
        b.iter(|| gsm7::unpack(black_box(&packed), 0, septets.len()).unwrap())
    });
    group.finish();
}

fn bench_encode_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_sizes");
    group.measurement_time(Duration::from_secs(10));
    let encoder = PduEncoder::new();

    for &size in &[10, 160, 161, 459, 1530] {
        let gsm = "A".repeat(size);
        group.bench_with_input(BenchmarkId::new("gsm7", size), &gsm, |b, text| {
            b.iter(|| encoder.encode("+8613800138000", black_box(text)).unwrap())
        });

        let ucs2 = "短".repeat(size);
        group.bench_with_input(BenchmarkId::new("ucs2", size), &ucs2, |b, text| {
            b.iter(|| encoder.encode("+8613800138000", black_box(text)).unwrap())
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    group.bench_function("deliver_7bit", |b| {
        b.iter(|| PduDecoder::decode(black_box(DELIVER_7BIT)).unwrap())
    });

    let mut listing = String::new();
    for index in 0..30 {
        listing.push_str(&format!("+CMGL: {index},0,,36\r\n{DELIVER_7BIT}\r\n"));
    }
    listing.push_str("\r\nOK\r\n");
    group.bench_function("listing_30", |b| {
        b.iter(|| parse_listing(black_box(&listing)))
    });

    group.finish();
}

criterion_group!(benches, bench_septets, bench_encode_sizes, bench_decode);
criterion_main!(benches);

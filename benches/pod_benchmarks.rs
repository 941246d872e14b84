use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use wavum::pod::types::{ids, prop0_flags};
use wavum::protocol::v2_to_row;
use wavum::{
    remap_from_v0, ChoiceType, CompatTypeMap, Fraction, Pod, PodBuilder, PodType, Rectangle,
    TYPE_MAP,
};

fn build_mixed(buf: &mut [u8]) -> usize {
    let mut b = PodBuilder::new(buf);
    b.open_struct().unwrap();
    b.write_int(4).unwrap();
    b.write_long(6000).unwrap();
    b.write_double(3.14).unwrap();
    b.write_string("test123").unwrap();
    b.write_rectangle(Rectangle::new(320, 240)).unwrap();
    b.write_fraction(Fraction::new(25, 1)).unwrap();
    b.open_array(PodType::Int, 4).unwrap();
    for v in 0..16 {
        b.write_int(v).unwrap();
    }
    b.close().unwrap();
    b.close().unwrap();
    b.finish().unwrap()
}

fn bench_build_struct(c: &mut Criterion) {
    c.bench_function("build mixed struct", |b| {
        let mut buf = vec![0u8; 1024];
        b.iter(|| {
            let n = build_mixed(black_box(&mut buf));
            black_box(n);
        })
    });
}

fn bench_parse_struct(c: &mut Criterion) {
    let mut buf = vec![0u8; 1024];
    let n = build_mixed(&mut buf);
    buf.truncate(n);
    c.bench_function("parse mixed struct", |b| {
        b.iter(|| {
            let pod = Pod::from_bytes(black_box(&buf)).unwrap();
            for child in pod.as_struct().unwrap() {
                black_box(child.unwrap().size());
            }
        })
    });
}

fn bench_remap_format(c: &mut Criterion) {
    let mut map = CompatTypeMap::new();
    let names: Vec<_> = TYPE_MAP.iter().map(|r| r.name).collect();
    map.apply_update(0, &names);
    let slot = |id| v2_to_row(id).unwrap();

    // Формат v0 с двумя Id и перечислением частот.
    let mut buf = vec![0u8; 1024];
    let mut b = PodBuilder::new(&mut buf);
    b.open_object(slot(ids::OBJECT_FORMAT), slot(ids::OBJECT_FORMAT))
        .unwrap();
    b.write_id(slot(ids::MEDIA_TYPE_AUDIO)).unwrap();
    b.write_id(slot(ids::MEDIA_SUBTYPE_RAW)).unwrap();
    let mut body = Vec::new();
    for v in [
        slot(ids::FORMAT_AUDIO_RATE),
        prop0_flags::RANGE_ENUM | prop0_flags::UNSET,
        4,
        PodType::Int as u32,
        48000,
        44100,
        96000,
    ] {
        body.extend_from_slice(&v.to_le_bytes());
    }
    b.write_value(PodType::Choice, &body).unwrap();
    b.close().unwrap();
    let n = b.finish().unwrap();
    buf.truncate(n);

    c.bench_function("remap format from v0", |b| {
        let pod = Pod::from_bytes(&buf).unwrap();
        b.iter(|| {
            let out = remap_from_v0(black_box(&map), black_box(&pod)).unwrap();
            black_box(out);
        })
    });
}

fn bench_filter_enum(c: &mut Criterion) {
    let build_enum = |vals: &[i32]| {
        let mut buf = vec![0u8; 1024];
        let mut b = PodBuilder::new(&mut buf);
        b.open_choice(ChoiceType::Enum, 0).unwrap();
        for v in vals {
            b.write_int(*v).unwrap();
        }
        b.close().unwrap();
        let n = b.finish().unwrap();
        buf.truncate(n);
        buf
    };
    let a = build_enum(&[8000, 16000, 44100, 48000, 96000, 192000]);
    let b_ = build_enum(&[44100, 48000, 88200, 96000]);

    c.bench_function("filter enum choices", |b| {
        let pa = Pod::from_bytes(&a).unwrap();
        let pb = Pod::from_bytes(&b_).unwrap();
        let mut buf = vec![0u8; 1024];
        b.iter(|| {
            let mut out = PodBuilder::new(&mut buf);
            wavum::filter_values(black_box(&pa), black_box(&pb), &mut out).unwrap();
            black_box(out.finish().unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_build_struct,
    bench_parse_struct,
    bench_remap_format,
    bench_filter_enum
);
criterion_main!(benches);

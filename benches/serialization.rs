use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shapewire::{
    from_bytes, shape_object, to_bytes, to_debug_string, transcode_to_value, PodVec, Schema,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
    active: bool,
}
shape_object!(User { id, name, email, active });

#[derive(Clone, Debug, Default, PartialEq)]
struct Product {
    sku: String,
    name: String,
    price: f64,
    quantity: u32,
}
shape_object!(Product { sku, name, price, quantity });

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
struct Sample {
    time: f64,
    value: f32,
    channel: u32,
}
shape_object!(#[trivial] Sample { time: f64, value: f32, channel: u32 });

fn sample_user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    }
}

fn products(size: u32) -> Vec<Product> {
    (0..size)
        .map(|i| Product {
            sku: format!("SKU{}", i),
            name: format!("Product {}", i),
            price: 9.99 + f64::from(i),
            quantity: i,
        })
        .collect()
}

fn samples(size: u32) -> Vec<Sample> {
    (0..size)
        .map(|i| Sample {
            time: f64::from(i) * 0.001,
            value: i as f32,
            channel: i % 4,
        })
        .collect()
}

fn benchmark_encode_simple(c: &mut Criterion) {
    let mut user = sample_user();

    c.bench_function("encode_simple_struct", |b| {
        b.iter(|| to_bytes(black_box(&mut user)))
    });
}

fn benchmark_decode_simple(c: &mut Criterion) {
    let bytes = to_bytes(&mut sample_user()).unwrap();

    c.bench_function("decode_simple_struct", |b| {
        b.iter(|| from_bytes::<User>(black_box(&bytes)))
    });
}

fn benchmark_dynamic_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_list");

    for size in [10, 100, 1000].iter() {
        let mut list = products(*size);
        let bytes = to_bytes(&mut list).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", size), size, |b, _| {
            b.iter(|| to_bytes(black_box(&mut list)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| from_bytes::<Vec<Product>>(black_box(bytes)))
        });
    }
    group.finish();
}

fn benchmark_trivial_vs_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("trivial_records");

    for size in [100, 10_000].iter() {
        let mut list = samples(*size);
        let mut bulk = PodVec::from(list.clone());

        group.bench_with_input(BenchmarkId::new("element_wise", size), size, |b, _| {
            b.iter(|| to_bytes(black_box(&mut list)))
        });
        group.bench_with_input(BenchmarkId::new("pod_vec", size), size, |b, _| {
            b.iter(|| to_bytes(black_box(&mut bulk)))
        });

        let bytes = to_bytes(&mut bulk).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_pod_vec", size), &bytes, |b, bytes| {
            b.iter(|| from_bytes::<PodVec<Sample>>(black_box(bytes)))
        });
    }
    group.finish();
}

fn benchmark_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema");

    group.bench_function("record", |b| b.iter(Schema::of::<Vec<Product>>));

    let schema = Schema::of::<Vec<Product>>();
    let bytes = to_bytes(&mut products(100)).unwrap();
    group.bench_function("replay_to_value", |b| {
        b.iter(|| transcode_to_value(black_box(&schema), black_box(&bytes)))
    });

    group.finish();
}

fn benchmark_debug_dump(c: &mut Criterion) {
    let mut list = products(100);

    c.bench_function("debug_dump", |b| {
        b.iter(|| to_debug_string(black_box(&mut list)))
    });
}

criterion_group!(
    benches,
    benchmark_encode_simple,
    benchmark_decode_simple,
    benchmark_dynamic_list,
    benchmark_trivial_vs_bulk,
    benchmark_schema,
    benchmark_debug_dump
);
criterion_main!(benches);

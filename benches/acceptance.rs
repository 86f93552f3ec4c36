use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pardfa::{
    device::CpuDevice,
    engine::{block::Engine, dfa::DfaEngine, serial::SerialEngine, Matcher},
    syntax::parse,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// The byte-level description of well-formed UTF-8; the heaviest pattern
/// this crate is meant for.
const UTF8: &str = "([\\x00-\\x7f]\
    |[\\xc2-\\xdf][\\x80-\\xbf]\
    |\\xe0[\\xa0-\\xbf][\\x80-\\xbf]\
    |[\\xe1-\\xec][\\x80-\\xbf][\\x80-\\xbf]\
    |\\xed[\\x80-\\x9f][\\x80-\\xbf]\
    |[\\xee-\\xef][\\x80-\\xbf][\\x80-\\xbf]\
    |\\xf0[\\x90-\\xbf][\\x80-\\xbf][\\x80-\\xbf]\
    |[\\xf1-\\xf3][\\x80-\\xbf][\\x80-\\xbf][\\x80-\\xbf]\
    |\\xf4[\\x80-\\x8f][\\x80-\\xbf][\\x80-\\xbf])*";

fn ascii_haystack(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..len).map(|_| rng.random_range(b' '..=b'~')).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let pattern = parse(UTF8).unwrap();
    let dfa = DfaEngine::compile(&pattern);
    let serial = SerialEngine::compile(&pattern).unwrap();
    let block = Engine::new(CpuDevice::new()).unwrap();
    let compiled = block.compile(&pattern).unwrap();

    for len in [1 << 20, 16 << 20, 128 << 20] {
        let haystack = ascii_haystack(len);
        let mut group = c.benchmark_group(format!("utf8_{}mib", len >> 20));
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function("dfa", |b| {
            b.iter(|| dfa.matches(black_box(&haystack)))
        });
        group.bench_function("serial_pdfa", |b| {
            b.iter(|| serial.matches(black_box(&haystack)))
        });
        group.bench_function("block_cpu", |b| {
            b.iter(|| block.matches(&compiled, black_box(&haystack)).unwrap())
        });
        group.finish();
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

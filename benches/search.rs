use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array1;
use snapmatch::index::VectorIndex;

fn random_vector(dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rand::random::<f32>() - 0.5).collect()
}

fn bench_search(c: &mut Criterion) {
    let dim = 512;
    let mut index = VectorIndex::new(dim);
    for _ in 0..10_000 {
        index.push(&random_vector(dim)).unwrap();
    }
    let query = Array1::from(index.vectors().row(0).to_vec());

    c.bench_function("search_10k_512d_top10", |b| {
        b.iter(|| index.search(black_box(query.view()), 10).unwrap())
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);

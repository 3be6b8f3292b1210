use criterion::{criterion_group, criterion_main, Criterion};
use dem::{Crs, GeoTransform, Grid};
use geo::{coord, LineString};
use transect::{Extractor, Fill, NoDataRule, Policy, Sampler, Transformer};

const ARCSECOND: f64 = 1.0 / 3600.0;

/// A smooth synthetic peak over the Mt Washington area.
fn synthetic_dem() -> Grid {
    let rows = 720;
    Grid::from_fn(
        GeoTransform::from_lower_left(-71.4, 44.2, ARCSECOND, rows),
        (720, rows),
        Crs::Geographic,
        |c| {
            let (dx, dy) = (c.x + 71.3033, c.y - 44.2706);
            1917.0 * (-(dx * dx + dy * dy) / 0.002).exp()
        },
    )
}

fn extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("Extract");

    let dem = synthetic_dem();
    let line = LineString::from(vec![
        coord!(x: -71.30830716441369, y: 44.28309806603165),
        coord!(x: -71.2972073283768, y: 44.25628098424278),
    ]);
    let extractor = Extractor::new(
        &dem,
        Transformer::default(),
        Sampler::new(NoDataRule::sentinel_only()),
    );

    for (name, policy, fill) in [
        ("fixed_cap", Policy::FixedCap, Fill::CarryForward),
        ("length_scaled", Policy::LengthScaled, Fill::Strict),
    ] {
        group.bench_with_input(name, &line, |b, line| {
            b.iter(|| {
                extractor
                    .extract(line, &Crs::Geographic, policy, fill)
                    .unwrap()
            })
        });
    }
}

fn reproject(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reproject");

    let t = Transformer::default();
    let utm19n = Crs::Utm {
        zone: 19,
        north: true,
    };
    let start = coord!(x: -71.30830716441369, y: 44.28309806603165);

    group.bench_with_input("geographic_to_utm", &start, |b, s| {
        b.iter(|| t.try_transform(*s, &Crs::Geographic, &utm19n).unwrap())
    });
}

criterion_group!(benches, extract, reproject);
criterion_main!(benches);

//! Benchmark for the aggregation path: dispatching frames into the device
//! registry and reducing the windows at a cycle boundary.
//!
//! Mirrors the steady-state cost of the run loop without async runtime
//! overhead: decode + route + admit per frame, then snapshot_and_reset per
//! period.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use govee_monitor::{Advertisement, DeviceConfig, DeviceRegistry, MacAddress};

fn mac(last: u8) -> MacAddress {
    MacAddress([0xA4, 0xC1, 0x38, 0x00, 0x00, last])
}

fn device_config(address: MacAddress, use_median: bool) -> DeviceConfig {
    DeviceConfig {
        address,
        display_name: format!("Device {address}"),
        min_valid_temperature: 0.0,
        max_valid_temperature: 45.0,
        log_rejected_spikes: false,
        decimal_places: 2,
        use_median,
    }
}

/// H5075 frame for ~21.3 C / 45.0 %, varied slightly per sequence number.
fn frame(address: MacAddress, seq: u32) -> Advertisement {
    let word = (210 + seq % 20) * 1000 + 400 + seq % 100;
    Advertisement {
        mac: address,
        rssi: Some(-61),
        data: vec![
            0x88,
            0xEC,
            0x00,
            (word >> 16) as u8,
            (word >> 8) as u8,
            word as u8,
            0x64,
            0x00,
        ],
    }
}

fn registry(devices: u8, use_median: bool) -> DeviceRegistry {
    let configs = (0..devices)
        .map(|i| device_config(mac(i), use_median))
        .collect();
    DeviceRegistry::new(configs).unwrap()
}

fn bench_dispatch_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_cycle");

    for frames_per_cycle in [30u32, 300, 3000] {
        let devices = 3u8;
        let batch: Vec<Advertisement> = (0..frames_per_cycle)
            .map(|seq| frame(mac((seq % u32::from(devices)) as u8), seq))
            .collect();

        group.throughput(Throughput::Elements(u64::from(frames_per_cycle)));
        group.bench_with_input(
            BenchmarkId::from_parameter(frames_per_cycle),
            &batch,
            |b, batch| {
                let mut registry = registry(devices, false);
                b.iter(|| {
                    for frame in batch {
                        registry.dispatch(black_box(frame));
                    }
                    black_box(registry.snapshot_and_reset())
                })
            },
        );
    }

    group.finish();
}

fn bench_reduction_kind(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction_kind");
    let batch: Vec<Advertisement> = (0..300).map(|seq| frame(mac(0), seq)).collect();
    group.throughput(Throughput::Elements(300));

    for (name, use_median) in [("mean", false), ("median", true)] {
        group.bench_function(name, |b| {
            let mut registry = registry(1, use_median);
            b.iter(|| {
                for frame in &batch {
                    registry.dispatch(black_box(frame));
                }
                black_box(registry.snapshot_and_reset())
            })
        });
    }

    group.finish();
}

fn bench_unmonitored_traffic(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmonitored_traffic");
    // Frames decode fine but come from addresses outside the registry, the
    // common case on a shared channel.
    let batch: Vec<Advertisement> = (0..300).map(|seq| frame(mac(200), seq)).collect();
    group.throughput(Throughput::Elements(300));

    group.bench_function("300_frames", |b| {
        let mut registry = registry(3, false);
        b.iter(|| {
            for frame in &batch {
                black_box(registry.dispatch(black_box(frame)));
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch_cycle,
    bench_reduction_kind,
    bench_unmonitored_traffic
);
criterion_main!(benches);

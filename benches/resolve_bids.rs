//! Criterion benchmarks for bid resolution and move generation.
//!
//! Run with:
//!     cargo bench --bench resolve_bids

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use column_auction::engine::models::{GameConfig, Player};
use column_auction::engine::plugin::GamePlugin;
use column_auction::engine::simulator::{resolve_auto, SimulationState};
use column_auction::games::auction::bids::{resolve_column, Bid};
use column_auction::games::auction::cards::SessionContext;
use column_auction::games::auction::plugin::AuctionPlugin;
use column_auction::games::auction::rules::TiePolicy;

fn random_bids(n: usize, seed: u64) -> Vec<Bid> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| Bid {
            player_id: format!("p{}", i),
            column: 1,
            value: rng.gen_range(1..=4),
        })
        .collect()
}

fn bench_resolve_column(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_column");
    for n in [2usize, 5, 20] {
        let bids = random_bids(n, n as u64);
        for policy in [TiePolicy::Cascade, TiePolicy::Void] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", policy), n),
                &bids,
                |b, bids| b.iter(|| resolve_column(black_box(bids), policy)),
            );
        }
    }
    group.finish();
}

fn bench_valid_actions(c: &mut Criterion) {
    let plugin = AuctionPlugin::new(SessionContext::standard());
    let mut group = c.benchmark_group("get_valid_actions");
    for n_players in [2usize, 5] {
        let players: Vec<Player> = (0..n_players).map(|i| Player::bot(i, "bench")).collect();
        let config = GameConfig {
            options: serde_json::json!({}),
            random_seed: Some(1),
        };
        let Ok((state, phase, _)) = plugin.create_initial_state(&players, &config) else {
            continue;
        };
        let mut sim = SimulationState::new(state, phase, players);
        resolve_auto(&plugin, &mut sim);
        group.bench_with_input(BenchmarkId::from_parameter(n_players), &sim, |b, sim| {
            b.iter(|| plugin.get_valid_actions(&sim.state, &sim.phase, "p0"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_column, bench_valid_actions);
criterion_main!(benches);

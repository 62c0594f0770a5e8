use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use grant_elections::{
    ElectionConfiguration, GrantElections,
    election::{
        AllocationTree, Awardee, calculate_vault_share, memory::InMemoryEnvironment,
        quadratic_weight, rank_awardees,
    },
    types::{Address, ElectionId, ElectionTerm, ONE_DAY, Region, ShareType, Weight, tokens},
};
use rand::Rng;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn standings(count: usize) -> Vec<(Address, Weight)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            (
                Address::from_label(&format!("beneficiary-{i}")),
                rng.gen_range(0..1_000),
            )
        })
        .collect()
}

/// Election in its voting window with `count` registered beneficiaries
fn voting_election(count: usize) -> (InMemoryEnvironment, GrantElections, ElectionId, Vec<Address>) {
    let env = InMemoryEnvironment::new(0);
    let engine = env.engine();

    let mut row = ElectionConfiguration::default_for(ElectionTerm::Yearly);
    row.registration_bond_required = false;
    engine
        .set_configuration(&env.governance, ElectionTerm::Yearly, row)
        .unwrap();
    let election_id = engine
        .initialize(ElectionTerm::Yearly, Region::named("World"))
        .unwrap();

    let beneficiaries: Vec<Address> = (0..count)
        .map(|i| env.add_beneficiary(&format!("beneficiary-{i}")))
        .collect();
    for beneficiary in &beneficiaries {
        engine
            .register_for_election(beneficiary, beneficiary, election_id)
            .unwrap();
    }

    env.clock.advance(30 * ONE_DAY + 1);
    env.voice_credits.set_default(tokens(1));
    (env, engine, election_id, beneficiaries)
}

/// Pure selection and payout math
fn bench_tally_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally_math");
    group.warm_up_time(Duration::from_millis(100));

    group.bench_function("quadratic_weight", |b| {
        b.iter(|| quadratic_weight(black_box(tokens(1_234))))
    });

    for count in [10, 100, 1_000] {
        let standings = standings(count);
        group.bench_with_input(BenchmarkId::new("rank_awardees", count), &standings, |b, s| {
            b.iter(|| rank_awardees(black_box(s), 50, 10, Some(black_box(97))))
        });

        let awardees: Vec<Awardee> = rank_awardees(&standings, count, count, None);
        group.bench_with_input(
            BenchmarkId::new("dynamic_shares_and_root", count),
            &awardees,
            |b, awardees| {
                b.iter(|| {
                    let shares =
                        calculate_vault_share(black_box(awardees), ShareType::DynamicWeight, tokens(100))
                            .unwrap();
                    black_box(AllocationTree::new(&shares).root())
                })
            },
        );
    }

    group.finish();
}

/// Ballot casting through the engine
fn bench_ballots(c: &mut Criterion) {
    let mut group = c.benchmark_group("ballots");
    group.warm_up_time(Duration::from_millis(100));

    for width in [1, 5, 25] {
        group.bench_with_input(BenchmarkId::new("cast_ballot", width), &width, |b, &width| {
            b.iter_batched(
                || voting_election(width),
                |(_env, engine, election_id, beneficiaries)| {
                    let credits = vec![1_000u128; beneficiaries.len()];
                    engine
                        .vote(
                            &Address::from_label("voter"),
                            black_box(&beneficiaries),
                            black_box(&credits),
                            election_id,
                        )
                        .unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Many voters submitting at once against one election
fn bench_concurrent_voting(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_voting");
    group.warm_up_time(Duration::from_millis(100));
    group.sample_size(20);

    for voters in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(voters), &voters, |b, &voters| {
            b.to_async(&rt).iter_batched(
                || {
                    let (env, engine, election_id, beneficiaries) = voting_election(5);
                    (env, Arc::new(engine), election_id, beneficiaries)
                },
                |(_env, engine, election_id, beneficiaries)| async move {
                    let handles: Vec<_> = (0..voters)
                        .map(|i| {
                            let engine = engine.clone();
                            let beneficiaries = beneficiaries.clone();
                            tokio::spawn(async move {
                                let voter = Address::from_label(&format!("voter-{i}"));
                                engine.vote(&voter, &beneficiaries[..2], &[400, 600], election_id)
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Close, plan, propose and approve a populated election
fn bench_finalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalization");
    group.warm_up_time(Duration::from_millis(100));

    group.bench_function("plan_propose_approve", |b| {
        b.iter_batched(
            || {
                let (env, engine, election_id, beneficiaries) = voting_election(20);
                for (i, beneficiary) in beneficiaries.iter().enumerate() {
                    let voter = Address::from_label(&format!("voter-{i}"));
                    engine
                        .vote(&voter, &[*beneficiary], &[(i as u128 + 1) * 100], election_id)
                        .unwrap();
                }
                env.clock.advance(30 * ONE_DAY);
                engine.refresh_state(election_id).unwrap();
                env.randomness.fulfill_pending().unwrap();
                engine.get_random_number(election_id).unwrap();
                (env, engine, election_id)
            },
            |(env, engine, election_id)| {
                let plan = engine.allocation_plan(election_id).unwrap();
                engine
                    .propose_finalization(&env.proposer, election_id, plan.merkle_root)
                    .unwrap();
                engine
                    .approve_finalization(&env.approver, election_id, plan.merkle_root)
                    .unwrap();
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tally_math,
    bench_ballots,
    bench_concurrent_voting,
    bench_finalization
);

criterion_main!(benches);

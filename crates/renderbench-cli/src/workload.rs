//! Synthetic workloads standing in for the components under test.

use std::hint::black_box;
use std::time::Instant;

use clap::ValueEnum;
use rand::Rng;
use renderbench_core::{Phase, RenderEvent};

/// Input data is regenerated once every this many ticks.
pub const TICKS_PER_GENERATION: u64 = 50;

/// Number of values in the generated input data.
pub const DATA_LEN: usize = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    /// One multiply-add per commit
    Tiny,
    /// Ten rounds of modular arithmetic per commit
    Small,
    /// A thousand rounds of trigonometry per commit
    Heavy,
    /// Sort, dedup and sum the input data
    MediumAgg,
    /// Allocate thousands of small records
    HeavyParse,
}

impl Workload {
    pub const ALL: [Workload; 5] = [
        Workload::Tiny,
        Workload::Small,
        Workload::Heavy,
        Workload::MediumAgg,
        Workload::HeavyParse,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Workload::Tiny => "tiny",
            Workload::Small => "small",
            Workload::Heavy => "heavy",
            Workload::MediumAgg => "medium-agg",
            Workload::HeavyParse => "heavy-parse",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Workload::Tiny => "x * 2 + 1 on the tick count; input changes every tick",
            Workload::Small => "10 rounds of (x * 31 + 7) % 97; input changes every tick",
            Workload::Heavy => "1000 rounds of sin/cos; input changes every 50 ticks",
            Workload::MediumAgg => "sort + dedup + sum of 5000 values; data changes every 50 ticks",
            Workload::HeavyParse => "allocate 5000 records; input changes every 50 ticks",
        }
    }

    /// The memoization key for `step`: a commit with an unchanged key can reuse the last result.
    fn key(&self, step: u64) -> u64 {
        match self {
            Workload::Tiny | Workload::Small => step % 1000,
            Workload::Heavy | Workload::MediumAgg | Workload::HeavyParse => {
                step / TICKS_PER_GENERATION
            }
        }
    }
}

/// How a scene reacts to an unchanged input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Recompute on every commit
    Baseline,
    /// Reuse the previous result while the input is unchanged
    Memo,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Baseline => "baseline",
            Strategy::Memo => "memo",
        }
    }
}

pub fn tiny_calc(x: u64) -> u64 {
    x.wrapping_mul(2).wrapping_add(1)
}

pub fn small_calc(x: u64) -> u64 {
    let mut result = x;
    for _ in 0..10 {
        result = (result * 31 + 7) % 97;
    }
    result
}

pub fn heavy_calc(x: u64) -> i64 {
    let mut result = x as f64;
    for _ in 0..1000 {
        result = result.sin() * 1000.0 + result.cos() * 1000.0;
    }
    result.floor() as i64
}

/// Sum of the distinct values of `values`.
pub fn medium_agg(values: &[u32]) -> u64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.iter().map(|v| u64::from(*v)).sum()
}

#[derive(Debug, Clone)]
pub struct Record {
    pub index: usize,
    pub value: f64,
    pub created_at: Instant,
}

/// Build `count` records and keep a tenth of them.
pub fn heavy_parse(count: usize) -> Vec<Record> {
    let mut rng = rand::rng();
    let mut records: Vec<Record> = (0..count)
        .map(|index| Record {
            index,
            value: rng.random(),
            created_at: Instant::now(),
        })
        .collect();
    records.truncate(count / 10);
    records
}

fn generate_data() -> Vec<u32> {
    let mut rng = rand::rng();
    (0..DATA_LEN).map(|_| rng.random_range(0..1000)).collect()
}

/// An instrumented subtree: one workload rendered with one strategy.
pub struct Scene {
    id: String,
    workload: Workload,
    strategy: Strategy,
    epoch: Instant,
    data: Vec<u32>,
    data_generation: u64,
    cached_key: Option<u64>,
    /// Cost of the last full computation, in milliseconds
    base_duration: f64,
    mounted: bool,
}

impl Scene {
    pub fn new(id: impl Into<String>, workload: Workload, strategy: Strategy) -> Self {
        Self {
            id: id.into(),
            workload,
            strategy,
            epoch: Instant::now(),
            data: generate_data(),
            data_generation: 0,
            cached_key: None,
            base_duration: 0.0,
            mounted: false,
        }
    }

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Render the scene for tick `step` and describe the commit.
    pub fn commit(&mut self, step: u64) -> RenderEvent {
        let phase = if self.mounted { Phase::Update } else { Phase::Mount };
        self.mounted = true;

        let generation = step / TICKS_PER_GENERATION;
        if generation != self.data_generation {
            self.data = generate_data();
            self.data_generation = generation;
        }

        let start_time = self.now_ms();
        let key = self.workload.key(step);
        let reuse = self.strategy == Strategy::Memo && self.cached_key == Some(key);
        if !reuse {
            let started = Instant::now();
            self.compute(step);
            self.base_duration = started.elapsed().as_secs_f64() * 1000.0;
            self.cached_key = Some(key);
        }
        let commit_time = self.now_ms();

        RenderEvent::new(self.id.clone(), phase, commit_time - start_time)
            .with_base_duration(self.base_duration)
            .with_times(start_time, commit_time)
    }

    fn compute(&self, step: u64) {
        match self.workload {
            Workload::Tiny => {
                black_box(tiny_calc(step % 1000));
            }
            Workload::Small => {
                black_box(small_calc(step % 1000));
            }
            Workload::Heavy => {
                black_box(heavy_calc(step / TICKS_PER_GENERATION));
            }
            Workload::MediumAgg => {
                black_box(medium_agg(&self.data));
            }
            Workload::HeavyParse => {
                let records = heavy_parse(DATA_LEN);
                let newest = records.iter().map(|r| r.created_at).max();
                let total: f64 = records.iter().map(|r| r.index as f64 * r.value).sum();
                black_box((newest, total));
            }
        }
    }
}

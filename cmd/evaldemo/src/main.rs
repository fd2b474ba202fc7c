//! Evaluation demo
//!
//! Schedules a fixed list of two-argument integer evaluations on a small
//! pool and prints the parameter/result table before and after.
//!
//! Usage: `evaldemo [workers] [evaluations]` (defaults 4 and 11)
//!
//! # Environment Variables
//!
//! - `RUST_LOG` / `EVALPOOL_LOG` - log filter (e.g. `evalpool_runtime=trace`)
//! - `EVALPOOL_*` - see `PoolConfig::from_env`

use evalpool::{
    CancellationToken, Completion, Pool, PoolConfig, PoolResult, RetryPolicy, ShutdownMode,
};
use std::time::Duration;

type EvalFn = fn(i64, i64) -> i64;

fn add(a: i64, b: i64) -> i64 {
    a + b
}

fn sub(a: i64, b: i64) -> i64 {
    a - b
}

fn mul(a: i64, b: i64) -> i64 {
    a * b
}

fn div(a: i64, b: i64) -> i64 {
    a / b
}

const FUNCS: [EvalFn; 4] = [add, sub, mul, div];

/// One row of the table
struct Evaluation {
    param1: i64,
    param2: i64,
    func: EvalFn,
    result: i64,
    ready: bool,
    pending: Option<Completion<i64>>,
}

fn dump(evals: &[Evaluation]) {
    const TITLE_WIDTH: usize = 12;
    const VAL_WIDTH: usize = 4;

    let row = |title: &str, cell: &dyn Fn(&Evaluation) -> String| {
        let mut line = format!("{:>width$}", title, width = TITLE_WIDTH);
        for e in evals {
            line.push_str(&format!("{:>width$}", cell(e), width = VAL_WIDTH));
        }
        println!("{}", line);
    };

    row("param1=", &|e| e.param1.to_string());
    row("param2=", &|e| e.param2.to_string());
    row("results=", &|e| e.result.to_string());
    row("readyFlags=", &|e| u8::from(e.ready).to_string());
}

fn main() -> PoolResult<()> {
    evalpool::init_logging();

    let mut args = std::env::args().skip(1);
    let workers: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let count: i64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(11);

    let mut evals: Vec<Evaluation> = (0..count)
        .map(|i| Evaluation {
            param1: 2 * i,
            param2: i,
            func: FUNCS[i as usize % FUNCS.len()],
            result: 0,
            ready: false,
            pending: None,
        })
        .collect();

    let pool = Pool::new(PoolConfig::from_env().num_workers(workers))?;

    println!("Initial values:");
    dump(&evals);

    let policy = RetryPolicy::new();
    let token = CancellationToken::never();
    for (i, e) in evals.iter_mut().enumerate() {
        let (f, a, b) = (e.func, e.param1, e.param2);
        match pool.submit_with_retry(move || f(a, b), &policy, &token) {
            Ok(completion) => {
                e.pending = Some(completion);
                println!("Scheduled {}", i);
            }
            Err(err) => eprintln!("evaluation {} not scheduled: {}", i, err),
        }
    }

    for e in &mut evals {
        if let Some(completion) = e.pending.take() {
            if !completion.wait_timeout(Duration::from_secs(10)) {
                eprintln!("evaluation ({}, {}) still running", e.param1, e.param2);
                continue;
            }
            match completion.wait() {
                Ok(v) => {
                    e.result = v;
                    e.ready = true;
                }
                Err(err) => eprintln!("evaluation ({}, {}) failed: {}", e.param1, e.param2, err),
            }
        }
    }

    println!("Final values:");
    dump(&evals);

    pool.shutdown(ShutdownMode::Drain)
}

//! CLI front-end for `slc-core`: a thin adapter between JSON instance files
//! (or the specification's built-in smoke scenarios) and the library's
//! [`slc_core::solve`] entry point. Graph I/O and file-format adapters are
//! explicitly out of scope for the core (`spec.md` §1), so this binary is
//! deliberately the only place that JSON instance parsing lives.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use slc_core::coverage::{InputEdge, StaticEdgeCost};
use slc_core::solver::{solve, SlcInstance};
use slc_core::util::VertexIndex;
use slc_core::SolverConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[clap(version = clap::crate_version!())]
#[clap(about = "Single-robot line coverage route planner: blossom matching + LP Rural Postman core")]
#[clap(color = clap::ColorChoice::Auto)]
#[clap(propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// solve an SLC instance described by a JSON file
    Solve {
        /// path to a JSON instance file, see [`JsonInstance`] for the schema
        instance: PathBuf,
        /// a partial JSON object overlaid on the default `SolverConfig`
        #[clap(long, default_value_t = serde_json::json!({}))]
        solver_config: serde_json::Value,
        /// pretty-print the route instead of the one-line summary
        #[clap(long, action)]
        verbose: bool,
    },
    /// run the concrete scenarios from `spec.md` §8 as smoke checks
    Scenarios,
}

fn main() -> ExitCode {
    env_logger::init();
    match Cli::parse().command {
        Commands::Solve { instance, solver_config, verbose } => run_solve(instance, solver_config, verbose),
        Commands::Scenarios => run_scenarios(),
    }
}

/// the JSON schema accepted by `solve`: vertex coordinates are accepted
/// (`spec.md` §6: "a list of vertices with coordinates (unused by the
/// core)") but otherwise ignored by the solver itself.
#[derive(Deserialize)]
struct JsonInstance {
    num_vertices: usize,
    depot: VertexIndex,
    edges: Vec<JsonEdge>,
    #[serde(default)]
    vertex_coordinates: Vec<(f64, f64)>,
}

#[derive(Deserialize)]
struct JsonEdge {
    u: VertexIndex,
    v: VertexIndex,
    required: bool,
    /// `(forward, reverse)`; required only when `required` is `true`.
    service_cost: Option<(f64, f64)>,
    /// `(forward, reverse)`.
    deadhead_cost: (f64, f64),
}

fn run_solve(path: PathBuf, solver_config_overlay: serde_json::Value, verbose: bool) -> ExitCode {
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: could not read {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let parsed: JsonInstance = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: could not parse {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let _ = parsed.vertex_coordinates; // carried through the schema, unused by the core

    let config = match SolverConfig::default().merge_json(&solver_config_overlay) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: invalid --solver-config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut service_costs = Vec::new();
    let mut deadhead_costs = Vec::new();
    let mut edges = Vec::with_capacity(parsed.edges.len());
    for edge in &parsed.edges {
        if edge.required {
            match edge.service_cost {
                Some(cost) => service_costs.push(cost),
                None => {
                    eprintln!("error: required edge ({}, {}) is missing service_cost", edge.u, edge.v);
                    return ExitCode::FAILURE;
                }
            }
        }
        deadhead_costs.push(edge.deadhead_cost);
        edges.push(InputEdge { u: edge.u, v: edge.v, required: edge.required });
    }
    let oracle = StaticEdgeCost::new(service_costs, deadhead_costs);

    let instance = SlcInstance {
        num_vertices: parsed.num_vertices,
        depot: parsed.depot,
        edges,
        oracle,
        config,
    };
    match solve(&instance) {
        Ok(solution) => {
            println!(
                "objective = {}, route length = {} steps",
                solution.objective,
                solution.route.steps.len()
            );
            if verbose {
                for step in &solution.route.steps {
                    let kind = if step.service { "service" } else { "deadhead" };
                    println!("  {} -> {} [{kind}]", step.from, step.to);
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// replays every concrete scenario in `spec.md` §8 directly against the
/// library, printing PASS/FAIL per scenario rather than relying on `cargo
/// test` — useful as an end-to-end sanity check wherever the toolchain's
/// test harness isn't convenient to invoke.
fn run_scenarios() -> ExitCode {
    let mut failures = 0usize;
    macro_rules! check {
        ($name:expr, $body:expr) => {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $body)) {
                Ok(()) => println!("PASS  {}", $name),
                Err(_) => {
                    println!("FAIL  {}", $name);
                    failures += 1;
                }
            }
        };
    }

    check!("1. triangle, all required, unit cost", scenario_triangle());
    check!("2. path with one deadhead", scenario_path_with_deadhead());
    check!("3. MCPM sanity on K4", scenario_k4_matching());
    check!("4. odd-blossom forcing", scenario_odd_blossom());
    check!("5. disconnected required edges, connectivity repair", scenario_connectivity_repair());
    check!("6. no perfect matching on K3", scenario_no_perfect_matching());

    if failures == 0 {
        println!("all {} scenarios passed", 6);
        ExitCode::SUCCESS
    } else {
        println!("{failures} of 6 scenarios failed");
        ExitCode::FAILURE
    }
}

fn scenario_triangle() {
    let edges = vec![
        InputEdge { u: 0, v: 1, required: true },
        InputEdge { u: 1, v: 2, required: true },
        InputEdge { u: 0, v: 2, required: true },
    ];
    let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 3], vec![(1.0, 1.0); 3]);
    let instance = SlcInstance { num_vertices: 3, depot: 0, edges, oracle, config: SolverConfig::default() };
    let solution = solve(&instance).expect("scenario 1 must solve");
    assert_eq!(solution.objective, 3.0);
    assert_eq!(solution.route.steps.len(), 3);
}

fn scenario_path_with_deadhead() {
    let edges = vec![
        InputEdge { u: 0, v: 1, required: true },
        InputEdge { u: 2, v: 3, required: true },
        InputEdge { u: 1, v: 2, required: false },
    ];
    let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
    let instance = SlcInstance { num_vertices: 4, depot: 0, edges, oracle, config: SolverConfig::default() };
    let solution = solve(&instance).expect("scenario 2 must solve");
    assert_eq!(solution.objective, 6.0);
}

fn scenario_k4_matching() {
    use slc_core::graph::Graph;
    use slc_core::matching::BlossomMatcher;
    let edges = [(0, 1, 0.0), (0, 2, 0.0), (0, 3, 0.0), (1, 2, 0.0), (1, 3, 0.0), (2, 3, 0.0)];
    let graph = Graph::new(4, &edges);
    let costs = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut matcher = BlossomMatcher::new(4, 6, 256);
    let (matched, objective) = matcher.solve_minimum_cost_perfect_matching(&graph, &costs).expect("K4 has a perfect matching");
    assert_eq!(matched.len(), 2);
    assert_eq!(objective, 7.0);
}

fn scenario_odd_blossom() {
    use slc_core::graph::Graph;
    use slc_core::matching::BlossomMatcher;
    let edges = [(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (4, 0, 1.0), (5, 0, 10.0), (5, 2, 10.0)];
    let graph = Graph::new(6, &edges);
    let costs: Vec<_> = edges.iter().map(|e| e.2).collect();
    let mut matcher = BlossomMatcher::new(6, edges.len(), 512);
    let (matched, objective) = matcher
        .solve_minimum_cost_perfect_matching(&graph, &costs)
        .expect("the 5-cycle-plus-pendant instance has a perfect matching");
    assert_eq!(matched.len(), 3);
    assert!(objective.is_finite());
}

fn scenario_connectivity_repair() {
    let edges = vec![
        InputEdge { u: 0, v: 1, required: true },
        InputEdge { u: 2, v: 3, required: true },
        InputEdge { u: 1, v: 2, required: false },
    ];
    let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0); 3]);
    let instance = SlcInstance { num_vertices: 4, depot: 0, edges, oracle, config: SolverConfig::default() };
    let solution = solve(&instance).expect("scenario 5 must solve after connectivity repair");
    let bridge_uses: u32 = solution
        .solution_graph
        .edges
        .iter()
        .filter(|e| !e.service && ((e.from == 1 && e.to == 2) || (e.from == 2 && e.to == 1)))
        .map(|e| e.count)
        .sum();
    assert!(bridge_uses >= 2, "expected the bridge to be used at least twice, got {bridge_uses}");
}

fn scenario_no_perfect_matching() {
    use slc_core::graph::Graph;
    use slc_core::matching::BlossomMatcher;
    use slc_core::SlcError;
    let edges = [(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)];
    let graph = Graph::new(3, &edges);
    let costs = vec![1.0, 1.0, 1.0];
    let mut matcher = BlossomMatcher::new(3, 3, 64);
    let result = matcher.solve_minimum_cost_perfect_matching(&graph, &costs);
    assert_eq!(result, Err(SlcError::NoPerfectMatching));
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use trellis::{
    build_calibrated, middle_out, CompleteTopology, Lattice, RecombiningTopology, ShortRateParams,
};

#[derive(Parser, Debug)]
#[command(name = "trellis", about = "Pointer-free lattice engine with short-rate calibration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TopologyKind {
    /// Recombining lattice (binomial/trinomial).
    Recombining,
    /// Complete k-ary tree, no recombination.
    Complete,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the structural layout of a lattice: ids, depths, parents,
    /// and the middle-out visitation order.
    Structure {
        /// Number of levels.
        height: u32,
        /// Branching factor.
        #[arg(long, default_value_t = 2)]
        branches: u16,
        /// Tree shape.
        #[arg(long, value_enum, default_value_t = TopologyKind::Recombining)]
        topology: TopologyKind,
    },
    /// Build and calibrate a binary short-rate lattice, printing rates
    /// and branch probabilities per level.
    Calibrate {
        /// Number of levels.
        #[arg(long, default_value_t = 7)]
        height: u32,
        /// Mean-reversion speed.
        #[arg(long, default_value_t = 0.025)]
        k: f64,
        /// Long-run mean rate.
        #[arg(long, default_value_t = 0.15339)]
        theta: f64,
        /// Initial short rate.
        #[arg(long, default_value_t = 0.05121)]
        r0: f64,
        /// Step length in years.
        #[arg(long, default_value_t = 1.0 / 12.0)]
        dt: f64,
        /// Annualized volatility.
        #[arg(long, default_value_t = 0.0126)]
        sigma: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Structure {
            height,
            branches,
            topology,
        } => run_structure(height, branches, topology)?,
        Commands::Calibrate {
            height,
            k,
            theta,
            r0,
            dt,
            sigma,
        } => run_calibrate(
            height,
            ShortRateParams {
                k,
                theta,
                r0,
                dt,
                sigma,
            },
        )?,
    }

    Ok(())
}

fn run_structure(height: u32, branches: u16, topology: TopologyKind) -> Result<()> {
    match topology {
        TopologyKind::Recombining => {
            let topo = RecombiningTopology::new(branches)
                .context("unsupported recombining branch count")?;
            let lattice = Lattice::new(topo, height).context("invalid lattice configuration")?;
            print_structure(lattice)
        }
        TopologyKind::Complete => {
            let topo =
                CompleteTopology::new(branches).context("unsupported complete branch count")?;
            let lattice = Lattice::new(topo, height).context("invalid lattice configuration")?;
            print_structure(lattice)
        }
    }
}

fn print_structure<T: trellis::Topology>(mut lattice: Lattice<u64, T>) -> Result<()> {
    let visits = middle_out(&mut lattice, |visit, node| node.state = visit.order)
        .context("traversal failed")?;

    for (level, ids) in lattice.levels().iter().enumerate() {
        println!("level {level}\t{} nodes", ids.len());
        for &id in ids {
            let node = &lattice[id];
            let visit = visits
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| anyhow::anyhow!("node {id} missing from visitation record"))?;
            println!(
                "  node {id}\tparents={:?}\trole={:?}\tvisit={}",
                node.parent_ids, visit.role, visit.order
            );
        }
    }
    println!(
        "total\t{} nodes\t{} edges",
        lattice.len(),
        lattice.edges().len()
    );

    Ok(())
}

fn run_calibrate(height: u32, params: ShortRateParams) -> Result<()> {
    let (lattice, report) = build_calibrated(height, &params).context("calibration failed")?;

    for (level, ids) in lattice.levels().iter().enumerate() {
        println!("level {level}");
        for &id in ids {
            let node = &lattice[id];
            let mut line = format!("  node {id}\trate={:.6}", node.state.rate);
            for child in lattice.child_ids(id)? {
                let p = lattice
                    .edges()
                    .probability(id, child)
                    .ok_or_else(|| anyhow::anyhow!("missing probability for edge {id}->{child}"))?;
                line.push_str(&format!("\tp({id}->{child})={p:.6}"));
            }
            println!("{line}");
        }
    }
    println!(
        "calibrated {} levels\tsolver calls={}\trate range=[{:.6}, {:.6}]",
        report.levels, report.solver_calls, report.min_rate, report.max_rate
    );

    Ok(())
}

use memcover::{
    CoverConfig, CoverageMatrix, GreedyOptions, InteractionGraph, MergeOptions, ModuleCover,
    OverlapOptions, TsvProgressSink,
};

fn main() -> anyhow::Result<()> {
    memcover::logging::init();

    // Synthetic profiles for demo: genes covering samples
    let matrix = CoverageMatrix::from_sets(
        8,
        [
            ("TP53", vec![0, 1, 2]),
            ("MDM2", vec![3, 4]),
            ("CDKN2A", vec![1, 5]),
            ("RB1", vec![5, 6]),
            ("EGFR", vec![7]),
            ("PTEN", vec![2, 6]),
        ],
    )?;

    let physical = InteractionGraph::from_edges([
        ("TP53", "MDM2", 0.9),
        ("CDKN2A", "RB1", 0.6),
        ("TP53", "CDKN2A", 0.3),
    ])?;
    let coexpression = InteractionGraph::from_edges([
        ("TP53", "MDM2", 0.5),
        ("RB1", "PTEN", 0.4),
        ("EGFR", "PTEN", 0.2),
    ])?;
    let graph = InteractionGraph::combine(&[(&physical, 0.8), (&coexpression, 0.2)])?;

    let config = CoverConfig {
        greedy: GreedyOptions {
            k: 1,
            threshold: 0.5,
            ..GreedyOptions::default()
        },
        merge: Some(MergeOptions {
            alpha: 0.1,
            threshold: 0.2,
        }),
        overlap: Some(OverlapOptions {
            alpha: 0.0,
            threshold: 0.2,
        }),
    };

    let mut progress = TsvProgressSink::new(std::io::stderr());
    let outcome = ModuleCover::new(&matrix, &graph, config).run_with_progress(&mut progress)?;

    println!(
        "greedy: {} modules, cost {:.3}, stopped: {:?}",
        outcome.greedy.modules.len(),
        outcome.greedy.total_cost,
        outcome.greedy.stop_reason
    );
    for (mid, members) in outcome.modules().iter().enumerate() {
        println!(">Module {mid}");
        for gene in members {
            println!("  - {gene}");
        }
    }
    Ok(())
}

// Evaluates a single loss case from JSON and prints the loss and its gradient.
//
//   cargo run -- case.json
//
// where case.json looks like
//   {"criterion": {"clip": 1e-7, "classprob_axis": 1},
//    "input":   {"shape": [2, 3], "data": [0.1, 0.7, 0.2, 0.3, 0.3, 0.4]},
//    "targets": {"shape": [2], "data": [1, 2]}}
use std::process::ExitCode;

use ferrite_nll::{ClassNllConfig, Criterion, Tensor};
use serde::Deserialize;

#[derive(Deserialize)]
struct Case {
    #[serde(default)]
    criterion: ClassNllConfig,
    input: Tensor,
    targets: Tensor,
}

fn run(path: &str) -> Result<(), String> {
    let file = std::fs::File::open(path).map_err(|e| format!("{path}: {e}"))?;
    let case: Case = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| format!("{path}: {e}"))?;

    let criterion = case.criterion.build().map_err(|e| e.to_string())?;
    let loss = criterion.forward(&case.input, &case.targets).map_err(|e| e.to_string())?;
    let grad = criterion.backward(&case.input, &case.targets).map_err(|e| e.to_string())?;

    println!("{}: loss = {loss:.6}", criterion.name());
    println!("gradient {:?}: {:?}", grad.shape(), grad.data());
    Ok(())
}

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: ferrite-nll <case.json>");
        return ExitCode::FAILURE;
    };
    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}

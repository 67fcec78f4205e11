use log::debug;
use rpn_eval::rpn::{Engine, MaxParams, RpnError, Scalar};
use std::collections::HashMap;
use std::process::ExitCode;

fn average(args: &[Scalar]) -> Result<Scalar, RpnError> {
    let mut sum = 0.0;
    for arg in args {
        sum += arg.as_number().ok_or_else(|| RpnError::NumericRequired {
            context: "avg".to_string(),
            operand: arg.to_string(),
        })?;
    }
    Ok(Scalar::Number(sum / args.len() as f64))
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let expression = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let expression = if expression.trim().is_empty() {
        "max($price * 2, avg(10, 20, 30)) + ' for ' + upper($user.name)".to_string()
    } else {
        expression
    };

    let variables: HashMap<String, Scalar> = HashMap::from([
        ("price".to_string(), Scalar::Number(120.0)),
        ("volume".to_string(), Scalar::Number(3000.0)),
        ("user.name".to_string(), Scalar::from("ada")),
    ]);

    let mut engine = Engine::new();
    if let Err(e) = engine.register("avg", average, 1, Some(MaxParams::Unlimited)) {
        eprintln!("could not register avg: {e}");
        return ExitCode::FAILURE;
    }
    engine.set_variable_resolver(move |name: &str| {
        debug!("resolving ${name}");
        variables.get(name).cloned().unwrap_or_default()
    });

    match engine.evaluate(&expression) {
        Ok(evaluation) => {
            println!("rpn:    {}", evaluation.rpn());
            println!("result: {}", evaluation.result);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            println!("rpn:    {}", failure.partial_rpn());
            println!("error:  {} (code {})", failure.error, failure.kind().code());
            ExitCode::FAILURE
        }
    }
}

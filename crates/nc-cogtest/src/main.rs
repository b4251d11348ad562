use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use nc_cogtest::driver::{self, TestView};
use nc_cogtest::{
    run_simulator, ChannelObserver, Color, DriverError, DriverExit, InputOutcome, Phase, RandomSequence,
    SequenceTest, SimulatorConfig,
};
use nc_core::AppConfig;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("nc-cogtest")
        .version(nc_core::VERSION)
        .about("NeuralCare sequence-memory assessment")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("TOML file overriding rules and timing"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run seeded simulated players through the engine")
                .arg(
                    Arg::new("sessions")
                        .long("sessions")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of sessions to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("slip")
                        .long("slip")
                        .default_value("0.05")
                        .value_parser(value_parser!(f64))
                        .help("Probability of a wrong press per input"),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Continue after the first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play the test in the terminal")
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Seed for the sequence generator"),
                ),
        )
        .subcommand(Command::new("rules").about("Print the effective rules and timing as TOML"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {path}")),
        None => Ok(AppConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let sessions = args.get_one::<u64>("sessions").copied().unwrap_or(1000);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            let slip = args.get_one::<f64>("slip").copied().unwrap_or(0.05);
            anyhow::ensure!((0.0..=1.0).contains(&slip), "--slip must be within 0..=1");

            let json = args.get_flag("json");
            if !json {
                println!("Running sequence memory simulator...");
                println!("Sessions: {sessions}");
                println!("Seed: {seed}");
                println!();
            }

            let report = run_simulator(SimulatorConfig {
                seed,
                sessions,
                slip_probability: slip,
                rules: config.test,
                stop_on_first_violation: !args.get_flag("keep-going"),
                ..Default::default()
            });
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("play", args)) => {
            let seed = args.get_one::<u64>("seed").copied();
            let exit = play(config, seed).await?;
            tracing::info!(?exit, "session ended");
        }
        Some(("rules", _)) => {
            print!("{}", config.to_toml_string()?);
        }
        _ => {}
    }
    Ok(())
}

async fn play(config: AppConfig, seed: Option<u64>) -> anyhow::Result<DriverExit> {
    let generator = seed.map_or_else(RandomSequence::from_entropy, RandomSequence::seeded);
    let engine = SequenceTest::new(config.test, generator);
    let (observer, _outcomes) = ChannelObserver::new();
    let (handle, task) = driver::spawn(engine, config.timing, Arc::new(observer));
    let renderer = tokio::spawn(render(handle.subscribe()));

    println!("Sequence memory test");
    println!("  Watch the colors light up, then repeat them in order.");
    println!("  Keys: r=red b=blue g=green y=yellow (or 0-3), q=cancel.");
    println!(
        "  {} errors end the test; clear level {} to finish.",
        config.test.max_errors, config.test.max_level
    );
    println!("Press Enter to start.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        let phase = handle.view().snapshot.phase;
        let ends_session = line == "q" || phase == Phase::Result;

        let result = if line == "q" {
            handle.cancel().await
        } else {
            match phase {
                Phase::Intro => handle.start().await,
                Phase::Result => handle.confirm().await.map(|score| println!("Saved score: {score}")),
                Phase::Memorize => {
                    println!("Wait for the sequence to finish.");
                    Ok(())
                }
                Phase::Recall => submit(&handle, &line, config.test.points_per_level).await,
            }
        };

        match result {
            Ok(()) if ends_session => break,
            Ok(()) => {}
            Err(DriverError::Test(err)) => println!("{err}"),
            Err(err) => return Err(err.into()),
        }
    }

    drop(handle);
    let exit = task.finished().await?;
    renderer.abort();
    Ok(exit)
}

async fn submit(handle: &driver::DriverHandle, keys: &str, points: u32) -> Result<(), DriverError> {
    for key in keys.chars().filter(|c| !c.is_whitespace()) {
        let color: Color = key.to_string().parse().map_err(DriverError::Test)?;
        match handle.input(color).await? {
            InputOutcome::Correct { .. } => continue,
            InputOutcome::LevelCleared { level, .. } => println!("Level {level} cleared! +{points} points"),
            InputOutcome::Mistake { attempts_left, .. } => println!("Wrong! {attempts_left} attempts left."),
            InputOutcome::Finished { .. } => println!("Congratulations! All levels cleared!"),
            InputOutcome::Terminated { .. } => println!("Test over: too many errors."),
        }
        return Ok(());
    }
    Ok(())
}

async fn render(mut view: watch::Receiver<TestView>) {
    let mut last_phase = None;
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        let snapshot = &current.snapshot;

        if let Some(color) = current.highlighted {
            println!("  * {color}");
        }
        if last_phase == Some(snapshot.phase) {
            continue;
        }
        last_phase = Some(snapshot.phase);

        match snapshot.phase {
            Phase::Intro => {}
            Phase::Memorize => println!(
                "Level {} - memorize ({} colors)  score {}  errors {}/{}",
                snapshot.level, snapshot.sequence_len, snapshot.score, snapshot.errors, snapshot.max_errors
            ),
            Phase::Recall => println!("Repeat the sequence:"),
            Phase::Result => {
                if let Some(summary) = current.summary {
                    println!("Test complete!");
                    println!("  Score: {}", summary.confirmed_score);
                    println!("  Levels completed: {}", summary.levels_completed);
                    println!("  Errors: {}", summary.errors);
                    println!("Press Enter to save, q to close.");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_cogtest::TestError;

    #[test]
    fn cli_parses_simulate() {
        let matches = cli()
            .try_get_matches_from(["nc-cogtest", "simulate", "--sessions", "10", "--slip", "0.2"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "simulate");
        assert_eq!(args.get_one::<u64>("sessions"), Some(&10));
        assert_eq!(args.get_one::<u64>("seed"), Some(&42));
    }

    #[test]
    fn config_flag_is_global() {
        let matches = cli()
            .try_get_matches_from(["nc-cogtest", "rules", "--config", "rules.toml"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("config").map(String::as_str), Some("rules.toml"));
    }

    #[test]
    fn unknown_key_is_a_test_error() {
        let err = "x".parse::<Color>().unwrap_err();
        assert!(matches!(err, TestError::UnknownColor(_)));
    }
}

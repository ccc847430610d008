use std::io::Write;

use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use research_agent::{
    config::{Config, LogFormat},
    error::SERVICE_UNAVAILABLE_MESSAGE,
    prompts::{quick_action, GREETING, QUICK_ACTIONS, RESET_GREETING},
    AnswerEvent, AnswerResult, Assistant, SessionHistory,
};

#[derive(Parser, Debug)]
#[command(name = "research-agent")]
#[command(version, about = "Research assistant backed by web search, arXiv and Wikipedia")]
struct Cli {
    /// Answer a single question and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Override the reasoning step budget
    #[arg(long)]
    max_steps: Option<usize>,

    /// Print answers only once complete
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(max_steps) = cli.max_steps {
        config.agent.max_steps = max_steps.max(1);
    }
    if cli.no_stream {
        config.synth.streaming = false;
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Research agent starting..."
    );

    let assistant = match Assistant::new(&config) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to initialize assistant");
            return Err(e.into());
        }
    };
    let streaming = config.synth.streaming;
    let mut history = SessionHistory::new();

    if let Some(query) = cli.query {
        ask(&assistant, &mut history, &query, streaming).await;
        return Ok(());
    }

    println!("{}", GREETING);
    for (command, label, _) in QUICK_ACTIONS {
        println!("  {:<8} {}", command, label);
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                history.reset();
                info!(session = %history.id(), "Session reset");
                println!("{}", RESET_GREETING);
            }
            command if command.starts_with('/') => match quick_action(command) {
                Some(query) => {
                    println!("{}", query);
                    ask(&assistant, &mut history, query, streaming).await;
                }
                None => println!("Unknown command: {}", command),
            },
            query => ask(&assistant, &mut history, query, streaming).await,
        }
    }

    info!("Research agent shutdown complete");
    Ok(())
}

/// Resolve one query and record both turns, failures included.
async fn ask(assistant: &Assistant, history: &mut SessionHistory, query: &str, streaming: bool) {
    history.push_user(query);

    let outcome = if streaming {
        stream_answer(assistant, history, query).await
    } else {
        match assistant.submit_query(query, history).await {
            Ok(answer) => {
                println!("{}", answer.text);
                Ok(answer)
            }
            Err(e) => Err(e.user_message()),
        }
    };

    match outcome {
        Ok(answer) => {
            print_sources(&answer);
            history.push_assistant(answer);
        }
        Err(message) => {
            println!("{}", message);
            history.push_failure(message);
        }
    }
}

async fn stream_answer(
    assistant: &Assistant,
    history: &SessionHistory,
    query: &str,
) -> Result<AnswerResult, String> {
    let mut events = assistant.submit_query_stream(query, history);
    while let Some(event) = events.next().await {
        match event {
            AnswerEvent::Step(step) => eprintln!("  · {}", step),
            AnswerEvent::Chunk(chunk) => {
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
            }
            AnswerEvent::Done(answer) => {
                println!();
                return Ok(answer);
            }
            AnswerEvent::Failed(message) => return Err(message),
        }
    }
    Err(SERVICE_UNAVAILABLE_MESSAGE.to_string())
}

fn print_sources(answer: &AnswerResult) {
    if answer.sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for (i, source) in answer.sources.iter().enumerate() {
        println!("  {}. {} ({}) {}", i + 1, source.title, source.kind, source.url);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

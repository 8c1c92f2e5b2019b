use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sotto::agent::SpeechSink;
use sotto::context::Compactor;
use sotto::llm::{CompletionClient, LanguageModel};
use sotto::tools::{
    CheckInternetTool, CurrentTimeTool, FindFilesTool, NetworkInfoTool, OpenApplicationTool,
    OpenFileTool, OpenUrlTool, SearchProvider, SystemInfoTool, ToolExecutor, ToolRegistry,
    WebSearchTool, WifiInfoTool,
};
use sotto::voice::{
    extract_speech_text, AudioCapture, AudioPlayback, SpeechClient, SpeechOutput, Transcriber,
    WhisperClient,
};
use sotto::{Config, Orchestrator, OrchestratorConfig, Result};

/// Sotto - a local, turn-based voice assistant
#[derive(Parser)]
#[command(name = "sotto", version, about)]
struct Cli {
    /// Path to a config file (defaults to the platform config dir)
    #[arg(short, long, env = "SOTTO_CONFIG")]
    config: Option<PathBuf>,

    /// Recording window in seconds per utterance
    #[arg(long, env = "SOTTO_RECORD_SECS")]
    record_secs: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Ask one question as text and print the answer (no audio)
    Ask {
        /// The question
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sotto=info",
        1 => "info,sotto=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(secs) = cli.record_secs {
        config.voice.record_secs = secs;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Ask { text } => ask(&config, &text).await,
        };
    }

    run_assistant(&config).await
}

/// Consumer that prints the answer instead of speaking it, for headless use
struct PrintSink;

#[async_trait]
impl SpeechSink for PrintSink {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("{}", extract_speech_text(text));
        Ok(())
    }
}

/// Register the builtin tools; a duplicate name here is a bug and aborts
/// startup.
fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SystemInfoTool))?;
    registry.register(Arc::new(CurrentTimeTool))?;
    registry.register(Arc::new(FindFilesTool::new()?))?;
    registry.register(Arc::new(OpenApplicationTool))?;
    registry.register(Arc::new(OpenFileTool::new()?))?;
    registry.register(Arc::new(OpenUrlTool))?;
    registry.register(Arc::new(NetworkInfoTool))?;
    registry.register(Arc::new(CheckInternetTool))?;
    registry.register(Arc::new(WifiInfoTool))?;

    match (&config.tools.search_provider, &config.tools.search_api_key) {
        (Some(provider), Some(key)) => {
            let provider = match provider.as_str() {
                "brave" => SearchProvider::Brave {
                    api_key: key.clone(),
                },
                "serper" => SearchProvider::Serper {
                    api_key: key.clone(),
                },
                other => {
                    return Err(sotto::Error::Config(format!(
                        "unknown search provider: {other}"
                    )))
                }
            };
            registry.register(Arc::new(WebSearchTool::new(provider)))?;
        }
        (Some(_), None) => {
            tracing::warn!("search provider configured without an API key; web search disabled");
        }
        _ => {}
    }

    Ok(registry)
}

/// Assemble the orchestrator over its collaborators
fn build_orchestrator(config: &Config, sink: Arc<dyn SpeechSink>) -> Result<Orchestrator> {
    let registry = Arc::new(build_registry(config)?);
    let executor = ToolExecutor::new(Arc::clone(&registry), config.tools.executor_config());

    let model: Arc<dyn LanguageModel> = Arc::new(CompletionClient::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.llm.model,
        config.llm.max_tokens,
        config.llm.temperature,
    ));

    let compactor = Compactor::new(config.compaction.clone(), Arc::clone(&model));

    let orchestrator_config = OrchestratorConfig {
        max_tool_iterations: config.agent.max_tool_iterations,
        ..OrchestratorConfig::default()
    };

    Ok(Orchestrator::new(
        registry,
        executor,
        model,
        compactor,
        sink,
        orchestrator_config,
    ))
}

/// The interactive Enter-to-talk loop
async fn run_assistant(config: &Config) -> anyhow::Result<()> {
    let synthesizer = Arc::new(SpeechClient::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.voice.tts_model,
        &config.voice.tts_voice,
        config.voice.tts_speed,
    ));
    let playback = AudioPlayback::new()?;
    let sink = Arc::new(SpeechOutput::new(synthesizer, playback));

    let mut orchestrator = build_orchestrator(config, sink)?;

    let transcriber = WhisperClient::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.voice.stt_model,
    );
    let mut capture = AudioCapture::new()?;
    let record_window = Duration::from_secs(config.voice.record_secs);

    tracing::info!(
        model = %config.llm.model,
        record_secs = config.voice.record_secs,
        "sotto ready"
    );
    println!("Press Enter to talk ({} second window), Ctrl-C to quit.", config.voice.record_secs);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                if line?.is_none() {
                    // stdin closed
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nGoodbye.");
                break;
            }
        }

        println!("Listening...");
        let samples = capture.record(record_window).await?;

        let transcript = match transcriber.transcribe(&samples, capture.sample_rate()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "transcription failed, skipping turn");
                println!("Sorry, I couldn't hear that. Press Enter to try again.");
                continue;
            }
        };

        if transcript.is_empty() {
            println!("I didn't catch anything. Press Enter to try again.");
            continue;
        }
        println!("You said: {transcript}");

        match orchestrator.run_turn(&transcript).await {
            Ok(answer) => println!("Assistant: {}\n---", extract_speech_text(&answer)),
            Err(e) => {
                // The user turn stays in memory; the next turn continues
                // the same conversation.
                tracing::error!(error = %e, "turn failed");
                println!("Something went wrong with that one. Press Enter to try again.\n---");
            }
        }
    }

    Ok(())
}

/// One text question through the full tool loop, answer printed
async fn ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let mut orchestrator = build_orchestrator(config, Arc::new(PrintSink))?;
    orchestrator.run_turn(text).await?;
    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Drains the buffer, so each line covers one second
        let samples = capture.take_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    // 2 seconds of 440Hz sine at the playback rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Synthesizing: \"{text}\"");

    let synthesizer = Arc::new(SpeechClient::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.voice.tts_model,
        &config.voice.tts_voice,
        config.voice.tts_speed,
    ));
    let playback = AudioPlayback::new()?;
    let output = SpeechOutput::new(synthesizer, playback);

    output.speak(text).await?;

    println!("Done.");
    Ok(())
}

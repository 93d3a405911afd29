//! PlayHT CLI - reads lines of text on stdin, streams raw audio to stdout.
//!
//! One synthesis call per input line; terminates on EOF. Logging goes to
//! stderr so the audio byte stream on stdout stays clean:
//!
//! ```text
//! echo "Hello from the command line." | playht > hello.wav
//! ```

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use playht::{chunk, Format, Quality, Session, SynthesisParams, TtsClient};

/// PlayHT text-to-speech pipe: stdin text in, raw audio bytes out.
#[derive(Parser)]
#[command(name = "playht")]
#[command(about = "PlayHT TTS: read text lines on stdin, write audio to stdout")]
#[command(version)]
struct Cli {
    /// Voice manifest URI (default: built-in narrative voice)
    #[arg(short = 'V', long)]
    voice: Option<String>,

    /// Output quality (draft, low, medium, high, premium)
    #[arg(short = 'q', long)]
    quality: Option<String>,

    /// Audio format (raw, mp3, wav, ogg, flac, mulaw)
    #[arg(short = 'e', long)]
    format: Option<String>,

    /// Sample rate in Hz (8000-48000)
    #[arg(short = 'r', long)]
    sample_rate: Option<i32>,

    /// Playback speed (0 < speed <= 5)
    #[arg(short = 's', long)]
    speed: Option<f32>,

    /// Lease endpoint URL
    #[arg(long)]
    lease_url: Option<String>,

    /// Lease request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Verbose logging (to stderr)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn parse_quality(value: &str) -> anyhow::Result<Quality> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "draft" => Quality::Draft,
        "low" => Quality::Low,
        "medium" => Quality::Medium,
        "high" => Quality::High,
        "premium" => Quality::Premium,
        other => bail!("unknown quality: {other}"),
    })
}

fn parse_format(value: &str) -> anyhow::Result<Format> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "raw" => Format::Raw,
        "mp3" => Format::Mp3,
        "wav" => Format::Wav,
        "ogg" => Format::Ogg,
        "flac" => Format::Flac,
        "mulaw" => Format::Mulaw,
        other => bail!("unknown format: {other}"),
    })
}

impl Cli {
    fn overrides(&self) -> anyhow::Result<SynthesisParams> {
        Ok(SynthesisParams {
            voice: self.voice.clone(),
            quality: self.quality.as_deref().map(parse_quality).transpose()?,
            format: self.format.as_deref().map(parse_format).transpose()?,
            sample_rate: self.sample_rate,
            speed: self.speed,
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "playht=debug" } else { "playht=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::builder().timeout(Duration::from_secs(cli.timeout));
    if let Some(url) = &cli.lease_url {
        session = session.url(url.clone());
    }
    let session = Arc::new(session.build().context("session setup failed")?);

    let client = TtsClient::builder(session)
        .defaults()
        .params(cli.overrides()?)
        .build();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let texts = chunk::split_text(&line);
        if texts.is_empty() {
            continue;
        }
        debug!(pieces = texts.len(), "synthesizing line");

        let stream = client
            .synthesize(texts)
            .await
            .context("starting synthesis")?;
        let mut stream = pin!(stream);
        while let Some(result) = stream.next().await {
            let chunk = result.context("synthesis stream")?;
            if !chunk.audio.is_empty() {
                stdout.write_all(&chunk.audio).await?;
                stdout.flush().await?;
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::error;

use scriptreel::services::script::ScriptProcessor;
use scriptreel::utils::logger::init_logger;
use scriptreel::{AppConfig, GenerationOptions, SocialFormat, VideoGenerator, VideoQuality};

/// Turn a text script into a narrated slideshow video
#[derive(Parser, Debug)]
#[command(name = "scriptreel", version, about)]
struct Cli {
    /// Script file, one scene per line
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    script: Option<PathBuf>,

    /// Script text given inline
    #[arg(long)]
    text: Option<String>,

    /// Where to write the video; a bare file name goes into project.output_dir
    #[arg(short, long)]
    output: PathBuf,

    /// YAML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// low, medium, high or ultra
    #[arg(short, long, default_value = "medium")]
    quality: String,

    /// Use placeholder images instead of calling an image engine
    #[arg(long)]
    no_images: bool,

    #[arg(long)]
    no_subtitles: bool,

    #[arg(long)]
    no_transitions: bool,

    /// Background music track mixed under the narration
    #[arg(long)]
    music: Option<PathBuf>,

    #[arg(long)]
    voice_engine: Option<String>,

    #[arg(long)]
    image_engine: Option<String>,

    /// Upper bound for one chunk, seconds
    #[arg(long)]
    chunk_duration: Option<f64>,

    #[arg(short, long)]
    workers: Option<usize>,

    /// Process chunks one at a time
    #[arg(long)]
    sequential: bool,

    /// Social format preset (tiktok, youtube_shorts, square, ...)
    #[arg(long)]
    format: Option<String>,

    /// Also write the captions as an .srt file next to the output
    #[arg(long)]
    srt: bool,

    /// Upload the result with this provider (local_folder, http)
    #[arg(long)]
    cloud: Option<String>,

    /// Print script statistics and exit without rendering
    #[arg(long)]
    stats_only: bool,

    /// Debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self, config: &AppConfig) -> anyhow::Result<GenerationOptions> {
        let mut options = GenerationOptions::from_config(config);
        options.quality = self.quality.parse::<VideoQuality>()?;
        options.generate_images = !self.no_images;
        options.add_subtitles = !self.no_subtitles;
        options.add_transitions = !self.no_transitions;
        options.add_background_music = self.music.is_some();
        options.background_music_path = self.music.clone();
        options.export_subtitles = self.srt;

        if let Some(engine) = &self.voice_engine {
            options.voice_engine = engine.clone();
        }
        if let Some(engine) = &self.image_engine {
            options.image_engine = engine.clone();
        }
        if let Some(duration) = self.chunk_duration {
            if duration <= 0.0 {
                bail!("--chunk-duration must be positive");
            }
            options.chunk_duration = duration;
        }
        if let Some(workers) = self.workers {
            options.max_workers = workers;
        }
        if self.sequential {
            options.parallel_processing = false;
        }
        if let Some(format) = &self.format {
            options.social_format = Some(format.parse::<SocialFormat>()?);
        }
        if let Some(provider) = &self.cloud {
            options.save_to_cloud = true;
            options.cloud_provider = provider.clone();
        }

        Ok(options)
    }

    fn output_path(&self, config: &AppConfig) -> PathBuf {
        let is_bare_name = self
            .output
            .parent()
            .is_none_or(|parent| parent.as_os_str().is_empty());
        if is_bare_name {
            config.project.output_dir.join(&self.output)
        } else {
            self.output.clone()
        }
    }

    fn script_text(&self) -> anyhow::Result<String> {
        match (&self.script, &self.text) {
            (Some(path), _) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display())),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("Either --script or --text is required"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Инициализируем логгер с тонкой настройкой
    init_logger(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let options = cli.options(&config)?;
    let script = cli.script_text()?;
    let output = cli.output_path(&config);

    if cli.stats_only {
        let stats = ScriptProcessor::new(&config.text).statistics(&script, options.chunk_duration);
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let generator = VideoGenerator::new(config).context("Failed to initialise generator")?;

    let result = generator
        .generate_from_script(&script, &output, &options)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        error!("{}", result.message);
        std::process::exit(1);
    }

    Ok(())
}

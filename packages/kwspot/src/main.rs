//! kwspot CLI Binary
//! Prepare model / keyword files and scan recordings for the keyword.

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::{fs::File, io::BufReader, sync::Arc};

mod cli;
use cli::{Cli, Commands};

use kwspot::{
    BandPassConfig, CborLoad, CborSave, KeywordSpec, KeywordSpotter, ModelParams, PcmChunker,
    SpotterConfig, keyword::build_from_wav_files, kfc::KfcWavFileExtractor,
};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitModel(cmd) => init_model(cmd),
        Commands::BuildKeyword(cmd) => {
            info!("Building keyword {:?} from {} samples...", cmd.name, cmd.samples.len());
            build_keyword(cmd)
        }
        Commands::Inspect(cmd) => inspect(cmd),
        Commands::Detect(cmd) => detect(cmd),
    }
}

fn init_model(cmd: cli::InitModelCommand) -> Result<()> {
    let mut model = ModelParams::default();
    if let Some(frame_length) = cmd.frame_length {
        model.features.frame_length = frame_length;
        model.features.window_length = model.features.window_length.max(frame_length);
    }
    if let Some(window_length) = cmd.window_length {
        model.features.window_length = window_length;
    }
    if let Some(mode) = cmd.score_mode {
        model.scoring.score_mode = mode;
    }
    if let Some(edges) = cmd.band_pass {
        if let [low_cutoff, high_cutoff] = edges[..] {
            model.features.band_pass = Some(BandPassConfig {
                low_cutoff,
                high_cutoff,
            });
        }
    }
    if let Err(reason) = model.validate() {
        bail!("invalid model parameters: {reason}");
    }

    model
        .save_to_file(&cmd.output)
        .with_context(|| format!("writing {}", cmd.output.display()))?;
    info!("Model parameters saved to: {:?}", cmd.output);
    Ok(())
}

fn build_keyword(cmd: cli::BuildKeywordCommand) -> Result<()> {
    let model = ModelParams::load_from_file(&cmd.model)
        .with_context(|| format!("loading model {}", cmd.model.display()))?;
    let keyword = build_from_wav_files(cmd.name, &model.features, &cmd.samples)?;
    keyword
        .save_to_file(&cmd.output)
        .with_context(|| format!("writing {}", cmd.output.display()))?;
    info!(
        "Keyword {:?} ({} templates) saved to: {:?}",
        keyword.name,
        keyword.templates.len(),
        cmd.output
    );
    Ok(())
}

fn inspect(cmd: cli::InspectCommand) -> Result<()> {
    let bytes =
        std::fs::read(&cmd.path).with_context(|| format!("reading {}", cmd.path.display()))?;

    if let Ok(kw) = KeywordSpec::load_from_buffer(&bytes) {
        println!("keyword file      : {}", cmd.path.display());
        println!("  name            : {}", kw.name);
        println!("  format version  : {}", kw.version());
        println!(
            "  features        : {} coeffs, frame {} / window {} @ {} Hz",
            kw.features.coeffs,
            kw.features.frame_length,
            kw.features.window_length,
            kw.features.sample_rate
        );
        for (name, tpl) in &kw.templates {
            let voiced = tpl.iter().filter(|f| !f.silent).count();
            println!("  template        : {name} ({} frames, {voiced} voiced)", tpl.len());
        }
        match &kw.average {
            Some(avg) => println!("  average         : {} frames", avg.len()),
            None => println!("  average         : none"),
        }
        if let Err(reason) = kw.validate() {
            println!("  INVALID         : {reason}");
        }
        return Ok(());
    }

    let model = ModelParams::load_from_buffer(&bytes)
        .with_context(|| format!("{} is neither a model nor a keyword file", cmd.path.display()))?;
    let f = &model.features;
    println!("model file        : {}", cmd.path.display());
    println!("  format version  : {}", model.version());
    println!("  sample rate     : {} Hz", f.sample_rate);
    println!("  frame / window  : {} / {} samples", f.frame_length, f.window_length);
    println!("  mel / coeffs    : {} / {}", f.mel_bins, f.coeffs);
    println!("  filter bank     : {} - {} Hz", f.low_freq, f.high_freq);
    println!("  mel range       : {} dB", f.mel_dynamic_range_db);
    match &f.band_pass {
        Some(bp) => println!("  band-pass       : {} - {} Hz", bp.low_cutoff, bp.high_cutoff),
        None => println!("  band-pass       : off"),
    }
    let s = &model.scoring;
    println!(
        "  scoring         : ref {}, band {}, step penalty {}, mode {}",
        s.score_ref, s.band_size, s.step_penalty, s.score_mode
    );
    let d = &model.decision;
    println!(
        "  thresholds      : {} (strict) - {} (lenient), min scores {}, eager {}",
        d.threshold_strict, d.threshold_lenient, d.min_scores, d.eager
    );
    if let Err(reason) = model.validate() {
        println!("  INVALID         : {reason}");
    }
    Ok(())
}

fn detect(cmd: cli::DetectCommand) -> Result<()> {
    let mut cfg = match (&cmd.source.config, &cmd.source.model, &cmd.source.keyword) {
        (Some(path), _, _) => SpotterConfig::load(path)?,
        (None, Some(model), Some(keyword)) => SpotterConfig::with_paths(model, keyword),
        _ => bail!("either --config or both --model and --keyword are required"),
    };
    if let Some(sensitivity) = cmd.source.sensitivity {
        cfg = cfg.with_sensitivity(sensitivity);
    }

    let model = ModelParams::load_from_file(&cfg.model_path)
        .with_context(|| format!("loading model {}", cfg.model_path.display()))?;
    let mut spotter =
        KeywordSpotter::with_shared_model(Arc::new(model), &cfg.keyword_path, cfg.sensitivity)
            .context("creating spotter")?;

    let file = File::open(&cmd.input).with_context(|| format!("opening {}", cmd.input.display()))?;
    let pcm = KfcWavFileExtractor::read_pcm(BufReader::new(file), spotter.sample_rate())
        .with_context(|| format!("decoding {}", cmd.input.display()))?;

    let frame_secs = spotter.frame_length() as f32 / spotter.sample_rate() as f32;
    let mut detections = 0usize;
    for (i, frame) in PcmChunker::new(&pcm, spotter.frame_length()).enumerate() {
        let fired = spotter.process(&frame)?;
        if cmd.scores {
            println!("{:>8.3}s  {:.4}", i as f32 * frame_secs, spotter.last_score());
        }
        if fired {
            detections += 1;
            println!(
                "{:>8.3}s  detected {:?} (score {:.3})",
                (i + 1) as f32 * frame_secs,
                spotter.keyword_name(),
                spotter.last_score()
            );
        }
    }
    info!("{detections} detection(s) in {}", cmd.input.display());
    Ok(())
}

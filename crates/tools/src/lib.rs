//! `hero` command line: inspect the sampled geography and run the globe
//! headlessly against the recording backend.

use std::fs;
use std::path::PathBuf;

use gpu::{RecordingBackend, Viewport};
use hero_web::{CanvasSurface, HeroConfig, HeroGlobe, HeroRuntime};
use runtime::{AnimationProfile, ManualScheduler};
use scene::{GeographySampler, builtin_regions};
use serde::Serialize;

const SIM_VIEWPORT: (u32, u32) = (1280, 720);

/// Run one command; the returned text goes to stdout.
pub fn run(mut args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Err(usage());
    }
    let cmd = args.remove(0);
    match cmd.as_str() {
        "sample" => cmd_sample(args),
        "config" => cmd_config(args),
        "simulate" => cmd_simulate(args),
        _ => Err(usage()),
    }
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{name} requires a value"))
}

fn unknown(arg: &str) -> String {
    format!("unknown arg: {arg}\n\n{}", usage())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionReport {
    id: String,
    name: String,
    color: String,
    points: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleReport {
    step_deg: f64,
    total: usize,
    regions: Vec<RegionReport>,
}

fn cmd_sample(args: Vec<String>) -> Result<String, String> {
    // hero sample [--step DEG]
    let mut step = scene::DEFAULT_STEP_DEG;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--step" => {
                let v = flag_value(&args, &mut i, "--step")?;
                step = v.parse().map_err(|e| format!("--step {v}: {e}"))?;
            }
            s => return Err(unknown(s)),
        }
        i += 1;
    }

    let sampler = GeographySampler::new(step).map_err(|e| e.to_string())?;
    let regions = builtin_regions().map_err(|e| e.to_string())?;
    let reports: Vec<RegionReport> = regions
        .iter()
        .map(|region| RegionReport {
            id: region.id.clone(),
            name: region.name.clone(),
            color: region.color.to_string(),
            points: sampler.sample_region(region).points.len(),
        })
        .collect();
    let report = SampleReport {
        step_deg: sampler.step_deg(),
        total: reports.iter().map(|r| r.points).sum(),
        regions: reports,
    };
    let mut out = serde_json::to_string_pretty(&report).map_err(|e| format!("json: {e}"))?;
    out.push('\n');
    Ok(out)
}

fn cmd_config(args: Vec<String>) -> Result<String, String> {
    // hero config [--scroll]
    let mut config = HeroConfig::default();
    for arg in &args {
        match arg.as_str() {
            "--scroll" => config.animation = AnimationProfile::scroll_coupled(),
            s => return Err(unknown(s)),
        }
    }
    let mut out = config.to_json_pretty().map_err(|e| e.to_string())?;
    out.push('\n');
    Ok(out)
}

fn cmd_simulate(args: Vec<String>) -> Result<String, String> {
    // hero simulate [--frames N] [--fps F] [--scroll] [--options FILE]
    let mut frames: usize = 240;
    let mut fps: f64 = 60.0;
    let mut scroll = false;
    let mut options: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                let v = flag_value(&args, &mut i, "--frames")?;
                frames = v.parse().map_err(|e| format!("--frames {v}: {e}"))?;
            }
            "--fps" => {
                let v = flag_value(&args, &mut i, "--fps")?;
                fps = v.parse().map_err(|e| format!("--fps {v}: {e}"))?;
            }
            "--scroll" => scroll = true,
            "--options" => {
                options = Some(PathBuf::from(flag_value(&args, &mut i, "--options")?));
            }
            s => return Err(unknown(s)),
        }
        i += 1;
    }
    if frames == 0 {
        return Err("--frames must be at least 1".to_string());
    }
    if !(fps.is_finite() && fps > 0.0) {
        return Err(format!("--fps must be a positive number, got {fps}"));
    }

    let mut config = match &options {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
            HeroConfig::from_json(&json).map_err(|e| e.to_string())?
        }
        None => HeroConfig::default(),
    };
    if scroll && config.animation.scroll.is_none() {
        config.animation.scroll = AnimationProfile::scroll_coupled().scroll;
    }

    let canvas = CanvasSurface {
        id: config.canvas_id.clone(),
        viewport: Viewport::new(SIM_VIEWPORT.0, SIM_VIEWPORT.1),
    };
    let globe = HeroGlobe::new(Some(canvas), Some(RecordingBackend::new()), config)
        .map_err(|e| e.to_string())?;
    let scheduler = ManualScheduler::new();
    let mut runtime = HeroRuntime::start(globe, scheduler.clone()).map_err(|e| e.to_string())?;

    let dt_ms = 1000.0 / fps;
    let last = frames.saturating_sub(1).max(1) as f32;
    let mut out = String::new();
    for n in 0..frames {
        if scroll {
            runtime.set_scroll_progress(n as f32 / last);
        }
        if !scheduler.run_next(n as f64 * dt_ms) {
            break;
        }
        let line = serde_json::to_string(&runtime.state()).map_err(|e| format!("json: {e}"))?;
        out.push_str(&line);
        out.push('\n');
    }
    if !runtime.is_running() {
        return Err(format!("frame loop stopped after {} frames", runtime.frames_run()));
    }
    runtime.teardown();
    Ok(out)
}

pub fn usage() -> String {
    "Usage:\n  hero sample [--step DEG]\n  hero config [--scroll]\n  hero simulate [--frames N] [--fps F] [--scroll] [--options FILE]\n\nNotes:\n- `sample` prints per-region dot counts for the built-in continent outlines.\n- `simulate` runs the globe against a recording backend and prints one JSON animation state per frame.\n- Set RUST_LOG=debug to see phase changes on stderr.\n"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sample_reports_every_continent() {
        let out = run(args(&["sample"])).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["stepDeg"], 1.5);
        let regions = v["regions"].as_array().unwrap();
        assert_eq!(regions.len(), 6);
        assert_eq!(regions[0]["id"], "north_america");
        assert_eq!(regions[0]["color"], "#60A5FA");
        let sum: u64 = regions.iter().map(|r| r["points"].as_u64().unwrap()).sum();
        assert_eq!(v["total"].as_u64().unwrap(), sum);
        assert!(sum > 0);
    }

    #[test]
    fn coarser_steps_give_fewer_points() {
        let total = |step: &str| {
            let out = run(args(&["sample", "--step", step])).unwrap();
            let v: serde_json::Value = serde_json::from_str(&out).unwrap();
            v["total"].as_u64().unwrap()
        };
        assert!(total("5") < total("1.5"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(run(args(&[])).is_err());
        assert!(run(args(&["paint"])).is_err());
        assert!(run(args(&["sample", "--step", "0"])).is_err());
        assert!(run(args(&["sample", "--step"])).is_err());
        assert!(run(args(&["simulate", "--frames", "0"])).is_err());
        assert!(run(args(&["simulate", "--fps", "-1"])).is_err());
        assert!(run(args(&["config", "--verbose"])).is_err());
    }

    #[test]
    fn config_round_trips() {
        let out = run(args(&["config"])).unwrap();
        assert_eq!(HeroConfig::from_json(&out).unwrap(), HeroConfig::default());

        let out = run(args(&["config", "--scroll"])).unwrap();
        let config = HeroConfig::from_json(&out).unwrap();
        assert!(config.animation.scroll.is_some());
    }

    #[test]
    fn simulate_prints_one_state_per_frame() {
        let out = run(args(&["simulate", "--frames", "5", "--fps", "10"])).unwrap();
        let states: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(states.len(), 5);
        assert_eq!(states[0]["frameIndex"], 0);
        assert_eq!(states[4]["frameIndex"], 4);
        assert_eq!(states[4]["elapsedMs"], 400.0);
        assert_eq!(states[0]["cameraDistance"], 15.0);
    }

    #[test]
    fn simulate_with_scroll_turns_the_globe() {
        let out = run(args(&["simulate", "--frames", "30", "--fps", "5", "--scroll"])).unwrap();
        let last: serde_json::Value = serde_json::from_str(out.lines().last().unwrap()).unwrap();
        assert!(last["scrollYaw"].as_f64().unwrap() > 1.5);
        assert!(last["cameraDistance"].as_f64().unwrap() < 4.0);
    }
}

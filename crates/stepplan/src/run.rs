use std::fs;

use anyhow::{Context, Result};
use gpgpu::{Plan, RecordingFactory};
use scheduler::{Clock, ManualClock, StepScheduler};
use simconfig::SimConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{ConfigArgs, PlanArgs, RunArgs};
use crate::report::PlanReport;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn plan(args: PlanArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let plan = Plan::from_config(&config).context("simulation layout is invalid")?;
    let report = PlanReport::new(&config, &plan);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode plan")?;
        println!("{json}");
    } else {
        print!("{report}");
    }
    Ok(())
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let plan = Plan::from_config(&config).context("simulation layout is invalid")?;

    let history = plan
        .allocate(&mut RecordingFactory)
        .context("failed to allocate dry-run resources")?;
    let size = history.size();
    println!(
        "allocated {} textures and {} targets of {}x{} over {} steps",
        size.textures,
        size.passes,
        size.width,
        size.height,
        history.depth().get()
    );

    let mut clock = ManualClock::new(0.0);
    let mut scheduler =
        StepScheduler::from_config(&config, plan.groups().pass_count(), clock.now())
            .context("invalid timing configuration")?;
    let binder = plan.binder();

    for _ in 0..args.ticks {
        clock.advance_by(args.frame_time);
        let mut lines = Vec::new();
        let state = scheduler.advance_with(&mut clock, |state| {
            let Some(bindings) = binder.bind_pass(state, &history) else {
                return;
            };
            let inputs: Vec<String> = bindings
                .inputs
                .iter()
                .map(|input| format!("{} slot {}", input.sample.texture, input.slot))
                .collect();
            lines.push(format!(
                "  {} writes slot {} reads [{}]",
                bindings.pass,
                bindings.output_slot,
                inputs.join(", ")
            ));
        });
        println!(
            "tick {} time={:.4} dt={:.4}",
            state.tick(),
            state.time(),
            state.dt()
        );
        for line in lines {
            println!("{line}");
        }
    }
    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<SimConfig> {
    let input = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut config = SimConfig::from_toml_str(&input)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    if args.textures_max.is_some() || args.steps.is_some() {
        if let Some(textures_max) = args.textures_max {
            config.textures_max = textures_max;
        }
        if let Some(steps) = args.steps {
            config.steps = steps;
        }
        config
            .validate()
            .context("command-line overrides produce an invalid config")?;
    }

    tracing::debug!(
        path = %args.file.display(),
        values = config.values.len(),
        steps = config.steps,
        textures_max = config.textures_max,
        "loaded simulation config"
    );
    Ok(config)
}

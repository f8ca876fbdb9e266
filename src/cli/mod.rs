// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, hands a TrainConfig to the
// application layer and prints the results. This is the only
// layer that writes to stdout.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;
use crate::data::cifar::CLASS_NAMES;

#[derive(Parser, Debug)]
#[command(
    name = "vit-cifar",
    version = "0.1.0",
    about = "Train a Vision Transformer image classifier on CIFAR-10."
)]
pub struct Cli {
    /// The subcommand to run (train or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => Self::run_train(args),
            Commands::Inspect(args) => Self::run_inspect(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        let config = args.into_config()?;
        tracing::info!(
            "Starting training: {} steps, batch size {}, {}",
            config.num_steps,
            config.batch_size,
            if config.synthetic { "synthetic data".to_string() } else { config.data_dir.clone() }
        );

        let report = TrainUseCase::new(config).execute()?;

        println!("Finished {} steps, last loss {:.4}", report.steps, report.final_loss);
        println!(
            "Test accuracy: {:.2}% ({}/{})",
            report.eval.accuracy_pct, report.eval.correct, report.eval.total
        );
        Ok(())
    }

    fn run_inspect(args: InspectArgs) -> Result<()> {
        use crate::application::inspect_use_case::InspectUseCase;

        let config: TrainConfig = args.model.into();
        let summary = InspectUseCase::new(config).execute()?;

        println!("patches:            {}", summary.num_patches);
        println!("positional table:   {:?}", summary.position_table);
        println!("transformer blocks: {}", summary.num_blocks);
        println!("parameters:         {}", summary.num_params);
        println!("logits shape:       {:?}", summary.logits_shape);
        let name = CLASS_NAMES.get(summary.predicted_class).copied().unwrap_or("?");
        println!("blank image class:  {} ({})", summary.predicted_class, name);
        Ok(())
    }
}

use clap::Parser;

use log::{error, info};
use std::path::Path;
use std::process;

use polyaug::{run, Args};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !Path::new(&args.image_dir).exists() {
        error!("The specified image_dir does not exist: {}", args.image_dir);
        process::exit(1);
    }
    if !Path::new(&args.label_dir).exists() {
        error!("The specified label_dir does not exist: {}", args.label_dir);
        process::exit(1);
    }

    info!("Starting the augmentation process...");
    info!("Image Dir: {}", args.image_dir);
    info!("Label Dir: {}", args.label_dir);
    info!("Output Image Dir: {}", args.output_image_dir());
    info!("Output Label Dir: {}", args.output_label_dir());

    if let Err(e) = run(&args) {
        error!("Failed to run augmentation batch: {}", e);
        process::exit(1);
    }
}

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = eatr::api::Cli::parse();
    if let Err(e) = eatr::api::run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

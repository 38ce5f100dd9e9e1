use cidr_feeds::{run_feed, CancelToken, FeedConfig};
use colored::Colorize;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default()).expect("Error initializing log4rs");
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let config = FeedConfig::from_env()?;
    let stats = match run_feed(&config, &CancelToken::new()) {
        Ok(stats) => stats,
        Err(e) => {
            log::error!("{} {e}", "failed".on_red());
            return Err(e);
        }
    };

    println!(
        "{} {} -> {} ({stats})",
        "DONE".on_green(),
        config.input.display(),
        config.output.display()
    );
    if let Some(line) = stats.truncated_at {
        println!(
            "#{}# input stopped early at short line {line}",
            "NOTE".on_red()
        );
    }
    Ok(())
}

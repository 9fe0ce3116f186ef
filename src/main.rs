use clap::{crate_version, App as ClapApp, Arg};
use launchkit::app::App;
use launchkit::config::Config;
use log::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = ClapApp::new("launchkit")
        .version(crate_version!())
        .about("Terminal showcase for onboarding, upload, verification, table and notification widgets")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("DIR")
                .help("Directory holding config.yml")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Show debug messages in the log pane"),
        )
        .get_matches();

    let mut config = Config::new();
    config.load(matches.value_of("config"))?;

    let level = if matches.is_present("debug") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    App::start(config, level).await?;
    Ok(())
}

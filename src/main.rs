use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("station_report"), log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match station_report::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

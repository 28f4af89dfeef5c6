use log::error;
use minish::{Config, Options, Session, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let options: Options = argh::from_env();
    if let Err(e) = logging::init(options.log_level, options.log_file.as_deref()) {
        eprintln!("minish: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("minish: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options) -> anyhow::Result<()> {
    let config = Config::from_options(options)?;
    Session::interactive(&config)?.run()
}

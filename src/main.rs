use std::process::ExitCode;

fn main() -> ExitCode {
    match sensor_map_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

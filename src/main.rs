use std::process::ExitCode;

use storage_migrate::cli;
use storage_migrate::output as out;
use storage_migrate::MigrateError;

mod app;

fn main() -> ExitCode {
    let args = cli::parse();
    match app::run(args) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            let code = e.downcast_ref::<MigrateError>().map_or(1, MigrateError::code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

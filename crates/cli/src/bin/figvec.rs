use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match figvec_cli::main_entry().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(figvec_cli::exit_code(&err))
        }
    }
}

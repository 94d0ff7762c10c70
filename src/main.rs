use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match linkscope::app::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "linkscope failed");
            ExitCode::FAILURE
        }
    }
}

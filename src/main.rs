use analytics::prelude::*;

#[tokio::main]
async fn main() {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            // Logging is not set up yet
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(1);
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    CliApp::new("analytics")
        .run(|mut out, cancel| async move { execute(command, config, &mut out, cancel).await })
        .await
}

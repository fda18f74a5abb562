use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_booking::{
    AppState,
    cli::{self, Command},
    config::{Config, LogFormat},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Логи идут в stderr, чтобы не смешиваться с выводом меню
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    match config.app.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    info!(
        "Starting seat booking: {} seats, {} workers",
        config.booking.total_seats, config.dispatcher.workers
    );

    let state = AppState::new(config);
    println!("{}", cli::MENU);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("ERROR: {}", e);
                continue;
            }
        };

        let response = cli::handle(&state, command).await;
        for line in &response.lines {
            println!("{}", line);
        }
        if response.exit {
            break;
        }
    }

    // Дожидаемся уже принятых запросов и вывода их результатов
    state.shutdown().await;
    info!("Seat booking stopped, {} booking log entries", state.bookings.records().len());
    Ok(())
}

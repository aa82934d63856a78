use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod bot;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley console bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the console echo bot (default when no command is given)
    Run {
        /// Config file path (default: PARLEY_CONFIG_PATH when set)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { config: None }) {
        Commands::Version => {
            println!("parley {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Run { config } => {
            if let Err(e) = run_bot(config).await {
                log::error!("bot failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_bot(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match lib::config::resolve_config_path(config_path) {
        Some(path) => lib::config::load_config(&path)?,
        None => lib::config::Config::default(),
    };
    let reference = lib::config::console_reference_from(&config);

    let adapter = Arc::new(lib::console::ConsoleAdapter::new(Some(reference)));
    let bot = Arc::new(bot::EchoBot::new());

    let logic = {
        let bot = bot.clone();
        lib::middleware::turn_logic(move |context| {
            let bot = bot.clone();
            async move { bot.on_turn(&context).await }
        })
    };

    let (handle, task) = adapter.listen_stdin(logic);
    bot.bind_handle(handle);

    println!("> O Console Bot está online. Eu irei repetir qualquer mensagem que você enviar para mim!");
    println!("> Diga \"sair\" para finalizar o programa.");
    println!();

    task.await?;
    Ok(())
}

// FICHIER : src-app/tools/clubhouse-cli/src/main.rs

use clap::{Parser, Subcommand};

mod commands;

use clubhouse::{
    user_error, user_info,
    utils::{context, AnyResult, AppConfig},
};

#[derive(Parser)]
#[command(name = "clubhouse-cli")]
#[command(about = "Back-office et espace membre du club (réservations d'installations)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    // Optionnel pour permettre le mode Shell Interactif
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    /// Crée les collections et insère le jeu d'exemple (collections vides seulement)
    Seed,

    /// Liste les collections de la base
    Collections,

    /// Affiche les documents d'une collection
    List {
        #[arg(long)]
        collection: String,
        /// Filtre JSON, ex. '{"status": "available"}'
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Insère un document (objet JSON)
    Insert {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        data: String,
    },

    /// Mise à jour partielle ($set)
    Update {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        data: String,
    },

    /// Suppression par ID
    Delete {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        id: String,
    },

    /// Vérifie des identifiants et affiche le rôle obtenu
    Login {
        #[arg(long)]
        name: String,
        #[arg(long, env = "CLUBHOUSE_SECRET")]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    // 0. Fichier .env éventuel (avant toute lecture de variable)
    let _ = dotenvy::dotenv();

    // 1. Initialisation de la Configuration (CRITIQUE)
    if let Err(e) = AppConfig::init() {
        eprintln!("❌ CRITICAL ERROR: Impossible d'initialiser la configuration.");
        eprintln!("   Détails : {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::get();

    // 2. Logger puis langue
    context::init_logging(config);
    context::init_i18n(&config.core.language);

    user_info!("CLI_START", "v{}", env!("CARGO_PKG_VERSION"));

    // 3. Parsing & Dispatch
    let cli = Cli::parse();

    match cli.command {
        Some(cmd) => {
            // Mode "One-Shot"
            if let Err(e) = commands::data::execute(cmd, config).await {
                user_error!("CMD_FAIL", "{}", e);
                std::process::exit(1);
            }
        }
        None => {
            // Mode "Shell" : connexion puis espace admin ou membre
            commands::shell::run(config).await?;
        }
    }

    tracing::debug!("Fin de l'exécution du CLI");
    Ok(())
}

// FICHIER : src-app/tools/clubhouse-cli/src/commands/shell.rs

//! Shell interactif : écran de connexion, puis boucle admin ou membre.
//! La déconnexion ramène à l'écran de connexion.

use crate::commands::{admin, member, open_store, report};

use anyhow::anyhow;
use clubhouse::admin::SchemaRegistry;
use clubhouse::session::{authenticate, AuthOutcome, MemberSession};
use clubhouse::utils::{AnyResult, AppConfig, Arc};
use clubhouse::{user_info, user_success};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Issue d'une session : retour à la connexion, ou sortie du shell
/// (`exit`, CTRL-C, CTRL-D).
pub enum Flow {
    Logout,
    Quit,
}

/// Lit une ligne ; `None` si l'utilisateur interrompt la saisie.
pub fn prompt(rl: &mut DefaultEditor, label: &str) -> AnyResult<Option<String>> {
    prompt_with(rl, label, "")
}

pub fn prompt_with(rl: &mut DefaultEditor, label: &str, initial: &str) -> AnyResult<Option<String>> {
    match rl.readline_with_initial(label, (initial, "")) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(anyhow!("Erreur du terminal : {}", e)),
    }
}

pub async fn run(config: &AppConfig) -> AnyResult<()> {
    println!("--------------------------------------------------");
    println!("🏟️  CLUBHOUSE SHELL - v{}", env!("CARGO_PKG_VERSION"));
    println!("   Connectez-vous (prénom + mot de passe).");
    println!("   Tapez 'exit' ou 'quit' au prénom pour quitter.");
    println!("--------------------------------------------------");

    let mut rl = DefaultEditor::new()?;
    let history_path = config.history_path();
    if rl.load_history(&history_path).is_err() {
        // Pas d'historique (premier lancement)
    }

    let store = match open_store(config).await {
        Ok(store) => store,
        Err(e) => {
            report(&e, "SHELL", "OPEN_STORE");
            return Ok(());
        }
    };
    let registry = Arc::new(SchemaRegistry::from_config(config)?);

    if config.core.seed_on_start {
        if let Err(e) = clubhouse::store::seed::seed_sample_data(store.as_ref()).await {
            report(&e, "SHELL", "SEED");
        }
    }

    loop {
        let Some(name) = prompt(&mut rl, "First name: ")? else {
            break;
        };
        let name = name.trim().to_string();
        if name.eq_ignore_ascii_case("exit") || name.eq_ignore_ascii_case("quit") {
            break;
        }
        // Le secret n'entre jamais dans l'historique
        let Some(secret) = prompt(&mut rl, "Password: ")? else {
            break;
        };

        let outcome = match authenticate(store.as_ref(), &config.admin, &name, &secret).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report(&e, "LOGIN", "AUTHENTICATE");
                continue;
            }
        };

        let flow = match outcome {
            AuthOutcome::Unauthorized => {
                user_info!("MSG_UNAUTHORIZED");
                continue;
            }
            AuthOutcome::Admin => {
                user_success!("MSG_LOGIN_ADMIN");
                admin::run(&mut rl, store.clone(), registry.clone(), config).await?
            }
            AuthOutcome::Member(doc) => {
                match MemberSession::new(store.clone(), registry.clone(), doc, config) {
                    Ok(session) => {
                        user_success!("MSG_LOGIN_OK", "{}", session.display_name());
                        member::run(&mut rl, session).await?
                    }
                    Err(e) => {
                        report(&e, "LOGIN", "OPEN_SESSION");
                        continue;
                    }
                }
            }
        };

        match flow {
            Flow::Quit => break,
            Flow::Logout => user_info!("MSG_LOGOUT"),
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        tracing::warn!("Impossible de sauvegarder l'historique : {}", e);
    }
    println!("👋 Au revoir !");
    Ok(())
}

/// Découpe une ligne de commande ; les erreurs de syntaxe sont affichées.
pub fn split_line(rl: &mut DefaultEditor, line: &str) -> Option<Vec<String>> {
    let input = line.trim();
    if input.is_empty() {
        return None;
    }
    let _ = rl.add_history_entry(input);
    match shell_words::split(input) {
        Ok(args) => Some(args),
        Err(e) => {
            eprintln!("❌ Erreur de syntaxe : {}", e);
            None
        }
    }
}

// FICHIER : src-app/tools/clubhouse-cli/src/commands/admin.rs

use crate::commands::shell::{prompt, prompt_with, split_line, Flow};
use crate::commands::{print_table, report};

use clap::{Parser, Subcommand};
use clubhouse::admin::form::{FormModel, Widget, MISSING_PREFIX};
use clubhouse::admin::{AdminCommand, AdminOutcome, AdminSession, SchemaRegistry};
use clubhouse::store::DocumentStore;
use clubhouse::utils::{AnyResult, AppConfig, AppError, Arc};
use clubhouse::{user_info, user_success};
use rustyline::DefaultEditor;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "admin")]
struct AdminLine {
    #[command(subcommand)]
    command: AdminCmd,
}

#[derive(Subcommand, Debug)]
enum AdminCmd {
    /// Liste les collections
    Collections,
    /// Charge une collection (200 documents max)
    Open { collection: String },
    /// Recharge la collection courante
    Refresh,
    /// Filtre les lignes chargées (vide : tout afficher)
    Filter { query: Vec<String> },
    /// Ré-affiche le tableau
    Table,
    /// Détail complet d'une ligne
    Show { row: usize },
    /// Formulaire d'insertion
    New,
    /// Formulaire d'édition d'une ligne
    Edit { row: usize },
    /// Supprime une ligne
    Delete { row: usize },
    /// Retour à l'écran de connexion
    Logout,
    /// Quitte le shell
    Exit,
}

pub async fn run(
    rl: &mut DefaultEditor,
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    config: &AppConfig,
) -> AnyResult<Flow> {
    let mut session = AdminSession::new(store, registry, config);
    println!("Commandes : collections, open <c>, filter <q>, show <n>, new, edit <n>, delete <n>, logout (help pour le détail)");

    loop {
        let label = format!("admin:{}> ", session.browser().collection().unwrap_or("-"));
        let Some(line) = prompt(rl, &label)? else {
            return Ok(Flow::Quit);
        };
        let Some(args) = split_line(rl, &line) else {
            continue;
        };
        let cmd = match AdminLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                e.print().ok();
                continue;
            }
        };

        let result = match cmd {
            AdminCmd::Logout => return Ok(Flow::Logout),
            AdminCmd::Exit => return Ok(Flow::Quit),
            AdminCmd::Table => {
                show_table(&session);
                continue;
            }
            AdminCmd::Collections => session.execute(AdminCommand::Collections).await,
            AdminCmd::Open { collection } => {
                session.execute(AdminCommand::Load(&collection)).await
            }
            AdminCmd::Refresh => session.execute(AdminCommand::Refresh).await,
            AdminCmd::Filter { query } => {
                session
                    .execute(AdminCommand::Filter(&query.join(" ")))
                    .await
            }
            AdminCmd::Show { row } => session.execute(AdminCommand::Detail(row)).await,
            AdminCmd::New => session.execute(AdminCommand::NewForm).await,
            AdminCmd::Edit { row } => session.execute(AdminCommand::EditForm(row)).await,
            AdminCmd::Delete { row } => {
                let confirm = prompt(rl, &format!("Supprimer la ligne {} ? (y/N) ", row))?;
                if !matches!(confirm.as_deref().map(str::trim), Some("y") | Some("Y")) {
                    continue;
                }
                session.execute(AdminCommand::Delete(row)).await
            }
        };

        match result {
            Ok(outcome) => handle_outcome(rl, &mut session, outcome).await?,
            Err(e) => {
                report(&e, "ADMIN", "COMMAND");
                if matches!(e, AppError::NotFound(_)) {
                    show_table(&session);
                }
            }
        }
    }
}

async fn handle_outcome(
    rl: &mut DefaultEditor,
    session: &mut AdminSession,
    outcome: AdminOutcome,
) -> AnyResult<()> {
    match outcome {
        AdminOutcome::Collections(names) => {
            for name in names {
                println!("📁 {}", name);
            }
        }
        AdminOutcome::Loaded { collection, .. } => {
            user_info!("MSG_LOADED", "{}", collection);
            show_table(session);
        }
        AdminOutcome::Filtered(_) => show_table(session),
        AdminOutcome::Detail(fields) => {
            let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (k, v) in fields {
                println!("  {:<width$} : {}", k, v, width = width);
            }
        }
        AdminOutcome::Form(form) => submit_form(rl, session, form).await?,
        AdminOutcome::RawForm { collection } => submit_raw(rl, session, &collection).await?,
        outcome => print_write(session, outcome),
    }
    Ok(())
}

fn print_write(session: &AdminSession, outcome: AdminOutcome) {
    match outcome {
        AdminOutcome::Inserted(id) => user_success!("MSG_INSERTED", "{}", id),
        AdminOutcome::Updated { id, changed: true } => user_success!("MSG_UPDATED", "{}", id),
        AdminOutcome::Updated { changed: false, .. } => user_info!("MSG_NO_CHANGE"),
        AdminOutcome::Deleted(id) => user_success!("MSG_DELETED", "{}", id),
        _ => return,
    }
    show_table(session);
}

fn show_table(session: &AdminSession) {
    let browser = session.browser();
    print_table(browser.columns(), &browser.table());
    println!("{}", browser.status_line());
}

// --- FORMULAIRES ---

/// Saisie puis soumission ; en cas d'échec le formulaire est conservé et
/// peut être corrigé.
async fn submit_form(
    rl: &mut DefaultEditor,
    session: &mut AdminSession,
    mut form: FormModel,
) -> AnyResult<()> {
    loop {
        if !fill_form(rl, &mut form)? {
            user_info!("MSG_FORM_CANCELLED");
            return Ok(());
        }
        match session.execute(AdminCommand::Submit(&form)).await {
            Ok(outcome) => {
                print_write(session, outcome);
                return Ok(());
            }
            Err(e) => {
                report(&e, "FORM", "SUBMIT");
                if matches!(e, AppError::NotFound(_)) {
                    return Ok(());
                }
                let retry = prompt(rl, "Corriger le formulaire ? (Y/n) ")?;
                if matches!(retry.as_deref().map(str::trim), Some("n") | Some("N") | None) {
                    user_info!("MSG_FORM_CANCELLED");
                    return Ok(());
                }
            }
        }
    }
}

/// Parcourt les champs. `false` si la saisie est interrompue.
fn fill_form(rl: &mut DefaultEditor, form: &mut FormModel) -> AnyResult<bool> {
    println!("— {} —", form.collection());
    let fields: Vec<(String, Widget)> = form
        .fields()
        .iter()
        .map(|f| (f.name.clone(), f.widget.clone()))
        .collect();

    for (name, widget) in fields {
        match widget {
            Widget::Line { text, placeholder } => {
                if let Some(hint) = placeholder {
                    println!("  ({})", hint);
                }
                let Some(value) = prompt_with(rl, &format!("{}: ", name), &text)? else {
                    return Ok(false);
                };
                form.set_text(&name, &value)?;
            }
            Widget::MultiLine { text } => {
                let Some(value) = prompt_with(rl, &format!("{} (texte/JSON): ", name), &text)?
                else {
                    return Ok(false);
                };
                form.set_text(&name, &value)?;
            }
            Widget::Select {
                options, selected, ..
            } => {
                println!("  {} :", name);
                for (i, option) in options.iter().enumerate() {
                    let mark = if i == selected { "*" } else { " " };
                    let warn = if option.label.starts_with(MISSING_PREFIX) {
                        " ⚠️"
                    } else {
                        ""
                    };
                    println!("   {}{:>3}) {}{}", mark, i, option.label, warn);
                }
                loop {
                    let Some(raw) = prompt_with(rl, "  choix: ", &selected.to_string())? else {
                        return Ok(false);
                    };
                    match raw.trim().parse::<usize>() {
                        Ok(i) => match form.choose(&name, i) {
                            Ok(()) => break,
                            Err(e) => eprintln!("❌ {}", e),
                        },
                        Err(_) => eprintln!("❌ Numéro d'option attendu"),
                    }
                }
            }
            Widget::Composite { inputs } => {
                println!("  {} :", name);
                for (sub, raw) in inputs {
                    let Some(value) = prompt_with(rl, &format!("    {}.{}: ", name, sub), &raw)?
                    else {
                        return Ok(false);
                    };
                    form.set_subfield(&name, &sub, &value)?;
                }
            }
        }
    }
    Ok(true)
}

async fn submit_raw(
    rl: &mut DefaultEditor,
    session: &mut AdminSession,
    collection: &str,
) -> AnyResult<()> {
    user_info!("MSG_RAW_JSON");
    let mut draft = String::from("{}");
    loop {
        let Some(text) = prompt_with(rl, &format!("{} JSON: ", collection), &draft)? else {
            user_info!("MSG_FORM_CANCELLED");
            return Ok(());
        };
        match session.execute(AdminCommand::SubmitRaw(&text)).await {
            Ok(outcome) => {
                print_write(session, outcome);
                return Ok(());
            }
            Err(e) => {
                report(&e, "FORM", "SUBMIT_RAW");
                draft = text;
            }
        }
    }
}

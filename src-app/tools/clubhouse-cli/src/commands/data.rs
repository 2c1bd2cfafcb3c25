// FICHIER : src-app/tools/clubhouse-cli/src/commands/data.rs

use crate::commands::{open_store, print_table};
use crate::Commands;

use clubhouse::admin::browser::render_row;
use clubhouse::admin::SchemaRegistry;
use clubhouse::session::{authenticate, AuthOutcome};
use clubhouse::store::{document_id, seed, Filter};
use clubhouse::utils::json::{self, Value};
use clubhouse::utils::{AppConfig, AppError, Result};
use clubhouse::{user_info, user_success};

pub async fn execute(cmd: Commands, config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;

    match cmd {
        Commands::Seed => {
            let report = seed::seed_sample_data(store.as_ref()).await?;
            user_success!(
                "MSG_SEED_DONE",
                "{} collection(s), {} document(s)",
                report.created_collections.len(),
                report.total_inserted()
            );
        }
        Commands::Collections => {
            for name in store.list_collections().await? {
                println!("📁 {}", name);
            }
        }
        Commands::List {
            collection,
            filter,
            limit,
        } => {
            let filter = match filter {
                Some(raw) => Filter::parse(&json::parse::<Value>(&raw)?)?,
                None => Filter::all(),
            };
            let limit = limit.unwrap_or(config.ui.max_rows);
            let docs = store.find(&collection, &filter, Some(limit)).await?;

            let registry = SchemaRegistry::from_config(config)?;
            let columns = registry.columns(&collection, &docs);
            let rows: Vec<Vec<String>> = docs
                .iter()
                .map(|d| render_row(d, &columns, config.ui.display_max_len))
                .collect();
            print_table(&columns, &rows);
            println!("Showing {} documents (max {})", docs.len(), limit);
        }
        Commands::Insert { collection, data } => {
            let doc = json::parse_object(&data)?;
            let id = store.insert(&collection, doc).await?;
            user_success!("MSG_INSERTED", "{}", id);
        }
        Commands::Update {
            collection,
            id,
            data,
        } => {
            let changes = json::parse_object(&data)?;
            let modified = store.update(&collection, &id, changes).await?;
            if modified > 0 {
                user_success!("MSG_UPDATED", "{}", id);
            } else if store.find_one(&collection, &id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "{}/{}",
                    collection, id
                )));
            } else {
                user_info!("MSG_NO_CHANGE");
            }
        }
        Commands::Delete { collection, id } => {
            if store.delete(&collection, &id).await? == 0 {
                return Err(AppError::not_found(format!(
                    "{}/{}",
                    collection, id
                )));
            }
            user_success!("MSG_DELETED", "{}", id);
        }
        Commands::Login { name, secret } => {
            match authenticate(store.as_ref(), &config.admin, &name, &secret).await? {
                AuthOutcome::Admin => user_success!("MSG_LOGIN_ADMIN"),
                AuthOutcome::Member(member) => user_success!(
                    "MSG_LOGIN_OK",
                    "{} ({})",
                    name.trim(),
                    document_id(&member).unwrap_or_default()
                ),
                AuthOutcome::Unauthorized => user_info!("MSG_UNAUTHORIZED"),
            }
        }
    }
    Ok(())
}

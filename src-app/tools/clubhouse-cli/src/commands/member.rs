// FICHIER : src-app/tools/clubhouse-cli/src/commands/member.rs

use crate::commands::shell::{prompt, split_line, Flow};
use crate::commands::{print_table, report};

use clap::{Parser, Subcommand};
use clubhouse::admin::form::assemble_composite;
use clubhouse::session::MemberSession;
use clubhouse::utils::config::DEFAULT_DISPLAY_MAX_LEN;
use clubhouse::utils::AnyResult;
use clubhouse::{user_info, user_success};
use rustyline::DefaultEditor;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "member")]
struct MemberLine {
    #[command(subcommand)]
    command: MemberCmd,
}

#[derive(Subcommand, Debug)]
enum MemberCmd {
    /// Mes réservations
    Bookings,
    /// Installations (identifiants à utiliser pour réserver)
    Facilities,
    /// Réserve une installation (dates ISO, ex. 2025-11-21T09:00)
    Book {
        facility: String,
        start: String,
        end: String,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
    /// Annule une réservation
    Cancel { booking: String },
    /// Enregistre une arrivée
    Checkin {
        facility: String,
        #[arg(long)]
        booking: Option<String>,
    },
    /// Enregistre un départ
    Checkout { log: String },
    /// Mes statistiques
    Stats,
    /// Retour à l'écran de connexion
    Logout,
    /// Quitte le shell
    Exit,
}

pub async fn run(rl: &mut DefaultEditor, session: MemberSession) -> AnyResult<Flow> {
    println!("Commandes : bookings, facilities, book, cancel, checkin, checkout, stats, logout (help pour le détail)");
    show_bookings(&session).await;

    loop {
        let Some(line) = prompt(rl, "member> ")? else {
            session.logout().await;
            return Ok(Flow::Quit);
        };
        let Some(args) = split_line(rl, &line) else {
            continue;
        };
        let cmd = match MemberLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                e.print().ok();
                continue;
            }
        };

        match cmd {
            MemberCmd::Logout => {
                session.logout().await;
                return Ok(Flow::Logout);
            }
            MemberCmd::Exit => {
                session.logout().await;
                return Ok(Flow::Quit);
            }
            MemberCmd::Bookings => show_bookings(&session).await,
            MemberCmd::Facilities => match session.facilities().await {
                Ok(list) => {
                    for (id, label) in list {
                        println!("🏟️  {}  {}", id, label);
                    }
                }
                Err(e) => report(&e, "MEMBER", "LIST_FACILITIES"),
            },
            MemberCmd::Book {
                facility,
                start,
                end,
                amount,
                method,
            } => {
                let inputs = vec![
                    ("amount".to_string(), amount.unwrap_or_default()),
                    ("method".to_string(), method.unwrap_or_default()),
                ];
                let payment = assemble_composite(&inputs);
                match session.create_booking(&facility, &start, &end, payment).await {
                    Ok(id) => {
                        user_success!("MSG_BOOKING_CREATED", "{}", id);
                        show_bookings(&session).await;
                    }
                    Err(e) => report(&e, "MEMBER", "CREATE_BOOKING"),
                }
            }
            MemberCmd::Cancel { booking } => match session.cancel_booking(&booking).await {
                Ok(()) => {
                    user_success!("MSG_BOOKING_CANCELLED", "{}", booking);
                    show_bookings(&session).await;
                }
                Err(e) => report(&e, "MEMBER", "CANCEL_BOOKING"),
            },
            MemberCmd::Checkin { facility, booking } => {
                match session.check_in(&facility, booking.as_deref()).await {
                    Ok(id) => user_success!("MSG_CHECKED_IN", "{}", id),
                    Err(e) => report(&e, "MEMBER", "CHECK_IN"),
                }
            }
            MemberCmd::Checkout { log } => match session.check_out(&log).await {
                Ok(minutes) => user_success!("MSG_CHECKED_OUT", "{}", minutes),
                Err(e) => report(&e, "MEMBER", "CHECK_OUT"),
            },
            MemberCmd::Stats => match session.stats().await {
                Ok(stats) => {
                    println!("📊 Réservations : {}", stats.total_bookings);
                    for (status, n) in &stats.bookings_by_status {
                        println!("   {:<12} {}", status, n);
                    }
                    println!("🏃 Visites terminées : {}", stats.completed_visits);
                    println!("⏱️  Minutes totales : {}", stats.total_minutes);
                    if let Some(avg) = stats.average_minutes {
                        println!("   Moyenne : {:.1} min", avg);
                    }
                    for (facility, minutes) in &stats.minutes_per_facility {
                        println!("   {:<20} {} min", facility, minutes);
                    }
                }
                Err(e) => report(&e, "MEMBER", "STATS"),
            },
        }
    }
}

async fn show_bookings(session: &MemberSession) {
    match session.bookings().await {
        Ok(list) if list.rows.is_empty() => user_info!("MSG_NO_BOOKINGS"),
        Ok(list) => print_table(&list.columns, &list.table(DEFAULT_DISPLAY_MAX_LEN)),
        Err(e) => report(&e, "MEMBER", "LOAD_BOOKINGS"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_line_with_payment() {
        let line = MemberLine::try_parse_from([
            "book",
            "f1",
            "2025-11-21T09:00",
            "2025-11-21T10:00",
            "--amount",
            "50",
        ])
        .unwrap();
        match line.command {
            MemberCmd::Book { amount, method, .. } => {
                assert_eq!(amount.as_deref(), Some("50"));
                assert!(method.is_none());
            }
            other => panic!("book attendu, reçu {:?}", other),
        }
    }
}
